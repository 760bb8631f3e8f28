//! Editor session
//!
//! Holds the document text being edited, the sign-in state and the export
//! engine, and turns the outcome of every user action into a notification.
//! Authentication and export failures are reported independently.

use crate::export::{ExportEngine, ExportedDocument, ExportError};
use crate::preview;
use std::future::Future;
use thiserror::Error;

/// Document shown when a session starts
pub const WELCOME_DOCUMENT: &str = "# Welcome to Markdown Visualizer\n\nStart typing your markdown here...\n\n## Features\n- Live preview\n- PDF export\n- Google authentication\n\n**Bold text** and *italic text*\n\n> This is a blockquote";

/// Profile of a signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            avatar_url: None,
        }
    }

    /// Name to show in the header, falling back to the email address
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Where the session stands with the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// The provider has not reported the initial session yet
    #[default]
    Loading,
    SignedOut,
    SignedIn(User),
}

/// Identity provider failures
#[derive(Error, Debug)]
#[error("Identity provider error: {message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External sign-in service
pub trait IdentityProvider {
    fn sign_in(&self) -> impl Future<Output = Result<User, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationVariant {
    #[default]
    Default,
    Destructive,
}

/// A short user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Default,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Destructive,
        }
    }
}

/// Displays notifications to the user
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// One user's editing session
pub struct EditorSession<N: Notifier> {
    document: String,
    auth: AuthState,
    engine: ExportEngine,
    notifier: N,
}

impl<N: Notifier> EditorSession<N> {
    /// Start a session showing the welcome document
    pub fn new(engine: ExportEngine, notifier: N) -> Self {
        Self {
            document: WELCOME_DOCUMENT.to_string(),
            auth: AuthState::Loading,
            engine,
            notifier,
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Replace the document text
    pub fn set_document(&mut self, text: impl Into<String>) {
        self.document = text.into();
    }

    /// Live preview of the current text
    pub fn preview_html(&self) -> String {
        preview::to_html(&self.document)
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    pub fn user(&self) -> Option<&User> {
        match &self.auth {
            AuthState::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    /// Record the session the provider restored at startup
    pub fn restore_session(&mut self, user: Option<User>) {
        self.auth = user.map_or(AuthState::SignedOut, AuthState::SignedIn);
    }

    pub fn engine(&self) -> &ExportEngine {
        &self.engine
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Sign in through the provider
    pub async fn sign_in<P: IdentityProvider>(&mut self, provider: &P) {
        match provider.sign_in().await {
            Ok(user) => {
                log::info!("Signed in as {}", user.label());
                self.auth = AuthState::SignedIn(user);
            }
            Err(e) => {
                log::error!("Sign in failed: {}", e);
                self.auth = AuthState::SignedOut;
                self.notifier.notify(Notification::destructive(
                    "Sign in failed",
                    "There was an error signing in with Google. Please try again.",
                ));
            }
        }
    }

    /// Sign out through the provider; the state is unchanged on failure
    pub async fn sign_out<P: IdentityProvider>(&mut self, provider: &P) {
        match provider.sign_out().await {
            Ok(()) => {
                self.auth = AuthState::SignedOut;
                self.notifier.notify(Notification::info(
                    "Signed out successfully",
                    "You have been signed out of your account.",
                ));
            }
            Err(e) => {
                log::error!("Sign out failed: {}", e);
                self.notifier.notify(Notification::destructive(
                    "Sign out failed",
                    "There was an error signing out. Please try again.",
                ));
            }
        }
    }

    /// Export the current text as PDF
    ///
    /// Every outcome is reported through the notifier; the result is
    /// returned for hosts that need the file location.
    pub async fn export_pdf(&self) -> Result<ExportedDocument, ExportError> {
        match self.engine.export_to_pdf(&self.document).await {
            Ok(exported) => {
                self.notifier.notify(Notification::info(
                    "PDF exported",
                    format!("Saved {}", exported.file_name),
                ));
                Ok(exported)
            }
            Err(e) => {
                log::error!("PDF export failed: {}", e);
                self.notifier.notify(Notification::destructive(
                    "Export failed",
                    "The PDF could not be generated. Please try again.",
                ));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use crate::persist::DirectorySink;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Notification>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.seen.lock().unwrap().push(notification);
        }
    }

    impl Recorder {
        fn titles(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.title.clone())
                .collect()
        }
    }

    struct Provider {
        fail: bool,
    }

    impl IdentityProvider for Provider {
        async fn sign_in(&self) -> Result<User, AuthError> {
            if self.fail {
                Err(AuthError::new("popup closed"))
            } else {
                Ok(User {
                    email: "ada@example.com".to_string(),
                    display_name: Some("Ada".to_string()),
                    avatar_url: None,
                })
            }
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            if self.fail {
                Err(AuthError::new("network down"))
            } else {
                Ok(())
            }
        }
    }

    fn session(dir: &std::path::Path) -> EditorSession<Recorder> {
        let sink = Arc::new(DirectorySink::new(dir));
        let engine = ExportEngine::from_config(&ExportConfig::default(), sink).unwrap();
        EditorSession::new(engine, Recorder::default())
    }

    #[test]
    fn test_user_label_falls_back_to_email() {
        let mut user = User::new("ada@example.com");
        assert_eq!(user.label(), "ada@example.com");

        user.display_name = Some("Ada".to_string());
        assert_eq!(user.label(), "Ada");
    }

    #[tokio::test]
    async fn test_new_session_shows_welcome_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());

        assert_eq!(session.auth_state(), &AuthState::Loading);
        assert!(session.document().starts_with("# Welcome to Markdown Visualizer"));
        assert!(session.preview_html().contains("<blockquote>"));

        session.set_document("# Changed");
        assert_eq!(session.document(), "# Changed");
        session.restore_session(None);
        assert_eq!(session.auth_state(), &AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let provider = Provider { fail: false };

        session.sign_in(&provider).await;
        assert_eq!(session.user().map(User::label), Some("Ada"));
        assert!(session.notifier().titles().is_empty());

        session.sign_out(&provider).await;
        assert_eq!(session.auth_state(), &AuthState::SignedOut);
        assert_eq!(session.notifier().titles(), vec!["Signed out successfully"]);
    }

    #[tokio::test]
    async fn test_sign_in_failure_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());

        session.sign_in(&Provider { fail: true }).await;

        assert_eq!(session.auth_state(), &AuthState::SignedOut);
        let seen = session.notifier().seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![Notification::destructive(
                "Sign in failed",
                "There was an error signing in with Google. Please try again."
            )]
        );
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        session.sign_in(&Provider { fail: false }).await;

        session.sign_out(&Provider { fail: true }).await;

        assert!(session.user().is_some());
        assert_eq!(session.notifier().titles(), vec!["Sign out failed"]);
    }

    #[tokio::test]
    async fn test_export_success_notifies_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());

        let exported = session.export_pdf().await.unwrap();

        let seen = session.notifier().seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, "PDF exported");
        assert_eq!(seen[0].variant, NotificationVariant::Default);
        assert!(seen[0].description.contains(&exported.file_name));
    }
}
