use mdviz::config::ExportConfig;
use mdviz::export::ExportEngine;
use mdviz::persist::{DirectorySink, DocumentSink, PersistError};
use mdviz::session::{EditorSession, Notification, NotificationVariant, Notifier};
use std::path::PathBuf;
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

struct FailingSink;

impl DocumentSink for FailingSink {
    fn persist(&self, _file_name: &str, _bytes: &[u8]) -> Result<PathBuf, PersistError> {
        Err(PersistError::InvalidName("blocked".to_string()))
    }
}

#[tokio::test]
async fn test_export_failure_notifies_once() {
    // Arrange
    let engine = ExportEngine::from_config(&ExportConfig::default(), Arc::new(FailingSink)).unwrap();
    let session = EditorSession::new(engine, Recorder::default());

    // Act
    let result = session.export_pdf().await;

    // Assert
    assert!(result.is_err());
    let seen = session.notifier().seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![Notification {
            title: "Export failed".to_string(),
            description: "The PDF could not be generated. Please try again.".to_string(),
            variant: NotificationVariant::Destructive,
        }]
    );
}

#[tokio::test]
async fn test_export_uses_current_text() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(DirectorySink::new(dir.path()));
    let engine = ExportEngine::from_config(&ExportConfig::default(), sink).unwrap();
    let mut session = EditorSession::new(engine, Recorder::default());
    let long_text = "Line of text.\n\n".repeat(400);

    let welcome = session.export_pdf().await.unwrap();
    session.set_document(long_text);
    let edited = session.export_pdf().await.unwrap();

    assert_eq!(welcome.page_count, 1);
    assert!(edited.page_count > 1);
    assert_eq!(session.notifier().seen.lock().unwrap().len(), 2);
}
