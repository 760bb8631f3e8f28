//! mdviz - markdown visualizer
//!
//! An editor session with live preview, identity-provider sign-in and a
//! paginating PDF export. Export renders the markdown off-screen at a fixed
//! width, rasterizes it once into a tall bitmap, cuts the bitmap into
//! page-sized bands and writes one image page per band.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod markdown;
pub mod pagination;
pub mod preview;
pub mod world;

// Export pipeline
pub mod export;
pub mod output;
pub mod persist;
pub mod raster;
pub mod renderer;

pub mod session;

pub use config::ExportConfig;
pub use export::{ExportEngine, ExportError, ExportedDocument};
pub use session::EditorSession;
