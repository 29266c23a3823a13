//! mlconsole - client core of the ML model management console
//!
//! Guards long-running training submissions, detects dataset classes from
//! uploaded ZIP archives and dispatches console commands against the backend
//! API. Runs in the browser through WASM; the native build ships a small
//! archive inspection tool.

pub mod api;
pub mod archive;
pub mod config;
pub mod constants;
pub mod form;
pub mod guard;
pub mod handlers;
pub mod logging;
pub mod message;
pub mod session;
pub mod unload;

pub use archive::{ArchiveEntry, ClassScan, DetectedClass, ScanError};
pub use config::AppConfig;
pub use guard::{BlockOverlay, NavigationGuard, UiControl};
pub use handlers::{SubmitError, TrainingController};
pub use message::{Alert, AlertLevel, Command, Reply};

// Browser bindings
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
