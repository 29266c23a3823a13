//! Global constants for the ML console

/// Image extensions that count toward a class when scanning a dataset archive.
pub const CLASS_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Spreadsheet extensions the tabular training endpoint accepts.
pub const TABULAR_FILE_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Path separator used inside ZIP archives.
pub const ARCHIVE_PATH_SEPARATOR: char = '/';

/// Default backend location when no configuration is stored.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Archives larger than this trigger a confirmation before upload (bytes).
pub const DEFAULT_LARGE_ARCHIVE_WARNING_BYTES: u64 = 200 * 1024 * 1024;

/// DOM id of the blocking overlay shown while a training request is outstanding.
pub const BLOCK_OVERLAY_ID: &str = "training-block-overlay";

/// CSS class toggled on the overlay to make it visible.
pub const BLOCK_OVERLAY_ACTIVE_CLASS: &str = "active";

/// CSS class toggled on the submit control while it is in progress.
pub const CONTROL_LOADING_CLASS: &str = "loading";

/// Text shown inside the blocking overlay.
pub const BLOCK_OVERLAY_MESSAGE: &str =
    "Training in progress. Please do not close or refresh the page.";

/// Prompt handed to the browser when the user tries to leave mid-training.
pub const UNLOAD_PROMPT: &str = "Training is in progress. If you leave now, the progress will be lost.";

/// Held-out fraction used when a form leaves it unset.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// CNN form defaults, matching what the backend assumes for missing fields.
pub mod cnn_defaults {
    pub const ARCHITECTURE: &str = "custom";
    pub const NUM_CLASSES: u32 = 2;
    pub const LEARNING_RATE: f64 = 0.001;
    pub const DROPOUT_RATE: f64 = 0.5;
    pub const EPOCHS: u32 = 10;
    pub const BATCH_SIZE: u32 = 32;
    pub const TEST_SIZE: f64 = super::DEFAULT_TEST_SIZE;
    pub const INPUT_HEIGHT: u32 = 224;
    pub const INPUT_WIDTH: u32 = 224;
    pub const FILTERS: &[u32] = &[32, 64, 128];
    pub const DENSE_UNITS: u32 = 128;

    /// Upper bound accepted for the learning rate.
    pub const MAX_LEARNING_RATE: f64 = 0.1;
    /// Minimum number of classes a classifier can be trained on.
    pub const MIN_CLASSES: u32 = 2;
}
