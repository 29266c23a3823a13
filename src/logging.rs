//! Logger setup for native and browser builds.

use log::LevelFilter;

/// Install the platform logger at `level`.
///
/// Native builds log through `env_logger` (a `RUST_LOG` variable still takes
/// precedence); the browser build logs to the devtools console. Calling this
/// more than once keeps the first logger.
pub fn init(level: LevelFilter) {
    #[cfg(not(target_arch = "wasm32"))]
    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()
        .map_err(|e| e.to_string());

    #[cfg(target_arch = "wasm32")]
    let result = console_log::init_with_level(level.to_level().unwrap_or(log::Level::Error))
        .map_err(|e| e.to_string());

    match result {
        Ok(()) => log::debug!("Logging initialized at {}", level),
        Err(e) => log::debug!("Logger already installed: {}", e),
    }
}
