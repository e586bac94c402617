//! Reader configuration.

/// Environment variable read by [`ReaderOptions::from_env`].
pub const DEBUG_ENV: &str = "WIRECALL_DEBUG";

/// Settings applied when a reader is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    debug: bool,
}

impl ReaderOptions {
    /// Default options: diagnostic capture off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from the environment.
    ///
    /// `WIRECALL_DEBUG` set to `1`, `true`, `yes` or `on` (any case) turns on
    /// diagnostic capture.
    pub fn from_env() -> Self {
        let debug = std::env::var(DEBUG_ENV)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        Self { debug }
    }

    /// Log every record at debug level before dispatching it.
    ///
    /// Capture is still skipped while no subscriber has debug enabled.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Whether diagnostic capture is on.
    pub fn debug(&self) -> bool {
        self.debug
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
