//! Logger setup for binaries and tests.
//!
//! The library only emits through `log`. [`init_logging`] installs
//! `env_logger` with a filter that keeps the GPU stack quiet unless asked.

use std::sync::Once;

use env_logger::WriteStyle;
use log::LevelFilter;

/// Crates below ember that log per frame at `info`.
const GPU_CRATES: [&str; 4] = ["wgpu_core", "wgpu_hal", "wgpu", "naga"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for ember itself and anything not named in `directives`.
    pub level: LevelFilter,
    /// Level for the wgpu and naga crates.
    pub gpu_level: LevelFilter,
    /// Extra `env_logger` directives applied last, e.g. "ember::render=trace".
    pub directives: Option<String>,
    pub write_style: WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            gpu_level: LevelFilter::Warn,
            directives: None,
            write_style: WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    #[must_use]
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_gpu_level(mut self, level: LevelFilter) -> Self {
        self.gpu_level = level;
        self
    }

    #[must_use]
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    /// Filter string handed to `env_logger`. `RUST_LOG`, when set, replaces
    /// `directives`.
    pub fn filter(&self) -> String {
        let mut filter = self.level.to_string().to_lowercase();
        for krate in GPU_CRATES {
            filter.push_str(&format!(",{krate}={}", self.gpu_level.to_string().to_lowercase()));
        }
        let extra = std::env::var("RUST_LOG").ok().or_else(|| self.directives.clone());
        if let Some(extra) = extra.filter(|extra| !extra.is_empty()) {
            filter.push(',');
            filter.push_str(&extra);
        }
        filter
    }
}

static INIT: Once = Once::new();

/// Install `env_logger` on first call. Later calls, or a logger already
/// installed by the host, leave the existing logger in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.filter();
        let installed = env_logger::Builder::new()
            .parse_filters(&filter)
            .write_style(config.write_style)
            .try_init()
            .is_ok();
        if installed {
            log::debug!("logger installed with filter '{filter}'");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_quiets_gpu_crates() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let filter = LoggingConfig::default().filter();
        assert!(filter.starts_with("info,"), "{filter}");
        assert!(filter.contains("wgpu_core=warn"), "{filter}");
        assert!(filter.contains("naga=warn"), "{filter}");
    }

    #[test]
    fn directives_are_appended_last() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let filter = LoggingConfig::default()
            .with_level(LevelFilter::Debug)
            .with_gpu_level(LevelFilter::Error)
            .with_directives("ember::render=trace")
            .filter();
        assert!(filter.starts_with("debug,"), "{filter}");
        assert!(filter.contains("wgpu_hal=error"), "{filter}");
        assert!(filter.ends_with(",ember::render=trace"), "{filter}");
    }

    #[test]
    fn repeated_init_is_ignored() {
        init_logging(LoggingConfig::default().with_directives("ember=trace"));
        init_logging(LoggingConfig::default());
        assert!(INIT.is_completed());
    }
}
