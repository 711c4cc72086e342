//! `eligikit_log` v1:
//! tracing subscriber bootstrap for processes hosting eligikit kernels.
//!
//! Level resolution: `RUST_LOG` when set, otherwise `SpecLogOptions::level`.

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumLogFormat {
    /// Single-line human readable output (default).
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Subscriber options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecLogOptions {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output layout.
    pub format: EnumLogFormat,
    /// Include event targets.
    pub if_with_target: bool,
}

impl Default for SpecLogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: EnumLogFormat::Compact,
            if_with_target: false,
        }
    }
}

/// Build the env filter for `options`.
pub fn derive_env_filter(options: &SpecLogOptions) -> Result<EnvFilter, String> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|err| format!("Invalid log filter {:?}: {err}", options.level))
}

/// Install the global stderr subscriber.
///
/// Returns `Ok(false)` when another subscriber was already installed.
pub fn init_tracing(options: &SpecLogOptions) -> Result<bool, String> {
    let filter = derive_env_filter(options)?;

    let init_result = match options.format {
        EnumLogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(options.if_with_target)
                    .compact(),
            )
            .try_init(),
        EnumLogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(options.if_with_target)
                    .json(),
            )
            .try_init(),
    };

    match init_result {
        Ok(()) => {
            tracing::debug!(level = %options.level, "tracing initialized");
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_tolerant_of_repeat_calls() {
        let options = SpecLogOptions::default();
        init_tracing(&options).expect("first init");
        let if_second = init_tracing(&options).expect("second init");
        assert!(!if_second);
    }

    #[test]
    fn test_derive_env_filter_accepts_directives() {
        let options = SpecLogOptions {
            level: "eligikit_io_xlsx=debug,warn".to_string(),
            ..Default::default()
        };
        assert!(derive_env_filter(&options).is_ok());
    }
}
