use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::widgets::log_viewer::{LogBuffer, LogViewerLayer};

/// Where log events go
#[derive(Debug, Clone)]
pub enum LogSink {
    /// Compact lines on stderr
    Stderr,
    /// Into a log viewer widget, for when a full-screen UI owns the terminal
    Viewer(LogBuffer),
    Off,
}

fn default_level(verbose: bool, configured: &str) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    configured.parse().unwrap_or(Level::INFO)
}

pub fn init_logging(verbose: bool, configured_level: &str, sink: LogSink) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose, configured_level).into())
        .from_env_lossy();

    match sink {
        LogSink::Off => {}
        LogSink::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .try_init()?;
        }
        LogSink::Viewer(buffer) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(LogViewerLayer::new(buffer))
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true, "warn"), Level::DEBUG);
        assert_eq!(default_level(false, "warn"), Level::WARN);
        assert_eq!(default_level(false, "nonsense"), Level::INFO);
    }
}
