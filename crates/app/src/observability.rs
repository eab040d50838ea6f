//! Logging subscriber initialisation.

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::MakeWriter,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingConfig};

/// Errors raised while initialising logging.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// Failed to initialise tracing subscriber.
    #[error("failed to initialise tracing subscriber: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), ObservabilityError> {
    match config.log_format {
        LogFormat::Compact => init_with_layer(config, compact_layer(std::io::stderr)),
        LogFormat::Json => init_with_layer(config, json_layer(std::io::stderr)),
    }
}

fn compact_layer<W>(writer: W) -> impl Layer<Registry> + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
}

fn json_layer<W>(writer: W) -> impl Layer<Registry> + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},h2=warn,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn",
            config.log_level
        ))
    })
}

fn init_with_layer<L>(config: &LoggingConfig, fmt_layer: L) -> Result<(), ObservabilityError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_env_filter(config))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use testresult::TestResult;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn json_layer_writes_one_object_per_event() -> TestResult {
        let captured = Captured::default();
        let writer = captured.clone();

        let subscriber = tracing_subscriber::registry().with(json_layer(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(order = 31, "payment settled");
        });

        let text = captured.text();
        let event: serde_json::Value = serde_json::from_str(text.trim())?;

        assert_eq!(event["fields"]["message"], "payment settled", "event: {text}");
        assert_eq!(event["fields"]["order"], 31, "event: {text}");
        assert_eq!(event["level"], "INFO", "event: {text}");
        assert!(
            event["target"].as_str().is_some_and(|target| target.contains("observability")),
            "event: {text}"
        );

        Ok(())
    }

    #[test]
    fn compact_layer_names_the_source_location() {
        let captured = Captured::default();
        let writer = captured.clone();

        let subscriber = tracing_subscriber::registry().with(compact_layer(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("cart write failed");
        });

        let text = captured.text();

        assert!(text.contains("cart write failed"), "line: {text}");
        assert!(text.contains("observability.rs"), "line: {text}");
    }
}
