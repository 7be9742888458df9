//! Prometheus exporter for JSON HTTP endpoints.
//!
//! Every `/probe?target=<url>` request fetches the target document, flattens it
//! into gauges and returns them in OpenMetrics text format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   ProbeClient   │────>│     Walker      │────>│ GaugeCollector  │
//! │  (fetch JSON)   │     │  (flattening)   │     │ (per-request    │
//! └─────────────────┘     └─────────────────┘     │   registry)     │
//!                                                 └─────────────────┘
//! ```
//!
//! # Naming
//!
//! Object keys are joined with `::`. Arrays add an `array_<depth>` segment and
//! an `array_<depth>_index` label holding the element position:
//!
//! ```text
//! {"x": {"y": [1, 2]}}  =>  x::y::array_0{array_0_index="0"} 1
//!                           x::y::array_0{array_0_index="1"} 2
//! ```
//!
//! # Usage
//!
//! ```bash
//! json-exporter --listen-address 0.0.0.0:9116
//! curl 'http://localhost:9116/probe?target=http://service/stats&prefix=service'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod error;
pub mod http;
pub mod probe;
pub mod stats;
pub mod walker;

pub use collector::{GaugeCollector, GaugeSeries, GaugeSet, collect_json};
pub use config::{ExporterConfig, LogFormat, LoggingConfig};
pub use error::{ProbeError, Result};
pub use http::HttpServer;
pub use probe::{ProbeClient, ProbeOutput};
pub use stats::{ExporterMetrics, SharedMetrics};
pub use walker::{Receiver, walk_json};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
    }

    Ok(())
}
