//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resilience/ and ai/ produce:
//!     → logging.rs (structured log events, one span per logical call)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
