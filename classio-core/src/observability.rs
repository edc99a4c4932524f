/*!
Observability for classio: structured logging setup and, with the `metrics`
feature, Prometheus counters for container saves and loads.
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{ClassioError, Result};

/// Directive applied on top of `RUST_LOG`
pub const DEFAULT_DIRECTIVE: &str = "classio=info";

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Option<ClassioMetrics>> = OnceLock::new();

/// Metrics collected by save/load
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct ClassioMetrics {
    pub containers_saved_total: Counter,
    pub containers_loaded_total: Counter,
    pub save_errors_total: Counter,
    pub load_errors_total: Counter,
    pub container_size_bytes: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter> {
    let counter = Counter::new(name, help)
        .map_err(|e| ClassioError::storage(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| ClassioError::storage(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
impl ClassioMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let containers_saved_total = counter(
            &registry,
            "classio_containers_saved_total",
            "Total containers saved",
        )?;
        let containers_loaded_total = counter(
            &registry,
            "classio_containers_loaded_total",
            "Total containers loaded",
        )?;
        let save_errors_total = counter(
            &registry,
            "classio_save_errors_total",
            "Total failed container saves",
        )?;
        let load_errors_total = counter(
            &registry,
            "classio_load_errors_total",
            "Total failed container loads",
        )?;

        let container_size_bytes = Histogram::with_opts(
            HistogramOpts::new(
                "classio_container_size_bytes",
                "Stored size of containers in bytes",
            )
            .buckets(prometheus::exponential_buckets(256.0, 4.0, 10).map_err(|e| {
                ClassioError::storage(format!("Failed to build size buckets: {e}"))
            })?),
        )
        .map_err(|e| {
            ClassioError::storage(format!("Failed to create container_size_bytes metric: {e}"))
        })?;
        registry
            .register(Box::new(container_size_bytes.clone()))
            .map_err(|e| {
                ClassioError::storage(format!("Failed to register container_size_bytes: {e}"))
            })?;

        Ok(Self {
            containers_saved_total,
            containers_loaded_total,
            save_errors_total,
            load_errors_total,
            container_size_bytes,
            registry,
        })
    }

    /// The process-wide metrics, or `None` if they could not be registered
    pub fn global() -> Option<&'static ClassioMetrics> {
        METRICS
            .get_or_init(|| match Self::new() {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    tracing::warn!(error = %e, "Metrics disabled");
                    None
                }
            })
            .as_ref()
    }

    pub fn record_save(&self, size_bytes: usize) {
        self.containers_saved_total.inc();
        self.container_size_bytes.observe(size_bytes as f64);
    }

    pub fn record_load(&self, size_bytes: usize) {
        self.containers_loaded_total.inc();
        self.container_size_bytes.observe(size_bytes as f64);
    }

    pub fn record_save_error(&self) {
        self.save_errors_total.inc();
    }

    pub fn record_load_error(&self) {
        self.load_errors_total.inc();
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| ClassioError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| ClassioError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

pub(crate) fn record_save(_size_bytes: usize) {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = ClassioMetrics::global() {
        metrics.record_save(_size_bytes);
    }
}

pub(crate) fn record_load(_size_bytes: usize) {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = ClassioMetrics::global() {
        metrics.record_load(_size_bytes);
    }
}

pub(crate) fn record_save_error() {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = ClassioMetrics::global() {
        metrics.record_save_error();
    }
}

pub(crate) fn record_load_error() {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = ClassioMetrics::global() {
        metrics.record_load_error();
    }
}

/// Install the global tracing subscriber
///
/// Events are written as JSON lines. `RUST_LOG` selects what is emitted and
/// `directive` is added on top of it.
///
/// # Errors
/// * `ClassioError::Validation` - If `directive` does not parse
/// * `ClassioError::Storage` - If a global subscriber is already installed
pub fn init_observability(directive: &str) -> Result<()> {
    #[cfg(feature = "metrics")]
    ClassioMetrics::global();

    let directive: Directive = directive
        .parse()
        .map_err(|e| ClassioError::validation(format!("Invalid log directive `{directive}`: {e}")))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(false);

    let subscriber = TracingRegistry::default()
        .with(EnvFilter::from_default_env().add_directive(directive))
        .with(fmt_layer);

    set_global_default(subscriber).map_err(|e| {
        ClassioError::storage(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::info!("classio observability initialized");
    Ok(())
}

/// Initialize observability with [`DEFAULT_DIRECTIVE`]
pub fn init_default_observability() -> Result<()> {
    init_observability(DEFAULT_DIRECTIVE)
}
