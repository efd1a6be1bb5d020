//! Tracer configuration.
//!
//! The recognized options cover the service identity, the collector
//! endpoint, the sampling rate, and the writer's buffering and retry
//! bounds. Defaults may be overridden by `TRACECORE_*` environment
//! variables; unparseable values are ignored in favor of the default.

use crate::export::DEFAULT_COLLECTOR_ENDPOINT;
use crate::trace::writer::{DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER_SIZE};
use std::borrow::Cow;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Service name reported when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "unnamed-service";
/// Default number of delivery retries per batch.
pub const DEFAULT_MAX_RETRIES: usize = 3;

pub(crate) const TRACECORE_SERVICE_NAME: &str = "TRACECORE_SERVICE_NAME";
pub(crate) const TRACECORE_COLLECTOR_ENDPOINT: &str = "TRACECORE_COLLECTOR_ENDPOINT";
pub(crate) const TRACECORE_SAMPLING_RATE: &str = "TRACECORE_SAMPLING_RATE";
pub(crate) const TRACECORE_MAX_BUFFER_SIZE: &str = "TRACECORE_MAX_BUFFER_SIZE";
pub(crate) const TRACECORE_FLUSH_INTERVAL_MS: &str = "TRACECORE_FLUSH_INTERVAL_MS";
pub(crate) const TRACECORE_MAX_RETRIES: &str = "TRACECORE_MAX_RETRIES";

/// Tracer configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// The service spans are reported under.
    pub service_name: Cow<'static, str>,
    /// Where the writer delivers span batches.
    pub collector_endpoint: String,
    /// Fraction of traces to keep, in `[0, 1]`.
    pub sampling_rate: f64,
    /// Maximum number of spans buffered by the writer.
    pub max_buffer_size: usize,
    /// Delay between two consecutive periodic flushes.
    pub flush_interval: Duration,
    /// Number of delivery retries per batch before it is dropped.
    pub max_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::default().build()
    }
}

impl Config {
    /// Start building a configuration. The builder begins from the defaults
    /// with environment overrides already applied.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`].
#[derive(Debug)]
pub struct ConfigBuilder {
    service_name: Cow<'static, str>,
    collector_endpoint: String,
    sampling_rate: f64,
    max_buffer_size: usize,
    flush_interval: Duration,
    max_retries: usize,
}

impl Default for ConfigBuilder {
    /// Defaults with `TRACECORE_*` environment variables applied on top.
    fn default() -> Self {
        ConfigBuilder {
            service_name: Cow::Borrowed(DEFAULT_SERVICE_NAME),
            collector_endpoint: DEFAULT_COLLECTOR_ENDPOINT.to_string(),
            sampling_rate: 1.0,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
        .init_from_env_vars()
    }
}

impl ConfigBuilder {
    /// Assign the service name spans are reported under.
    pub fn with_service_name<T: Into<Cow<'static, str>>>(mut self, service_name: T) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Assign the collector endpoint.
    pub fn with_collector_endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        self.collector_endpoint = endpoint.into();
        self
    }

    /// Fraction of traces to keep. Clamped to `[0, 1]` at build.
    pub fn with_sampling_rate(mut self, sampling_rate: f64) -> Self {
        self.sampling_rate = sampling_rate;
        self
    }

    /// Maximum number of spans buffered by the writer.
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Delay between two consecutive periodic flushes.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Number of delivery retries per batch before it is dropped.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Build the configuration, clamping `sampling_rate` into `[0, 1]`.
    pub fn build(self) -> Config {
        Config {
            service_name: self.service_name,
            collector_endpoint: self.collector_endpoint,
            sampling_rate: self.sampling_rate.clamp(0.0, 1.0),
            max_buffer_size: self.max_buffer_size.max(1),
            flush_interval: self.flush_interval,
            max_retries: self.max_retries,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Ok(service_name) = env::var(TRACECORE_SERVICE_NAME) {
            if !service_name.is_empty() {
                self.service_name = Cow::Owned(service_name);
            }
        }

        if let Ok(endpoint) = env::var(TRACECORE_COLLECTOR_ENDPOINT) {
            if !endpoint.is_empty() {
                self.collector_endpoint = endpoint;
            }
        }

        if let Some(sampling_rate) = parse_env_var::<f64>(TRACECORE_SAMPLING_RATE) {
            self.sampling_rate = sampling_rate;
        }

        if let Some(max_buffer_size) = parse_env_var::<usize>(TRACECORE_MAX_BUFFER_SIZE) {
            self.max_buffer_size = max_buffer_size;
        }

        if let Some(flush_interval) = parse_env_var::<u64>(TRACECORE_FLUSH_INTERVAL_MS) {
            self.flush_interval = Duration::from_millis(flush_interval);
        }

        if let Some(max_retries) = parse_env_var::<usize>(TRACECORE_MAX_RETRIES) {
            self.max_retries = max_retries;
        }

        self
    }
}

/// Parse a numeric environment variable; unparseable values are logged and
/// ignored so the default survives.
fn parse_env_var<T: FromStr>(name: &'static str) -> Option<T> {
    let value = env::var(name).ok()?;
    match T::from_str(&value) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(
                name: "Config.InvalidEnvValue",
                variable = name,
                value = value,
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: [&str; 6] = [
        TRACECORE_SERVICE_NAME,
        TRACECORE_COLLECTOR_ENDPOINT,
        TRACECORE_SAMPLING_RATE,
        TRACECORE_MAX_BUFFER_SIZE,
        TRACECORE_FLUSH_INTERVAL_MS,
        TRACECORE_MAX_RETRIES,
    ];

    #[test]
    fn defaults_without_env() {
        let config = temp_env::with_vars_unset(ALL_VARS, Config::default);

        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(config.collector_endpoint, DEFAULT_COLLECTOR_ENDPOINT);
        assert_eq!(config.sampling_rate, 1.0);
        assert_eq!(config.max_buffer_size, DEFAULT_MAX_BUFFER_SIZE);
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn env_vars_override_defaults() {
        let config = temp_env::with_vars(
            [
                (TRACECORE_SERVICE_NAME, Some("cache-proxy")),
                (TRACECORE_COLLECTOR_ENDPOINT, Some("http://agent:8126")),
                (TRACECORE_SAMPLING_RATE, Some("0.25")),
                (TRACECORE_MAX_BUFFER_SIZE, Some("4096")),
                (TRACECORE_FLUSH_INTERVAL_MS, Some("2000")),
                (TRACECORE_MAX_RETRIES, Some("5")),
            ],
            Config::default,
        );

        assert_eq!(config.service_name, "cache-proxy");
        assert_eq!(config.collector_endpoint, "http://agent:8126");
        assert_eq!(config.sampling_rate, 0.25);
        assert_eq!(config.max_buffer_size, 4096);
        assert_eq!(config.flush_interval, Duration::from_millis(2000));
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn invalid_env_values_fall_back() {
        let config = temp_env::with_vars(
            [
                (TRACECORE_SAMPLING_RATE, Some("not-a-number")),
                (TRACECORE_MAX_BUFFER_SIZE, Some("-1")),
            ],
            Config::default,
        );

        assert_eq!(config.sampling_rate, 1.0);
        assert_eq!(config.max_buffer_size, DEFAULT_MAX_BUFFER_SIZE);
    }

    #[test]
    fn sampling_rate_is_clamped() {
        let config = Config::builder().with_sampling_rate(7.5).build();
        assert_eq!(config.sampling_rate, 1.0);
        let config = Config::builder().with_sampling_rate(-0.5).build();
        assert_eq!(config.sampling_rate, 0.0);
    }
}
