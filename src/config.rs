use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub session_ttl_secs: u64,
    pub session_max_capacity: u64,
    pub max_upload_bytes: usize,
    pub demo_max_rows: usize,
    pub report_lines_per_page: usize,
    /// Upper bound for `?bins=` on the charts endpoint.
    pub max_histogram_bins: usize,
    /// Requests per second per client IP; 0 turns the limiter off.
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            session_ttl_secs: 3600,
            session_max_capacity: 10_000,
            max_upload_bytes: 5 * 1024 * 1024,
            demo_max_rows: 5000,
            report_lines_per_page: 40,
            max_histogram_bins: 200,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}

/// Reads `name`, falling back to `default` when unset or blank.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid non-negative number, got '{}'", name, raw)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            session_ttl_secs: env_or("SESSION_TTL_SECS", defaults.session_ttl_secs).and_then(
                |secs| {
                    if secs == 0 {
                        anyhow::bail!("SESSION_TTL_SECS must be greater than zero");
                    }
                    Ok(secs)
                },
            )?,
            session_max_capacity: env_or("SESSION_MAX_CAPACITY", defaults.session_max_capacity)?,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes).and_then(
                |bytes| {
                    if bytes == 0 {
                        anyhow::bail!("MAX_UPLOAD_BYTES must be greater than zero");
                    }
                    Ok(bytes)
                },
            )?,
            demo_max_rows: env_or("DEMO_MAX_ROWS", defaults.demo_max_rows)?,
            report_lines_per_page: env_or("REPORT_LINES_PER_PAGE", defaults.report_lines_per_page)
                .and_then(|lines| {
                    if lines == 0 {
                        anyhow::bail!("REPORT_LINES_PER_PAGE must be greater than zero");
                    }
                    Ok(lines)
                })?,
            max_histogram_bins: env_or("MAX_HISTOGRAM_BINS", defaults.max_histogram_bins)
                .and_then(|bins| {
                    if bins == 0 {
                        anyhow::bail!("MAX_HISTOGRAM_BINS must be greater than zero");
                    }
                    Ok(bins)
                })?,
            rate_limit_per_second: env_or("RATE_LIMIT_PER_SECOND", defaults.rate_limit_per_second)?,
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst).and_then(
                |burst| {
                    if burst == 0 {
                        anyhow::bail!("RATE_LIMIT_BURST must be greater than zero");
                    }
                    Ok(burst)
                },
            )?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Sessions: ttl={}s, capacity={}",
            config.session_ttl_secs,
            config.session_max_capacity
        );
        tracing::debug!(
            "Limits: upload={} bytes, demo rows={}, report lines/page={}, histogram bins={}",
            config.max_upload_bytes,
            config.demo_max_rows,
            config.report_lines_per_page,
            config.max_histogram_bins
        );
        if config.rate_limiting_enabled() {
            tracing::debug!(
                "Rate limit: {} req/s per IP, burst {}",
                config.rate_limit_per_second,
                config.rate_limit_burst
            );
        } else {
            tracing::warn!("Rate limiting disabled (RATE_LIMIT_PER_SECOND=0)");
        }

        Ok(config)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit_per_second > 0
    }
}
