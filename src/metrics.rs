//! Prometheus recorder for the binary. Library code only emits through the
//! `metrics` facade; without an installed recorder those calls are no-ops.

use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";

pub struct Metrics {
    pub handle: Option<PrometheusHandle>,
}

impl Metrics {
    /// With `addr`, serve `/metrics` over HTTP (needs a tokio runtime);
    /// otherwise install a recorder whose handle renders on demand.
    pub fn init(addr: Option<SocketAddr>) -> Result<Self> {
        let builder = PrometheusBuilder::new();
        let handle = match addr {
            Some(addr) => {
                builder
                    .with_http_listener(addr)
                    .install()
                    .context("prometheus: install http listener")?;
                None
            }
            None => Some(
                builder
                    .install_recorder()
                    .context("prometheus: install recorder")?,
            ),
        };

        gauge!("build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

        Ok(Self { handle })
    }

    /// Reads `METRICS_ADDR`; an unparsable value is an error.
    pub fn init_from_env() -> Result<Self> {
        let addr = match std::env::var(ENV_METRICS_ADDR) {
            Ok(s) if !s.trim().is_empty() => Some(
                s.trim()
                    .parse::<SocketAddr>()
                    .with_context(|| format!("{ENV_METRICS_ADDR}={s} is not host:port"))?,
            ),
            _ => None,
        };
        Self::init(addr)
    }

    /// Prometheus text exposition; empty when served over HTTP instead.
    pub fn render(&self) -> String {
        self.handle.as_ref().map(|h| h.render()).unwrap_or_default()
    }
}
