//! Periodic self-ping that stops free-tier hosting from idling the service.

use rand::Rng;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::KeepWarmSettings;

pub const USER_AGENT: &str = "Lectern-KeepWarm/1.0";

/// Work out the URL to ping.
///
/// The base is `keep_warm.url`, else `RENDER_EXTERNAL_URL`, else
/// `PUBLIC_BASE_URL`, else the built-in default. Blank values are skipped.
pub fn resolve_url<F>(settings: &KeepWarmSettings, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let base = settings
        .url
        .clone()
        .into_iter()
        .chain(lookup("RENDER_EXTERNAL_URL"))
        .chain(lookup("PUBLIC_BASE_URL"))
        .find(|url| !url.trim().is_empty())
        .unwrap_or_else(|| settings.default_url.clone());

    let path = if settings.path.is_empty() || settings.path.starts_with('/') {
        settings.path.clone()
    } else {
        format!("/{}", settings.path)
    };

    format!("{}{}", base.trim().trim_end_matches('/'), path)
}

/// Pings a health URL on a fixed schedule with random jitter.
pub struct KeepWarm {
    client: Client,
    url: String,
    initial_delay: Duration,
    interval: Duration,
    max_jitter: Duration,
}

impl KeepWarm {
    pub fn new(settings: &KeepWarmSettings, url: String) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url,
            initial_delay: Duration::from_secs(settings.initial_delay_secs),
            interval: Duration::from_secs(settings.interval_min.max(1) * 60),
            max_jitter: Duration::from_secs(settings.jitter_secs),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ping once, without jitter.
    pub async fn ping(&self) -> reqwest::Result<StatusCode> {
        let response = self.client.get(&self.url).send().await?;
        Ok(response.status())
    }

    /// First ping after the initial delay, then one per interval. Each ping
    /// waits a random jitter first. Failures are logged and never stop the
    /// loop.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            url = %self.url,
            every_min = self.interval.as_secs() / 60,
            "Keep-warm scheduled"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.initial_delay, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                tokio::time::sleep(self.jitter()).await;
                self.tick().await;
            }
        })
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..max))
    }

    async fn tick(&self) {
        let started = Instant::now();
        match self.ping().await {
            Ok(status) => info!(
                url = %self.url,
                status = status.as_u16(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Keep-warm ping ok"
            ),
            Err(e) => warn!(url = %self.url, error = %e, "Keep-warm ping failed"),
        }
    }
}
