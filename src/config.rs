use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub sth_base_url: Url,
    pub entity_id: String,
    pub fiware_service: String,
    pub fiware_service_path: String,

    pub http_bind: String,

    pub poll_interval: Duration,
    pub last_n: u32,
    pub timezone: Tz,
    pub fetch_timeout: Duration,
}

impl ViewerConfig {
    pub fn from_env(cli_bind: Option<String>) -> Result<Self> {
        let sth_url = env_string("VIEWER_STH_URL", Some("http://127.0.0.1:8666".to_string()))?;
        let sth_base_url = Url::parse(&sth_url).context("invalid VIEWER_STH_URL")?;
        if sth_base_url.host_str().is_none() {
            anyhow::bail!("VIEWER_STH_URL missing host");
        }

        let entity_id = env_string("VIEWER_ENTITY_ID", Some("urn:ngsi-ld:devin".to_string()))?;
        let fiware_service = env_string("VIEWER_FIWARE_SERVICE", Some("smart".to_string()))?;
        let fiware_service_path =
            env_string("VIEWER_FIWARE_SERVICE_PATH", Some("/".to_string()))?;

        let http_bind = cli_bind
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(Ok)
            .unwrap_or_else(|| env_string("VIEWER_HTTP_BIND", Some("0.0.0.0:8050".to_string())))?;

        let poll_interval =
            Duration::from_secs(env_u64("VIEWER_POLL_INTERVAL_SECONDS", Some(10))?.max(1));

        let last_n = env_u64("VIEWER_LAST_N", Some(10))? as u32;
        if last_n == 0 {
            anyhow::bail!("VIEWER_LAST_N must be a positive integer");
        }

        let timezone_name =
            env_string("VIEWER_TIMEZONE", Some("America/Sao_Paulo".to_string()))?;
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|err| anyhow!("invalid VIEWER_TIMEZONE {timezone_name}: {err}"))?;

        let fetch_timeout =
            Duration::from_secs(env_u64("VIEWER_FETCH_TIMEOUT_SECONDS", Some(5))?.max(1));

        Ok(Self {
            sth_base_url,
            entity_id,
            fiware_service,
            fiware_service_path,
            http_bind,
            poll_interval,
            last_n,
            timezone,
            fetch_timeout,
        })
    }
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64(key: &str, default: Option<u64>) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}
