use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

use crate::cli::Args;

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:9099";

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub http_bind: String,
    pub timezone: Option<String>,
    pub fixture_path: Option<PathBuf>,
    pub upstream_url: Option<Url>,
    pub fixed_now: Option<i64>,
    pub enable_cors: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            http_bind: DEFAULT_HTTP_BIND.to_string(),
            timezone: None,
            fixture_path: None,
            upstream_url: None,
            fixed_now: None,
            enable_cors: true,
        }
    }
}

impl MockConfig {
    /// Environment first, then CLI flags on top.
    pub fn from_env(args: &Args) -> Result<Self> {
        let http_bind = args
            .bind
            .clone()
            .unwrap_or_else(|| env_string("INCIDENTS_MOCK_HTTP_BIND", DEFAULT_HTTP_BIND));
        let timezone = args
            .timezone
            .clone()
            .or_else(|| env_optional_string("INCIDENTS_MOCK_TIMEZONE"));
        let fixture_path = args
            .fixture
            .clone()
            .or_else(|| env_optional_string("INCIDENTS_MOCK_FIXTURE_PATH").map(PathBuf::from));

        let upstream_url = match args
            .upstream
            .clone()
            .or_else(|| env_optional_string("INCIDENTS_MOCK_UPSTREAM_URL"))
        {
            Some(raw) => Some(parse_upstream_url(&raw)?),
            None => None,
        };

        let fixed_now = match args.fixed_now {
            Some(now) => Some(now),
            None => env_optional_string("INCIDENTS_MOCK_FIXED_NOW")
                .map(|raw| {
                    raw.parse::<i64>()
                        .context("invalid INCIDENTS_MOCK_FIXED_NOW (expected Unix seconds)")
                })
                .transpose()?,
        };

        let enable_cors = env_bool("INCIDENTS_MOCK_ENABLE_CORS", true);

        Ok(Self {
            http_bind,
            timezone,
            fixture_path,
            upstream_url,
            fixed_now,
            enable_cors,
        })
    }
}

fn parse_upstream_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid upstream URL {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("upstream URL must be http or https, got {raw:?}");
    }
    Ok(url)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|value| value.trim().to_lowercase())
    {
        Some(value) if value == "1" || value == "true" || value == "yes" => true,
        Some(value) if value == "0" || value == "false" || value == "no" => false,
        _ => default,
    }
}
