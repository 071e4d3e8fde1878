use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::data::{LineProfile, ProductionLine, RandomSource};

pub const DEFAULT_POINTS: usize = 30;

/// Page-level configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub page_title: String,
    pub wide_layout: bool,
    pub points: usize,
    pub seed: Option<u64>,
    pub bind_addr: String,
    pub port: u16,
    /// When set, the page is written here and the process exits.
    pub export_path: Option<PathBuf>,
    /// How long the server waits for a request line before dropping the connection.
    pub read_timeout: Duration,
    pub profiles: Vec<LineProfile>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_title: "Manufacturing Dashboard".to_string(),
            wide_layout: true,
            points: DEFAULT_POINTS,
            seed: None,
            bind_addr: "127.0.0.1".to_string(),
            port: 8501,
            export_path: None,
            read_timeout: Duration::from_secs(5),
            profiles: ProductionLine::ALL.iter().map(|l| l.default_profile()).collect(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            page_title: get("PAGE_TITLE").unwrap_or(d.page_title),
            wide_layout: get("WIDE_LAYOUT").map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")).unwrap_or(d.wide_layout),
            points: get("SPC_POINTS").and_then(|v| v.parse().ok()).unwrap_or(d.points).max(1),
            seed: get("SPC_SEED").and_then(|v| v.parse().ok()),
            bind_addr: get("BIND_ADDR").unwrap_or(d.bind_addr),
            port: get("PORT").and_then(|v| v.parse().ok()).unwrap_or(d.port),
            export_path: get("EXPORT_PATH").filter(|v| !v.is_empty()).map(PathBuf::from),
            read_timeout: get("READ_TIMEOUT_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(|ms| Duration::from_millis(ms.max(1)))
                .unwrap_or(d.read_timeout),
            profiles: ProductionLine::ALL.iter().map(|&line| profile_from_lookup(line, &get)).collect(),
        }
    }

    pub fn random_source(&self) -> RandomSource {
        match self.seed {
            Some(seed) => RandomSource::Seeded(seed),
            None => RandomSource::Entropy,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }
}

/// `LINE1_MEAN`, `LINE1_STD` and so on override the built-in profiles.
fn profile_from_lookup(line: ProductionLine, get: &impl Fn(&str) -> Option<String>) -> LineProfile {
    let d = line.default_profile();
    let key = line.env_key();
    LineProfile {
        line,
        mean: get(&format!("{}_MEAN", key)).and_then(|v| v.parse().ok()).unwrap_or(d.mean),
        std_dev: get(&format!("{}_STD", key)).and_then(|v| v.parse().ok()).unwrap_or(d.std_dev),
    }
}
