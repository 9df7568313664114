//! Process configuration read from the environment.

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::backend::domain::DEFAULT_UPCOMING_DAYS;

const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory holding per-farm data; may contain a redirect file
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    /// Seeds the session instead of the persisted global config
    pub farm_id: Option<String>,
    pub actor_id: Option<String>,
    pub upcoming_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = match non_empty("HERDBOOK_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = non_empty("HOME")
                    .or_else(|| non_empty("USERPROFILE"))
                    .ok_or_else(|| anyhow!("Could not determine home directory; set HERDBOOK_DATA_DIR"))?;
                PathBuf::from(home).join("Documents").join("Herdbook")
            }
        };

        let bind = non_empty("HERDBOOK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid HERDBOOK_BIND address: {}", bind))?;

        let upcoming_days = match non_empty("HERDBOOK_UPCOMING_DAYS") {
            Some(days) => days
                .parse::<u32>()
                .with_context(|| format!("Invalid HERDBOOK_UPCOMING_DAYS: {}", days))?,
            None => DEFAULT_UPCOMING_DAYS,
        };

        Ok(Self {
            data_dir,
            bind_addr,
            farm_id: non_empty("HERDBOOK_FARM_ID"),
            actor_id: non_empty("HERDBOOK_ACTOR_ID"),
            upcoming_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("HOME", "/home/shepherd")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/home/shepherd/Documents/Herdbook"));
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.farm_id, None);
        assert_eq!(config.actor_id, None);
        assert_eq!(config.upcoming_days, 30);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HERDBOOK_DATA_DIR", "/srv/herdbook"),
            ("HERDBOOK_BIND", "0.0.0.0:8080"),
            ("HERDBOOK_FARM_ID", "hill-farm"),
            ("HERDBOOK_ACTOR_ID", "  "),
            ("HERDBOOK_UPCOMING_DAYS", "14"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/herdbook"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.farm_id.as_deref(), Some("hill-farm"));
        assert_eq!(config.actor_id, None);
        assert_eq!(config.upcoming_days, 14);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(AppConfig::from_lookup(lookup(&[("HOME", "/h"), ("HERDBOOK_BIND", "nowhere")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("HOME", "/h"), ("HERDBOOK_UPCOMING_DAYS", "-3")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
    }
}
