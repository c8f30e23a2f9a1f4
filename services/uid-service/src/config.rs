//! Process configuration, read from the environment.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::generator::RandomGenerator;
use crate::state::DEFAULT_PAGE_SIZE;
use crate::store::DbConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    /// Length of synthesized external ids.
    pub eid_length: usize,
    pub page_size: u64,
    /// Request-template descriptor to serve, if any.
    pub template_path: Option<PathBuf>,
    /// Principals granted the `administrator` role.
    pub administrators: BTreeSet<String>,
    /// `None` selects the in-memory store (dev mode without `DATABASE_URL`).
    pub database: Option<DbConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = var("UID_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .context("UID_LISTEN_ADDR is not a socket address")?;

        let log_level = var("UID_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let dev_mode = var("UID_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let eid_length = match var("UID_EID_LENGTH") {
            Some(v) => v.parse().context("UID_EID_LENGTH is not a number")?,
            None => RandomGenerator::default().length(),
        };

        let page_size = match var("UID_PAGE_SIZE") {
            Some(v) => v.parse().context("UID_PAGE_SIZE is not a number")?,
            None => DEFAULT_PAGE_SIZE,
        };

        let template_path = var("UID_TEMPLATE_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let administrators = var("UID_ADMINISTRATORS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        let database = if dev_mode && var("DATABASE_URL").is_none() {
            None
        } else {
            Some(DbConfig::from_env())
        };

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            eid_length,
            page_size,
            template_path,
            administrators,
            database,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.dev_mode);
        assert_eq!(config.eid_length, 11);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.template_path.is_none());
        assert!(config.administrators.is_empty());
        assert!(config.database.is_some());
    }

    #[test]
    fn dev_mode_without_database_url_uses_memory() {
        let config = load(&[("UID_DEV", "true")]).unwrap();
        assert!(config.dev_mode);
        assert!(config.database.is_none());

        let config = load(&[("UID_DEV", "1"), ("DATABASE_URL", "postgres://db/uid")])
            .unwrap();
        assert!(config.database.is_some());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("UID_LISTEN_ADDR", "0.0.0.0:9000"),
            ("UID_EID_LENGTH", "7"),
            ("UID_PAGE_SIZE", "25"),
            ("UID_TEMPLATE_PATH", "/etc/uid/templates.xml"),
            ("UID_ADMINISTRATORS", "root, ops,"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.eid_length, 7);
        assert_eq!(config.page_size, 25);
        assert_eq!(
            config.administrators.into_iter().collect::<Vec<_>>(),
            vec!["ops".to_string(), "root".to_string()]
        );
        assert_eq!(
            config.template_path.as_deref(),
            Some(std::path::Path::new("/etc/uid/templates.xml"))
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(load(&[("UID_LISTEN_ADDR", "nowhere")]).is_err());
        assert!(load(&[("UID_EID_LENGTH", "eleven")]).is_err());
    }
}
