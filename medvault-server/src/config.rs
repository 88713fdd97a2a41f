use std::net::SocketAddr;

use mongodb::Namespace;

use medvault_core::records;

pub const BIND_ADDRESS_VAR: &str = "MEDVAULT__BIND_ADDRESS";
pub const DATABASE_VAR: &str = "MEDVAULT__DATABASE";
pub const COLLECTION_VAR: &str = "MEDVAULT__COLLECTION";

const DEFAULT_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
    8080,
);

/// Runtime settings for the HTTP server, separate from the connection
/// credentials loaded by `medvault-core`.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub bind_addr: SocketAddr,
    pub database: String,
    pub collection: String,
    pub key_vault_namespace: Namespace,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND,
            database: records::DATABASE.to_string(),
            collection: records::COLLECTION.to_string(),
            key_vault_namespace: records::key_vault_namespace(),
        }
    }
}

impl RuntimeConfig {
    /// Builds the config from environment variables, then applies CLI
    /// overrides. Unparseable bind addresses fall back to the default.
    pub fn resolve(
        bind: Option<String>,
        database: Option<String>,
        collection: Option<String>,
    ) -> Self {
        let mut config = Self::default();
        if let Some(bind) = bind.or_else(|| std::env::var(BIND_ADDRESS_VAR).ok())
            && let Ok(addr) = bind.parse()
        {
            config.bind_addr = addr;
        }
        if let Some(database) = database.or_else(|| std::env::var(DATABASE_VAR).ok()) {
            config.database = database;
        }
        if let Some(collection) = collection.or_else(|| std::env::var(COLLECTION_VAR).ok()) {
            config.collection = collection;
        }
        config
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.database.clone(), self.collection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: tests touching the process environment run serially.
        unsafe {
            std::env::remove_var(BIND_ADDRESS_VAR);
            std::env::remove_var(DATABASE_VAR);
            std::env::remove_var(COLLECTION_VAR);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_without_overrides() {
        clear_env();
        let config = RuntimeConfig::resolve(None, None, None);
        assert_eq!(config.bind_addr, DEFAULT_BIND);
        assert_eq!(config.database, records::DATABASE);
        assert_eq!(config.collection, records::COLLECTION);
    }

    #[test]
    #[serial]
    fn cli_overrides_win_over_env() {
        clear_env();
        // SAFETY: serial test.
        unsafe {
            std::env::set_var(DATABASE_VAR, "env_db");
        }
        let config = RuntimeConfig::resolve(
            Some("127.0.0.1:9999".to_string()),
            Some("cli_db".to_string()),
            None,
        );
        assert_eq!(config.bind_addr, "127.0.0.1:9999".parse().unwrap());
        assert_eq!(config.database, "cli_db");
        clear_env();
    }

    #[test]
    #[serial]
    fn bad_bind_address_falls_back_to_default() {
        clear_env();
        let config = RuntimeConfig::resolve(Some("not-an-address".to_string()), None, None);
        assert_eq!(config.bind_addr, DEFAULT_BIND);
    }
}
