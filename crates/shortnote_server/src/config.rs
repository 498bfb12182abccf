use shortnote_core::CoreConfig;
use std::net::SocketAddr;

use crate::error::{ServerError, ServerResult};

/// Environment key for the listen address.
pub const ENV_BIND_ADDR: &str = "SHORTNOTE_BIND_ADDR";

/// Listener settings plus the core configuration injected into every request.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub core: CoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            core: CoreConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr, core: CoreConfig) -> Self {
        Self { bind_addr, core }
    }

    /// Resolves listener and core settings from the environment.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let core = CoreConfig::from_lookup(&lookup)?;
        let bind_addr = match lookup(ENV_BIND_ADDR).map(|raw| raw.trim().to_string()) {
            Some(raw) if !raw.is_empty() => raw.parse().map_err(|_| {
                ServerError::Config(format!("invalid value `{raw}` for {ENV_BIND_ADDR}"))
            })?,
            _ => default_bind_addr(),
        };
        Ok(Self { bind_addr, core })
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.core.max_alloc_attempts, 10);
    }

    #[test]
    fn bind_addr_from_lookup() {
        let c = ServerConfig::from_lookup(|key| match key {
            ENV_BIND_ADDR => Some("0.0.0.0:8080".to_string()),
            "SHORTNOTE_MAX_ALLOC_ATTEMPTS" => Some("4".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(c.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.core.max_alloc_attempts, 4);
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let err = ServerConfig::from_lookup(|key| {
            (key == ENV_BIND_ADDR).then(|| "not-an-addr".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn core_settings_resolve_through_server_lookup() {
        let err = ServerConfig::from_lookup(|key| {
            (key == "SHORTNOTE_MAX_ALLOC_ATTEMPTS").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ServerError::CoreConfig(_)));
    }
}
