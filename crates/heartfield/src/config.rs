//! Server-wide settings.

use std::time::Duration;

use heartfield_room::RoomConfig;

/// Settings for one [`HeartfieldServer`](crate::HeartfieldServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Concurrent connections allowed from one source address.
    pub max_connections_per_address: usize,

    /// How long a new connection has to send its handshake.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// Seeds the server RNG. `None` seeds from the OS.
    pub rng_seed: Option<u64>,

    /// Rules applied to every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_connections_per_address: 5,
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
            rng_seed: None,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the process environment.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `HEARTFIELD_BIND` | `bind_addr` |
    /// | `HEARTFIELD_MAX_CONNECTIONS_PER_ADDRESS` | `max_connections_per_address` |
    /// | `HEARTFIELD_IDLE_TIMEOUT_SECS` | `idle_timeout` |
    /// | `HEARTFIELD_RNG_SEED` | `rng_seed` |
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HEARTFIELD_BIND").filter(|a| !a.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        }
        if let Some(max) = parse_var(&lookup, "HEARTFIELD_MAX_CONNECTIONS_PER_ADDRESS") {
            config.max_connections_per_address = max;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "HEARTFIELD_IDLE_TIMEOUT_SECS") {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(seed) = parse_var(&lookup, "HEARTFIELD_RNG_SEED") {
            config.rng_seed = Some(seed);
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}
