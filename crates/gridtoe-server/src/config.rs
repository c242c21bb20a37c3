use std::net::SocketAddr;

use serde::Deserialize;

/// Top-level server configuration, loaded from `gridtoe.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            limits: LimitsConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Token bucket refill rate per connection; frames beyond it are dropped.
    pub ws_rate_limit_per_sec: f64,
    /// Outbound queue depth per connection before messages are skipped.
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 20.0,
            player_message_buffer: 256,
        }
    }
}

/// Room lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            idle_check_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Check the configuration, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        if self.limits.max_ws_connections == 0 {
            return Err("limits.max_ws_connections must be > 0".to_string());
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            return Err("limits.ws_rate_limit_per_sec must be > 0".to_string());
        }
        if self.limits.player_message_buffer == 0 {
            return Err("limits.player_message_buffer must be > 0".to_string());
        }
        if self.rooms.idle_timeout_secs == 0 {
            return Err("rooms.idle_timeout_secs must be > 0".to_string());
        }
        if self.rooms.idle_check_interval_secs == 0 {
            return Err("rooms.idle_check_interval_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Load config from `gridtoe.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("gridtoe.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from gridtoe.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse gridtoe.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No gridtoe.toml found, using defaults");
                ServerConfig::default()
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from an environment lookup. `PORT` only replaces the
    /// port of `listen_addr`; `GRIDTOE_LISTEN_ADDR` replaces the whole address.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("GRIDTOE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(val) = var("PORT")
            && let Ok(port) = val.parse::<u16>()
        {
            self.listen_addr = match self.listen_addr.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                },
                Err(_) => format!("0.0.0.0:{port}"),
            };
        }
        if let Some(val) = var("GRIDTOE_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Some(val) = var("GRIDTOE_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.ws_rate_limit_per_sec = n;
        }
    }
}
