use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub history_limit: usize,
    pub new_client_backlog: usize,
    pub web_socket_config: WebSocketConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8080,
            history_limit: 50,
            new_client_backlog: 5,
            web_socket_config: WebSocketConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `CHAT_PORT`, `CHAT_HISTORY_LIMIT` and
    /// `CHAT_BACKLOG`. There is no CLI surface; the environment is the only
    /// runtime knob.
    pub fn from_env() -> Self {
        let mut config = ServerConfig::default();
        if let Some(port) = env_parse("CHAT_PORT") {
            config.port = port;
        }
        if let Some(limit) = env_parse("CHAT_HISTORY_LIMIT") {
            config.history_limit = limit;
        }
        if let Some(backlog) = env_parse("CHAT_BACKLOG") {
            config.new_client_backlog = backlog;
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Upper bound for a single socket read. Only affects throughput;
    /// partial frames survive across reads regardless of its value.
    pub read_chunk_size: usize,
    pub max_frame_size: Option<usize>,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            read_chunk_size: 4096,
            max_frame_size: Some(16 << 20),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok()?.parse().ok()
}
