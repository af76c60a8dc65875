//! Runtime configuration loaded from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Timing and limits for game sessions
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// How long players have to answer before filler answers are inserted
    pub answer_timeout: Duration,
    /// How long a player who dropped mid-game is kept before removal
    pub disconnect_grace: Duration,
    pub max_answer_chars: usize,
    pub max_nickname_chars: usize,
    pub max_message_chars: usize,
    /// Chat messages kept per room for reconnection snapshots
    pub chat_history: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            answer_timeout: Duration::from_secs(60),
            disconnect_grace: Duration::from_secs(120),
            max_answer_chars: 280,
            max_nickname_chars: 20,
            max_message_chars: 500,
            chat_history: 50,
        }
    }
}

impl GameConfig {
    /// Load game config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            answer_timeout: Duration::from_secs(env_or(
                "ANSWER_TIMEOUT_SECS",
                defaults.answer_timeout.as_secs(),
            )),
            disconnect_grace: Duration::from_secs(env_or(
                "DISCONNECT_GRACE_SECS",
                defaults.disconnect_grace.as_secs(),
            )),
            max_answer_chars: env_or("MAX_ANSWER_CHARS", defaults.max_answer_chars),
            max_nickname_chars: env_or("MAX_NICKNAME_CHARS", defaults.max_nickname_chars),
            max_message_chars: env_or("MAX_MESSAGE_CHARS", defaults.max_message_chars),
            chat_history: env_or("CHAT_HISTORY", defaults.chat_history),
        };

        tracing::info!(
            answer_timeout_secs = config.answer_timeout.as_secs(),
            disconnect_grace_secs = config.disconnect_grace.as_secs(),
            "Game config loaded"
        );

        config
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory with the built frontend, served as fallback when set
    pub static_dir: Option<PathBuf>,
    /// JSON file with the prompt list (built-in prompts when unset)
    pub prompts_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000))),
            static_dir: env_path("STATIC_DIR"),
            prompts_file: env_path("PROMPTS_FILE"),
        }
    }
}

/// Parse an environment variable, warning and falling back when it is malformed
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value {:?} for {}, using {:?}", raw, key, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}
