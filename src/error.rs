#[derive(Debug)]
pub enum BotError {
    /// Invalid or unreadable configuration. Fatal at startup.
    Config(String),
    /// HTTP or AMQP transport failure; retried or logged, never user-visible.
    Transport(String),
    /// The chat API answered with ok=false.
    Api(String),
    /// The participant is already registered in this game.
    AlreadyRegistered,
    /// The questions table is empty.
    QuestionNotFound,
    Database(sqlx::Error),
    Internal(String),
}

impl std::fmt::Display for BotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotError::Config(msg) => write!(f, "config error: {msg}"),
            BotError::Transport(msg) => write!(f, "transport error: {msg}"),
            BotError::Api(msg) => write!(f, "chat api error: {msg}"),
            BotError::AlreadyRegistered => write!(f, "participant already registered"),
            BotError::QuestionNotFound => write!(f, "no questions in the database"),
            BotError::Database(e) => write!(f, "database error: {e}"),
            BotError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for BotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BotError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for BotError {
    fn from(e: sqlx::Error) -> Self {
        BotError::Database(e)
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        BotError::Transport(e.to_string())
    }
}

impl From<lapin::Error> for BotError {
    fn from(e: lapin::Error) -> Self {
        BotError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        BotError::Internal(format!("json: {e}"))
    }
}

impl From<prometheus::Error> for BotError {
    fn from(e: prometheus::Error) -> Self {
        BotError::Internal(format!("metrics: {e}"))
    }
}

impl From<std::io::Error> for BotError {
    fn from(e: std::io::Error) -> Self {
        BotError::Internal(format!("io: {e}"))
    }
}
