use thiserror::Error;

/// Exit status for a graceful stop
pub const EXIT_OK: i32 = 0;
/// Exit status when configuration is missing or malformed
pub const EXIT_CONFIG: i32 = 1;
/// Exit status when collector setup fails
pub const EXIT_INIT: i32 = 2;
/// Exit status for unhandled runtime faults
pub const EXIT_FAULT: i32 = 3;

#[derive(Error, Debug)]
pub enum ZfsbeatError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Initialization error in {component}: {message}")]
    Initialization { component: String, message: String },

    #[error("Shutdown error: {message}")]
    Shutdown { message: String },

    #[error("Publish error: {message}")]
    Publish { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("System error: {message}")]
    System { message: String },
}

impl ZfsbeatError {
    pub fn initialization<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Initialization {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn shutdown<S: Into<String>>(message: S) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }

    pub fn publish<S: Into<String>>(message: S) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    /// Process exit status this error maps to
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            Self::Initialization { .. } => EXIT_INIT,
            // Release failures never turn a graceful stop into a failure
            Self::Shutdown { .. } => EXIT_OK,
            Self::Publish { .. } | Self::Io(_) | Self::Serialization(_) | Self::System { .. } => {
                EXIT_FAULT
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ZfsbeatError>;
