use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Text the server sent back with the failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Transport(_) => None,
            ApiError::Status { body, .. } => Some(body.trim()).filter(|b| !b.is_empty()),
            ApiError::Rejected(message) => Some(message.trim()).filter(|m| !m.is_empty()),
        }
    }

    /// Server text when present, otherwise the given fallback.
    pub fn message_or(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session file is not valid TOML: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("could not encode session: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file is not valid TOML: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
