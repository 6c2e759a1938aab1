use thiserror::Error;

/// Failure reported by a cache server while executing a ban.
#[derive(Debug, Error)]
pub enum BanError {
    #[error("cache server `{server}` could not be reached: {message}")]
    Transport { server: String, message: String },
    #[error("cache server `{server}` rejected ban of `{url}` with status {status}")]
    Rejected {
        server: String,
        url: String,
        status: u16,
    },
    #[error("invalid ban request for `{url}`: {message}")]
    InvalidRequest { url: String, message: String },
}

impl BanError {
    pub fn transport(server: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            server: server.into(),
            message: err.to_string(),
        }
    }

    pub fn rejected(server: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self::Rejected {
            server: server.into(),
            url: url.into(),
            status,
        }
    }

    pub fn invalid_request(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            url: url.into(),
            message: message.into(),
        }
    }
}
