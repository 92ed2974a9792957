use thiserror::Error;

/// Every failure the e-Stat client can surface. There is no partial result:
/// any of these aborts the whole query.
#[derive(Debug, Error)]
pub enum EstatError {
    #[error("no e-Stat application id configured (set ESTATJP_APPID or pass one explicitly)")]
    MissingCredential,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("transport failure for {url}: {reason}")]
    TransportFailure { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EstatError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        EstatError::MalformedPayload(msg.into())
    }

    pub(crate) fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        EstatError::TransportFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EstatError>;
