use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control plane unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP {status} from control plane: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode control-plane response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("operation '{operation}' failed: {description}")]
    Failed {
        operation: String,
        description: String,
    },

    #[error("malformed result for '{operation}': {detail}")]
    Malformed { operation: String, detail: String },
}

impl ControlError {
    /// True when the endpoint could not be reached at all, which during
    /// shutdown means the server process is gone.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ControlError::Unreachable { .. })
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
