//! Error taxonomy for a single chat turn.
//!
//! Every variant is caught at the session loop boundary and turned into
//! diagnostic text; none of them ends the session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The conversation database could not be read or written.
    #[error("conversation store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    /// The inference server could not be reached, or the connection dropped mid-request.
    #[error("request to inference server at {endpoint} failed: {source}")]
    InferenceTransport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body was JSON but had no `choices[0].message.content`.
    #[error("invalid response format from inference server")]
    MalformedResponse { body: String },

    /// The body was not JSON at all.
    #[error("inference server returned invalid JSON: {source}")]
    Parse {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ChatError {
    /// True when the endpoint refused (or never accepted) the TCP connection.
    pub fn is_connection_refused(&self) -> bool {
        match self {
            Self::InferenceTransport { source, .. } => source.is_connect(),
            _ => false,
        }
    }

    /// Raw response body kept for diagnosis, if the failure carries one.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::MalformedResponse { body } | Self::Parse { body, .. } => Some(body),
            _ => None,
        }
    }
}
