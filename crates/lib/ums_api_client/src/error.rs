//! Client error types.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Turn an error response into [`ClientError::Api`], keeping the server's
    /// `message` when the body carries one.
    pub async fn from_response(response: reqwest::Response) -> Self {
        #[derive(Deserialize)]
        struct Body {
            message: Option<String>,
        }

        let status = response.status();
        let message = match response.text().await {
            Ok(text) => serde_json::from_str::<Body>(&text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(text),
            Err(e) => e.to_string(),
        };
        ClientError::Api { status, message }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}
