use serde::Deserialize;
use thiserror::Error;

/// RFC 7807 problem document returned by the CA.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerProblem {
    #[serde(rename = "type")]
    pub r#type: String,
    pub detail: Option<String>,
    pub status: Option<u16>,
}

impl ServerProblem {
    pub fn is_bad_nonce(&self) -> bool {
        self.r#type == "urn:ietf:params:acme:error:badNonce"
    }
}

impl std::fmt::Display for ServerProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.r#type, detail),
            None => write!(f, "{}", self.r#type),
        }
    }
}

#[derive(Debug, Error)]
pub enum AcmeError {
    #[error("IO Error - {0:?}")]
    IoError(#[from] std::io::Error),
    #[error("Hyper Error - {0:?}")]
    HyperError(#[from] hyper::Error),
    #[error("HTTP Error - {0:?}")]
    HttpError(#[from] hyper::http::Error),
    #[error("Deserialization Error - {0:?}")]
    SerdeError(#[from] serde_json::Error),
    #[error("OpenSSL Error - {0:?}")]
    OpenSSLError(#[from] openssl::error::ErrorStack),
    #[error("Http Header Conversion Error")]
    HeaderConversionError(#[from] hyper::header::ToStrError),
    #[error("Request to server failed with status: {0:?}")]
    FailedRequest(hyper::StatusCode),
    #[error("CA rejected the request: {0}")]
    Server(ServerProblem),
    #[error("No Nonce Found")]
    NoNonce,
    #[error("Missing Location header in response")]
    MissingLocationHeader,
    #[error("Field not found - {0}")]
    FieldNotFound(String),
    #[error("No challenge provider configured")]
    NoChallengeProvider,
    #[error("Input closed before the DNS record for {0} was confirmed")]
    ConfirmationAborted(String),
    #[error("{0} validation failed for {1}")]
    ValidationFailed(String, String),
    #[error("Max attempts reached while polling {0}")]
    PollTimeout(String),
    #[error("ACME Error {0:?}")]
    General(String),
}
