//! Error types for the client.

use crate::api_client::ApiClientError;
use crate::config::ConfigError;
use crate::persistence::PersistenceError;
use crate::telemetry::TelemetryError;
use rutastic_core::{BackendError, IdentityError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("This operation requires a signed-in user")]
    NotSignedIn,
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_convert_directly() {
        let backend = ClientError::from(BackendError::transport("reset"));
        assert!(matches!(backend, ClientError::Backend(BackendError::Transport { .. })));

        let validation = ClientError::from(ValidationError::InvalidVoteDirection { value: 0 });
        assert!(matches!(
            validation,
            ClientError::Validation(ValidationError::InvalidVoteDirection { value: 0 })
        ));

        let identity = ClientError::from(IdentityError::ReentrantUpdate);
        assert!(matches!(identity, ClientError::Identity(IdentityError::ReentrantUpdate)));
    }
}
