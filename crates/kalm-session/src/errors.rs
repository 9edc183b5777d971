use kalm_authz::AuthzError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Authz(#[from] AuthzError),
}

pub type SessionResult<T> = Result<T, SessionError>;
