use thiserror::Error;

/// Errors raised while building an enforcer.
///
/// Enforcement itself never fails; every variant here describes a problem with
/// the model document or a caller-supplied name. Casbin's own error type is
/// neither `Clone` nor comparable, so it is carried as its rendered message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("model is missing section [{0}]")]
    MissingSection(&'static str),
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("unsupported policy effect: {0}")]
    UnsupportedEffect(String),
    #[error("{0}")]
    Casbin(String),
}

impl From<casbin::Error> for AuthzError {
    fn from(err: casbin::Error) -> Self {
        AuthzError::Casbin(err.to_string())
    }
}

pub type AuthzResult<T> = Result<T, AuthzError>;
