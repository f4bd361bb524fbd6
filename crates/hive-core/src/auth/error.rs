use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identity and wrong secret are deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid credential update: {0}")]
    InvalidUpdate(String),
}
