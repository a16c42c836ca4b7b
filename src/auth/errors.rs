use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("password longer than {max} bytes")]
    TooLong { max: usize },

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("stored password hash is corrupt")]
    CorruptHash,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Bad structure, bad signature, wrong key or missing claims.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Why a request could not be tied to a principal.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("malformed or invalid token")]
    MalformedToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("principal not found")]
    PrincipalNotFound,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Malformed(_) => AuthError::MalformedToken,
            TokenError::Signing(msg) => AuthError::Store(anyhow::anyhow!(msg)),
        }
    }
}

/// The acting principal does not own the resource.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("forbidden")]
pub struct Forbidden;
