use std::fmt;

use serde::{Deserialize, Serialize};

/// Body of the login call.
///
/// `email`/`password` are accepted as aliases for older clients.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub identity: String,
    #[serde(alias = "password")]
    pub secret: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Body of the credential rotation call.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialUpdate {
    #[serde(alias = "email")]
    pub identity: String,
    #[serde(alias = "password")]
    pub secret: String,
}

impl fmt::Debug for CredentialUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialUpdate")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}
