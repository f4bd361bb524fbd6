//! Credentials and sessions, stored as cluster labels.
//!
//! Credentials live under `panel.user.<identity>` as salted hashes; sessions
//! under `session.<token>`. Removing access never deletes a key: the value is
//! set to the empty string, which every reader treats as unset.
mod error;
mod secret;

pub use error::AuthError;

use std::fmt;

use hive_model::{CredentialUpdate, SwarmLabel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::Context;

use secret::{BOOTSTRAP_SECRET_LEN, SESSION_TOKEN_LEN, Verdict};

pub const SESSION_COOKIE: &str = "hive-session";

/// Stored session value.
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    email: String,
}

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: String,
}

impl Session {
    /// `Set-Cookie` value carrying this session.
    pub fn cookie(&self, secure: bool) -> String {
        cookie_value(&self.token, secure, false)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(secure: bool) -> String {
    cookie_value("", secure, true)
}

fn cookie_value(token: &str, secure: bool, expire: bool) -> String {
    let mut c = format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/");
    if secure {
        c.push_str("; Secure");
    }
    if expire {
        c.push_str("; Max-Age=0");
    }
    c
}

/// Session token from a `Cookie` request header.
pub fn token_from_cookies(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}

/// Credential generated for the default identity on first boot.
///
/// The plaintext exists only in this value; only its hash is stored.
pub struct BootstrapCredential {
    pub identity: String,
    secret: String,
}

impl BootstrapCredential {
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for BootstrapCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapCredential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Issues and checks sessions on top of the label store.
#[derive(Clone, Debug)]
pub struct AuthGateway {
    ctx: Context,
}

impl AuthGateway {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Provision a random secret for the default identity when no credential exists.
    ///
    /// Returns the plaintext once; later calls return `None`.
    pub fn ensure_bootstrap_credential(&self) -> Option<BootstrapCredential> {
        let store = self.ctx.store();
        if !store.users().is_empty() {
            return None;
        }
        let identity = self.ctx.config().default_identity.clone();
        let secret = secret::random_base62(BOOTSTRAP_SECRET_LEN);
        store.set(&SwarmLabel::PanelUser(identity.clone()), secret::hash_secret(&secret));
        info!(identity = %identity, "bootstrap credential provisioned");
        Some(BootstrapCredential { identity, secret })
    }

    /// Check `identity`/`secret` and mint a session.
    pub fn login(&self, identity: &str, secret: &str) -> Result<Session, AuthError> {
        let store = self.ctx.store();
        let identity = identity.trim();

        let Some(stored) = store.users().remove(identity) else {
            secret::verify_nothing(secret);
            debug!("login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        match secret::verify(&stored, secret) {
            Verdict::Match => {}
            Verdict::LegacyMatch => {
                info!(identity = %identity, "legacy credential re-hashed");
                store.set(&SwarmLabel::PanelUser(identity.to_string()), secret::hash_secret(secret));
            }
            Verdict::Mismatch => {
                debug!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let session = Session {
            token: secret::random_base62(SESSION_TOKEN_LEN),
            identity: identity.to_string(),
        };
        store.set(&SwarmLabel::Session(session.token.clone()), record(identity));
        info!(identity = %identity, "session opened");
        Ok(session)
    }

    /// Resolve a session token. Missing and tombstoned sessions are rejected.
    pub fn validate(&self, token: &str) -> Result<Session, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }
        let value = self
            .ctx
            .store()
            .get(&SwarmLabel::Session(token.to_string()))
            .ok_or(AuthError::Unauthorized)?;

        // Older installations stored the bare identity.
        let identity = serde_json::from_str::<SessionRecord>(&value)
            .map(|r| r.email)
            .unwrap_or(value);
        if identity.is_empty() {
            return Err(AuthError::Unauthorized);
        }
        Ok(Session {
            token: token.to_string(),
            identity,
        })
    }

    /// Tombstone the session.
    pub fn logout(&self, session: &Session) {
        self.ctx
            .store()
            .set(&SwarmLabel::Session(session.token.clone()), "");
        info!(identity = %session.identity, "session closed");
    }

    /// Replace the caller's credential. A renamed identity leaves a tombstone behind.
    /// Renaming onto an identity that already has a credential is rejected.
    ///
    /// The current session follows the rename; other sessions of the old
    /// identity keep resolving to the old name.
    pub fn rotate(&self, session: &Session, update: &CredentialUpdate) -> Result<Session, AuthError> {
        let identity = update.identity.trim();
        if identity.is_empty() {
            return Err(AuthError::InvalidUpdate("identity is empty".into()));
        }
        if update.secret.is_empty() {
            return Err(AuthError::InvalidUpdate("secret is empty".into()));
        }
        if identity != session.identity && self.ctx.store().users().contains_key(identity) {
            return Err(AuthError::InvalidUpdate(format!("identity {identity} is taken")));
        }

        let mut entries = vec![(
            SwarmLabel::PanelUser(identity.to_string()),
            secret::hash_secret(&update.secret),
        )];
        if identity != session.identity {
            entries.push((SwarmLabel::PanelUser(session.identity.clone()), String::new()));
            entries.push((SwarmLabel::Session(session.token.clone()), record(identity)));
            warn!(from = %session.identity, to = %identity, "identity renamed");
        }
        self.ctx.store().set_all(entries);
        info!(identity = %identity, "credential rotated");

        Ok(Session {
            token: session.token.clone(),
            identity: identity.to_string(),
        })
    }
}

fn record(identity: &str) -> String {
    serde_json::to_string(&SessionRecord {
        email: identity.to_string(),
    })
    .unwrap_or_else(|_| identity.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;
    use std::sync::Arc;

    fn gateway() -> AuthGateway {
        AuthGateway::new(Context::with_engine(Arc::new(FakeEngine::new())))
    }

    #[test]
    fn first_boot_provisions_admin_once() {
        let auth = gateway();
        let cred = auth.ensure_bootstrap_credential().expect("provisioned");
        assert_eq!(cred.identity, "admin");
        assert_eq!(cred.secret().len(), 20);
        assert!(auth.ensure_bootstrap_credential().is_none());

        let stored = auth.ctx.store().users().remove("admin").unwrap();
        assert_ne!(stored, cred.secret());
        assert!(!format!("{cred:?}").contains(cred.secret()));
    }

    #[test]
    fn login_issues_a_resolvable_session() {
        let auth = gateway();
        let cred = auth.ensure_bootstrap_credential().unwrap();

        let session = auth.login("admin", cred.secret()).unwrap();
        assert_eq!(session.token.len(), 32);
        assert_eq!(auth.validate(&session.token).unwrap().identity, "admin");

        let cookie = session.cookie(true);
        assert!(cookie.starts_with(&format!("hive-session={}", session.token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn wrong_secret_and_unknown_identity_look_the_same() {
        let auth = gateway();
        auth.ensure_bootstrap_credential().unwrap();

        assert_eq!(auth.login("admin", "guess").unwrap_err(), AuthError::InvalidCredentials);
        assert_eq!(auth.login("root", "guess").unwrap_err(), AuthError::InvalidCredentials);
    }

    #[test]
    fn logout_tombstones_the_session() {
        let auth = gateway();
        let cred = auth.ensure_bootstrap_credential().unwrap();
        let session = auth.login("admin", cred.secret()).unwrap();

        auth.logout(&session);
        assert_eq!(auth.validate(&session.token).unwrap_err(), AuthError::Unauthorized);
        assert_eq!(auth.validate("").unwrap_err(), AuthError::Unauthorized);
    }

    #[test]
    fn legacy_plaintext_is_rehashed_on_login() {
        let auth = gateway();
        auth.ctx.store().set(&SwarmLabel::PanelUser("ops".into()), "plain-secret");

        auth.login("ops", "plain-secret").unwrap();
        let stored = auth.ctx.store().users().remove("ops").unwrap();
        assert!(stored.starts_with("sha256$"));
        assert!(auth.login("ops", "plain-secret").is_ok());
    }

    #[test]
    fn bare_identity_sessions_still_resolve() {
        let auth = gateway();
        auth.ctx.store().set(&SwarmLabel::Session("tok".into()), "admin");
        assert_eq!(auth.validate("tok").unwrap().identity, "admin");
    }

    #[test]
    fn rename_tombstones_the_old_identity() {
        let auth = gateway();
        let cred = auth.ensure_bootstrap_credential().unwrap();
        let session = auth.login("admin", cred.secret()).unwrap();

        let update = CredentialUpdate {
            identity: "ops@example.test".into(),
            secret: "a much better secret".into(),
        };
        let renamed = auth.rotate(&session, &update).unwrap();

        let snapshot = auth.ctx.store().snapshot();
        assert_eq!(snapshot.get("hive.panel.user.admin"), Some(""));
        assert!(auth.ctx.store().users().contains_key("ops@example.test"));
        assert_eq!(auth.validate(&renamed.token).unwrap().identity, "ops@example.test");
        assert!(auth.login("admin", cred.secret()).is_err());
        assert!(auth.login("ops@example.test", "a much better secret").is_ok());
    }

    #[test]
    fn rename_onto_another_identity_is_rejected() {
        let auth = gateway();
        let cred = auth.ensure_bootstrap_credential().unwrap();
        auth.ctx
            .store()
            .set(&SwarmLabel::PanelUser("ops".into()), secret::hash_secret("ops secret"));
        let session = auth.login("admin", cred.secret()).unwrap();

        let update = CredentialUpdate {
            identity: "ops".into(),
            secret: "hijacked".into(),
        };
        let err = auth.rotate(&session, &update).unwrap_err();

        assert!(matches!(err, AuthError::InvalidUpdate(_)));
        assert!(auth.login("ops", "ops secret").is_ok());
        assert!(auth.login("admin", cred.secret()).is_ok());
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        assert_eq!(token_from_cookies("theme=dark; hive-session=abc123; x=1"), Some("abc123"));
        assert_eq!(token_from_cookies("hive-session="), None);
        assert_eq!(token_from_cookies("theme=dark"), None);
        assert!(clear_cookie(false).contains("Max-Age=0"));
    }
}
