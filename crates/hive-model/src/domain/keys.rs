//! Typed label keys.
//!
//! The engine stores labels as an open string map. Every key the panel reads or
//! writes is produced by one of the enums below so a misspelt key cannot silently
//! point at a different slot.
use std::fmt;

use crate::LABEL_PREFIX;

const USER: &str = "hive.panel.user.";
const SESSION: &str = "hive.session.";
const LINK: &str = "hive.link.";
const KEY: &str = "hive.key.";

/// Keys stored on the cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SwarmLabel {
    /// Credential hash for an identity.
    PanelUser(String),
    /// Session token mapped to an identity.
    Session(String),
    /// Overlay network new services attach to.
    NetworkDefault,
    /// Name of the reverse-proxy service.
    ProxyService,
    /// Data volume of the reverse-proxy service.
    ProxyVolume,
    /// Name of the registry service.
    RegistryService,
    /// Data volume of the registry service.
    RegistryVolume,
    /// Link to a peer panel.
    Link(String),
    PanelTint,
    PanelHostnames,
    PanelPort,
    PanelHttps,
    PanelTag,
}

impl SwarmLabel {
    /// Prefix shared by all credential keys.
    pub const USER_PREFIX: &'static str = USER;

    /// Prefix shared by all session keys.
    pub const SESSION_PREFIX: &'static str = SESSION;

    /// Full label key as stored on the cluster object.
    pub fn key(&self) -> String {
        match self {
            SwarmLabel::PanelUser(id) => format!("{USER}{id}"),
            SwarmLabel::Session(token) => format!("{SESSION}{token}"),
            SwarmLabel::Link(id) => format!("{LINK}{id}"),
            other => format!("{LABEL_PREFIX}{}", other.fixed_suffix()),
        }
    }

    /// Parse a stored key back into its typed form.
    ///
    /// Returns `None` for keys the panel does not own.
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(id) = key.strip_prefix(USER) {
            return Some(SwarmLabel::PanelUser(id.to_string()));
        }
        if let Some(token) = key.strip_prefix(SESSION) {
            return Some(SwarmLabel::Session(token.to_string()));
        }
        if let Some(id) = key.strip_prefix(LINK) {
            return Some(SwarmLabel::Link(id.to_string()));
        }
        let suffix = key.strip_prefix(LABEL_PREFIX)?;
        Self::FIXED
            .iter()
            .find(|l| l.fixed_suffix() == suffix)
            .cloned()
    }

    /// Returns `true` for keys that hold secrets and must never leave the process.
    pub fn is_secret(&self) -> bool {
        matches!(self, SwarmLabel::PanelUser(_) | SwarmLabel::Session(_))
    }

    const FIXED: [SwarmLabel; 10] = [
        SwarmLabel::NetworkDefault,
        SwarmLabel::ProxyService,
        SwarmLabel::ProxyVolume,
        SwarmLabel::RegistryService,
        SwarmLabel::RegistryVolume,
        SwarmLabel::PanelTint,
        SwarmLabel::PanelHostnames,
        SwarmLabel::PanelPort,
        SwarmLabel::PanelHttps,
        SwarmLabel::PanelTag,
    ];

    fn fixed_suffix(&self) -> &'static str {
        match self {
            SwarmLabel::NetworkDefault => "network.default",
            SwarmLabel::ProxyService => "caddy.service",
            SwarmLabel::ProxyVolume => "caddy.volume",
            SwarmLabel::RegistryService => "registry.service",
            SwarmLabel::RegistryVolume => "registry.volume",
            SwarmLabel::PanelTint => "panel.tint",
            SwarmLabel::PanelHostnames => "panel.hostnames",
            SwarmLabel::PanelPort => "panel.port",
            SwarmLabel::PanelHttps => "panel.https",
            SwarmLabel::PanelTag => "panel.tag",
            SwarmLabel::PanelUser(_) | SwarmLabel::Session(_) | SwarmLabel::Link(_) => "",
        }
    }
}

impl fmt::Display for SwarmLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Keys read from (and occasionally written to) a service spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceLabel {
    /// Image override applied to the container spec.
    DeployImage,
    /// Inline Dockerfile built into an image before submission.
    DeployDockerfile,
    /// Comma, semicolon or newline separated public hostnames.
    Hostnames,
    /// Upstream port the reverse proxy forwards to.
    Port,
    /// Declarative rolling-update order.
    Update,
    /// Deploy-hook key.
    Key(String),
    /// Set to `custom` to keep the reverse proxy away from this service.
    ProxyOverride,
}

impl ServiceLabel {
    /// Prefix shared by all deploy-hook keys.
    pub const KEY_PREFIX: &'static str = KEY;

    /// Full label key as stored on the service.
    pub fn key(&self) -> String {
        match self {
            ServiceLabel::DeployImage => "hive.deploy.image".to_string(),
            ServiceLabel::DeployDockerfile => "hive.deploy.Dockerfile".to_string(),
            ServiceLabel::Hostnames => "hive.hostnames".to_string(),
            ServiceLabel::Port => "hive.port".to_string(),
            ServiceLabel::Update => "hive.update".to_string(),
            ServiceLabel::Key(token) => format!("{KEY}{token}"),
            ServiceLabel::ProxyOverride => "hive.caddy".to_string(),
        }
    }
}

impl fmt::Display for ServiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
