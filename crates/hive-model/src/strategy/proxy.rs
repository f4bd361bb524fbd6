use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Label convention used to route public hostnames to services.
///
/// - `Caddy`: labels read by caddy-docker-proxy. The panel provisions the proxy itself.
/// - `Traefik`: `traefik.*` router labels. The proxy is expected to be operated separately.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyConvention {
    #[default]
    Caddy,
    Traefik,
}

impl FromStr for ProxyConvention {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "caddy" | "default" => Ok(ProxyConvention::Caddy),
            "traefik" => Ok(ProxyConvention::Traefik),
            other => Err(ModelError::UnknownProxy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_values() {
        assert_eq!("".parse::<ProxyConvention>().unwrap(), ProxyConvention::Caddy);
        assert_eq!("TRAEFIK".parse::<ProxyConvention>().unwrap(), ProxyConvention::Traefik);
        assert!("nginx".parse::<ProxyConvention>().is_err());
    }
}
