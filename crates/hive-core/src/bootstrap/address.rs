use std::{net::Ipv4Addr, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

static IPV4_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("ipv4 regex is valid")
});

/// Which init field the engine could not fill in on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressVariant {
    Listen,
    Advertise,
}

impl AddressVariant {
    pub fn from_message(message: &str) -> Self {
        if message.to_ascii_lowercase().contains("advertise") {
            AddressVariant::Advertise
        } else {
            AddressVariant::Listen
        }
    }
}

/// Returns `true` for the engine's "pick an interface for me" init errors.
pub fn is_ambiguity(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("could not choose an ip address") || m.contains("multiple addresses")
}

/// IPv4 literals in `text`, deduplicated and ranked.
///
/// Private addresses come first, loopback, link-local and unspecified last.
/// Order of appearance is kept within a rank.
pub fn ranked_candidates(text: &str) -> Vec<Ipv4Addr> {
    let mut found: Vec<Ipv4Addr> = Vec::new();
    for m in IPV4_REGEX.find_iter(text) {
        if let Ok(ip) = m.as_str().parse::<Ipv4Addr>() {
            if !found.contains(&ip) {
                found.push(ip);
            }
        }
    }
    found.sort_by_key(rank);
    found
}

fn rank(ip: &Ipv4Addr) -> u8 {
    if ip.is_private() {
        0
    } else if ip.is_loopback() || ip.is_link_local() || ip.is_unspecified() {
        2
    } else {
        1
    }
}
