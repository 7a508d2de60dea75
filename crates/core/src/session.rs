// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session names, launch configuration and config fingerprints.
//!
//! A session is the running process behind an agent. Its name is a pure
//! function of the city name, the agent's qualified name and the naming
//! template, so the reconciler can re-derive the whole desired set every
//! tick without remembering anything between ticks.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Prefix shared by every session this controller owns.
pub const SESSION_PREFIX: &str = "gc-";

/// Naming template used when an agent does not declare one.
pub const DEFAULT_SESSION_TEMPLATE: &str = "${agent}";

/// Name of a running session (e.g. a tmux session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionName(pub String);

impl SessionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for SessionName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for SessionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Prefix of every session in `city`: `gc-{city}-`.
///
/// The orphan sweep only ever touches sessions carrying this prefix.
pub fn session_prefix(city: &str) -> String {
    format!("{}{}-", SESSION_PREFIX, sanitize(city))
}

/// Derive the session name for a qualified agent name.
///
/// `rig/name` becomes `rig--name` (names are validated to never contain
/// `--` themselves, so the mapping is injective). A template that does not
/// reference `${agent}` would map every agent to the same name and is
/// replaced by the default.
pub fn session_name(city: &str, qualified: &str, template: Option<&str>) -> SessionName {
    let agent = qualified.replace('/', "--");
    let template = template.filter(|t| t.contains("${agent}")).unwrap_or(DEFAULT_SESSION_TEMPLATE);
    let expanded = template.replace("${agent}", &agent).replace("${city}", city);
    SessionName(format!("{}{}", session_prefix(city), sanitize(&expanded)))
}

/// tmux treats `.` and `:` as target separators.
fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c == '.' || c == ':' || c.is_whitespace() { '_' } else { c }).collect()
}

/// Opaque fingerprint of a [`SessionConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Effective launch configuration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub command: String,
    pub work_dir: PathBuf,
    /// Ordered so the fingerprint does not depend on insertion order
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl SessionConfig {
    pub fn new(command: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self { command: command.into(), work_dir: work_dir.into(), env: BTreeMap::new() }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// SHA-256 over the command, working directory and environment.
    ///
    /// Every field is length-prefixed so no two distinct configs share a
    /// canonical byte stream.
    pub fn fingerprint(&self) -> ConfigHash {
        let mut hasher = Sha256::new();
        let mut field = |bytes: &[u8]| {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };
        field(self.command.as_bytes());
        field(self.work_dir.to_string_lossy().as_bytes());
        for (key, value) in &self.env {
            field(key.as_bytes());
            field(value.as_bytes());
        }
        ConfigHash(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
