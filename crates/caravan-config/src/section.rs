//! Section descriptors and on-disk naming conventions.
//!
//! Each section owns a filename prefix and an optional wrap key: the JSON
//! object key its options are nested under in rendered output. The agent
//! and base sections render flat.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Default directory the agent loads configuration fragments from.
pub const DEFAULT_CONFIG_ROOT: &str = "/etc/nomad.d";

/// Default directory rendered job definitions are written to.
pub const DEFAULT_JOB_ROOT: &str = "/var/nomad/jobs";

/// Mode applied to rendered configuration files. Option values may carry
/// tokens, so world access is denied.
pub const CONFIG_FILE_MODE: u32 = 0o640;

/// A named configuration domain with its own option schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Catch-all fragment with no filename prefix; shares the agent schema.
    Base,
    /// Top-level agent settings, rendered flat with an optional node name.
    Agent,
    /// Server (scheduling) subsystem settings.
    Server,
    /// Client (execution) subsystem settings.
    Client,
    /// Atlas integration settings.
    Atlas,
    /// Consul integration settings.
    Consul,
    /// Vault integration settings.
    Vault,
}

impl Section {
    /// Render the section as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Agent => "agent",
            Self::Server => "server",
            Self::Client => "client",
            Self::Atlas => "atlas",
            Self::Consul => "consul",
            Self::Vault => "vault",
        }
    }

    /// Filename prefix for this section. The base section has none.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Base => "",
            Self::Agent => "agent",
            Self::Server => "server",
            Self::Client => "client",
            Self::Atlas => "atlas",
            Self::Consul => "consul",
            Self::Vault => "vault",
        }
    }

    /// JSON key the section's options are nested under, when any.
    #[must_use]
    pub const fn wrap_key(self) -> Option<&'static str> {
        match self {
            Self::Base | Self::Agent => None,
            Self::Server => Some("server"),
            Self::Client => Some("client"),
            Self::Atlas => Some("atlas"),
            Self::Consul => Some("consul"),
            Self::Vault => Some("vault"),
        }
    }
}

impl FromStr for Section {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Base),
            "agent" => Ok(Self::Agent),
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            "atlas" => Ok(Self::Atlas),
            "consul" => Ok(Self::Consul),
            "vault" => Ok(Self::Vault),
            other => Err(SchemaError::UnknownSection {
                name: other.to_string(),
            }),
        }
    }
}

/// Filename for a rendered section instance: `<prefix>_<instance>.hcl`.
#[must_use]
pub fn config_file_name(section: Section, instance: &str) -> String {
    format!("{}_{instance}.hcl", section.prefix())
}

/// Full path of a rendered section instance under `root`.
#[must_use]
pub fn config_file_path(root: &Path, section: Section, instance: &str) -> std::path::PathBuf {
    root.join(config_file_name(section, instance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keys_follow_section_names() {
        assert_eq!(Section::Server.wrap_key(), Some("server"));
        assert_eq!(Section::Vault.wrap_key(), Some("vault"));
        assert_eq!(Section::Agent.wrap_key(), None);
        assert_eq!(Section::Base.wrap_key(), None);
    }

    #[test]
    fn base_section_has_empty_prefix() {
        assert_eq!(config_file_name(Section::Base, "default"), "_default.hcl");
        assert_eq!(config_file_name(Section::Server, "main"), "server_main.hcl");
    }

    #[test]
    fn section_round_trips_through_from_str() {
        for section in [
            Section::Base,
            Section::Agent,
            Section::Server,
            Section::Client,
            Section::Atlas,
            Section::Consul,
            Section::Vault,
        ] {
            assert_eq!(section.as_str().parse::<Section>().ok(), Some(section));
        }
        assert!(matches!(
            "raft".parse::<Section>(),
            Err(SchemaError::UnknownSection { name }) if name == "raft"
        ));
    }
}
