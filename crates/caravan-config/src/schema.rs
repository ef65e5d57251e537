//! Static option tables for every configuration section.
//!
//! The registry is fixed at compile time; there is no dynamic schema
//! mutation. Lookups are deterministic and side-effect free. Value
//! constraints are structural only; business-rule validation is the
//! agent's job at load time.

use serde_json::Value;

use crate::section::Section;

/// Structural constraint on an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// JSON boolean.
    Bool,
    /// JSON number without a fractional part.
    Integer,
    /// JSON string.
    String,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl OptionKind {
    /// Whether `value` satisfies this constraint.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Human-readable constraint description used in error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Bool => "must be a boolean",
            Self::Integer => "must be an integer",
            Self::String => "must be a string",
            Self::Array => "must be an array",
            Self::Object => "must be an object",
        }
    }
}

/// Immutable option table for one section: name to constraint, names unique.
#[derive(Debug)]
pub struct OptionSchema {
    section: &'static str,
    options: &'static [(&'static str, OptionKind)],
}

impl OptionSchema {
    /// Section this schema belongs to.
    #[must_use]
    pub const fn section(&self) -> &'static str {
        self.section
    }

    /// Constraint for `name`, if the schema recognises it.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<OptionKind> {
        self.options
            .iter()
            .find(|(option, _)| *option == name)
            .map(|(_, kind)| *kind)
    }

    /// Whether the schema recognises `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    /// Iterate over the recognised option names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.options.iter().map(|(name, _)| *name)
    }
}

const AGENT_OPTIONS: &[(&str, OptionKind)] = &[
    ("addresses", OptionKind::Object),
    ("advertise", OptionKind::Object),
    ("bind_addr", OptionKind::String),
    ("data_dir", OptionKind::String),
    ("datacenter", OptionKind::String),
    ("disable_anonymous_signature", OptionKind::Bool),
    ("disable_update_check", OptionKind::Bool),
    ("enable_debug", OptionKind::Bool),
    ("enable_syslog", OptionKind::Bool),
    ("http_api_response_headers", OptionKind::Object),
    ("leave_on_interrupt", OptionKind::Bool),
    ("leave_on_terminate", OptionKind::Bool),
    ("log_level", OptionKind::String),
    ("ports", OptionKind::Object),
    ("region", OptionKind::String),
    ("syslog_facility", OptionKind::String),
    ("telemetry", OptionKind::Object),
];

const SERVER_OPTIONS: &[(&str, OptionKind)] = &[
    ("bootstrap_expect", OptionKind::Integer),
    ("data_dir", OptionKind::String),
    ("enabled", OptionKind::Bool),
    ("enabled_schedulers", OptionKind::Array),
    ("heartbeat_grace", OptionKind::String),
    ("node_gc_threshold", OptionKind::String),
    ("num_schedulers", OptionKind::Integer),
    ("protocol_version", OptionKind::Integer),
    ("rejoin_after_leave", OptionKind::Bool),
    ("retry_interval", OptionKind::String),
    ("retry_join", OptionKind::Array),
    ("retry_max", OptionKind::Integer),
    ("start_join", OptionKind::Array),
];

const CLIENT_OPTIONS: &[(&str, OptionKind)] = &[
    ("alloc_dir", OptionKind::String),
    ("chroot_env", OptionKind::Object),
    ("client_max_port", OptionKind::Integer),
    ("client_min_port", OptionKind::Integer),
    ("enabled", OptionKind::Bool),
    ("max_kill_timeout", OptionKind::String),
    ("meta", OptionKind::Object),
    ("network_interface", OptionKind::String),
    ("network_speed", OptionKind::Integer),
    ("node_class", OptionKind::String),
    ("options", OptionKind::Object),
    ("reserved", OptionKind::Object),
    ("servers", OptionKind::Array),
    ("state_dir", OptionKind::String),
];

const ATLAS_OPTIONS: &[(&str, OptionKind)] = &[
    ("endpoint", OptionKind::String),
    ("infrastructure", OptionKind::String),
    ("join", OptionKind::Bool),
    ("token", OptionKind::String),
];

const CONSUL_OPTIONS: &[(&str, OptionKind)] = &[
    ("address", OptionKind::String),
    ("auth", OptionKind::String),
    ("auto_advertise", OptionKind::Bool),
    ("ca_file", OptionKind::String),
    ("cert_file", OptionKind::String),
    ("client_auto_join", OptionKind::Bool),
    ("client_service_name", OptionKind::String),
    ("key_file", OptionKind::String),
    ("server_auto_join", OptionKind::Bool),
    ("server_service_name", OptionKind::String),
    ("ssl", OptionKind::Bool),
    ("token", OptionKind::String),
    ("verify_ssl", OptionKind::Bool),
];

const VAULT_OPTIONS: &[(&str, OptionKind)] = &[
    ("address", OptionKind::String),
    ("allow_unauthenticated", OptionKind::Bool),
    ("enabled", OptionKind::Bool),
    ("task_token_ttl", OptionKind::String),
    ("tls_ca_file", OptionKind::String),
    ("tls_ca_path", OptionKind::String),
    ("tls_cert_file", OptionKind::String),
    ("tls_key_file", OptionKind::String),
    ("tls_server_name", OptionKind::String),
    ("tls_skip_verify", OptionKind::Bool),
    ("token", OptionKind::String),
];

static AGENT_SCHEMA: OptionSchema = OptionSchema {
    section: "agent",
    options: AGENT_OPTIONS,
};
static SERVER_SCHEMA: OptionSchema = OptionSchema {
    section: "server",
    options: SERVER_OPTIONS,
};
static CLIENT_SCHEMA: OptionSchema = OptionSchema {
    section: "client",
    options: CLIENT_OPTIONS,
};
static ATLAS_SCHEMA: OptionSchema = OptionSchema {
    section: "atlas",
    options: ATLAS_OPTIONS,
};
static CONSUL_SCHEMA: OptionSchema = OptionSchema {
    section: "consul",
    options: CONSUL_OPTIONS,
};
static VAULT_SCHEMA: OptionSchema = OptionSchema {
    section: "vault",
    options: VAULT_OPTIONS,
};

/// Option schema for `section`. The base section shares the agent table.
#[must_use]
pub const fn schema_for(section: Section) -> &'static OptionSchema {
    match section {
        Section::Base | Section::Agent => &AGENT_SCHEMA,
        Section::Server => &SERVER_SCHEMA,
        Section::Client => &CLIENT_SCHEMA,
        Section::Atlas => &ATLAS_SCHEMA,
        Section::Consul => &CONSUL_SCHEMA,
        Section::Vault => &VAULT_SCHEMA,
    }
}
