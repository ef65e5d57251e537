//! Validated option sets and deterministic JSON rendering.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::schema::schema_for;
use crate::section::Section;

/// A collection of option values destined for one section.
///
/// Values for recognised options are type-checked on insert; unrecognised
/// names are accepted here and silently filtered by [`render`], matching
/// the permissive behaviour callers of the original resources relied on.
#[derive(Debug, Default, Clone)]
pub struct OptionSet {
    values: BTreeMap<String, Value>,
}

impl OptionSet {
    /// Empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single option value, checking it against the section schema.
    ///
    /// `Null` values count as unset and are dropped. Unknown names are kept
    /// without a constraint check.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidOption`] when a recognised option is
    /// given a value of the wrong shape.
    pub fn insert(
        &mut self,
        section: Section,
        name: impl Into<String>,
        value: Value,
    ) -> SchemaResult<()> {
        let name = name.into();
        if value.is_null() {
            self.values.remove(&name);
            return Ok(());
        }
        let schema = schema_for(section);
        if let Some(kind) = schema.kind_of(&name)
            && !kind.matches(&value)
        {
            return Err(SchemaError::InvalidOption {
                section: schema.section(),
                option: name,
                reason: kind.describe(),
            });
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Build an option set from an iterator of name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError::InvalidOption`] encountered.
    pub fn from_values<I, K>(section: Section, values: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut set = Self::new();
        for (name, value) in values {
            set.insert(section, name, value)?;
        }
        Ok(set)
    }

    /// Whether no values are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn filtered(&self, section: Section) -> Map<String, Value> {
        let schema = schema_for(section);
        self.values
            .iter()
            .filter(|(name, _)| schema.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Render an option set into the section's serialized document.
///
/// Options outside the section schema are dropped. Sections with a wrap key
/// nest the filtered map one level under it, emitting the wrapper even when
/// empty. For the agent section an optional node name is emitted under the
/// top-level `"name"` key. Key order is stable.
#[must_use]
pub fn render(section: Section, values: &OptionSet, agent_name: Option<&str>) -> Vec<u8> {
    let mut filtered = values.filtered(section);

    let document = match section.wrap_key() {
        Some(key) => {
            let mut wrapper = Map::new();
            wrapper.insert(key.to_string(), Value::Object(filtered));
            Value::Object(wrapper)
        }
        None => {
            if section == Section::Agent
                && let Some(name) = agent_name
            {
                filtered.insert("name".to_string(), Value::String(name.to_string()));
            }
            Value::Object(filtered)
        }
    };

    document.to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rendered(section: Section, set: &OptionSet, agent_name: Option<&str>) -> String {
        String::from_utf8(render(section, set, agent_name)).expect("utf8 output")
    }

    #[test]
    fn unknown_options_are_filtered_out() -> anyhow::Result<()> {
        let set = OptionSet::from_values(
            Section::Server,
            [
                ("bootstrap_expect".to_string(), json!(3)),
                ("made_up_option".to_string(), json!("x")),
            ],
        )?;
        let output = rendered(Section::Server, &set, None);
        assert_eq!(output, r#"{"server":{"bootstrap_expect":3}}"#);
        Ok(())
    }

    #[test]
    fn empty_wrapped_section_still_emits_wrapper() {
        for section in [
            Section::Server,
            Section::Client,
            Section::Atlas,
            Section::Consul,
            Section::Vault,
        ] {
            let output = rendered(section, &OptionSet::new(), None);
            assert_eq!(output, format!(r#"{{"{}":{{}}}}"#, section.as_str()));
        }
    }

    #[test]
    fn agent_name_is_emitted_only_when_present() -> anyhow::Result<()> {
        let set = OptionSet::from_values(
            Section::Agent,
            [("datacenter".to_string(), json!("dc1"))],
        )?;
        assert_eq!(
            rendered(Section::Agent, &set, Some("foo")),
            r#"{"datacenter":"dc1","name":"foo"}"#
        );
        assert_eq!(
            rendered(Section::Agent, &set, None),
            r#"{"datacenter":"dc1"}"#
        );
        Ok(())
    }

    #[test]
    fn type_mismatch_is_rejected_on_insert() {
        let mut set = OptionSet::new();
        let err = set
            .insert(Section::Server, "bootstrap_expect", json!("three"))
            .expect_err("string for integer option should fail");
        assert!(matches!(
            err,
            SchemaError::InvalidOption { section: "server", ref option, .. } if option == "bootstrap_expect"
        ));
    }

    #[test]
    fn null_values_are_treated_as_unset() -> anyhow::Result<()> {
        let mut set = OptionSet::new();
        set.insert(Section::Vault, "token", json!("s.abc123"))?;
        set.insert(Section::Vault, "token", Value::Null)?;
        assert_eq!(rendered(Section::Vault, &set, None), r#"{"vault":{}}"#);
        Ok(())
    }

    #[test]
    fn key_order_is_stable() -> anyhow::Result<()> {
        let set = OptionSet::from_values(
            Section::Server,
            [
                ("data_dir".to_string(), json!("/var/nomad")),
                ("bootstrap_expect".to_string(), json!(3)),
            ],
        )?;
        assert_eq!(
            rendered(Section::Server, &set, None),
            r#"{"server":{"bootstrap_expect":3,"data_dir":"/var/nomad"}}"#
        );
        Ok(())
    }
}
