//! Simulation configuration.
//!
//! Everything here deserializes from TOML with sensible defaults, so an
//! empty document is a valid configuration:
//!
//! ```toml
//! [system]
//! name = "meadow"
//! seed = 42
//!
//! [sampling]
//! output_dir = "out"
//!
//! [[sampling.rules]]
//! stem = "agents_{}"
//! sampler = "agent"
//! stride = 10
//! serializer = "to_csv"
//! kwargs = { sep = ";" }
//! ```

use crate::error::PersistError;
use animus_core::types::{Kwargs, Value};
use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Top-level configuration: the system plus its sampling rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// Parameters consumed by `ManagementSystem::from_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Seed for ids, agent generators and shuffles. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Propagate engine failures instead of capturing them.
    #[serde(default)]
    pub strict_engine: bool,
    /// Treat empty scaffold maps as identity.
    #[serde(default = "default_empty_to_identity")]
    pub empty_to_identity: bool,
}

/// Where and how often samples are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One write rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub stem: String,
    pub sampler: SamplerKind,
    #[serde(default = "default_stride")]
    pub stride: u64,
    pub serializer: String,
    /// Unset (`Null`) entries are dropped on serialization.
    #[serde(default, serialize_with = "serialize_kwargs")]
    pub kwargs: Kwargs,
}

/// Which built-in sampler a rule uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    Agent,
    Environment,
    Graph,
}

fn default_name() -> String { "system".to_string() }
fn default_empty_to_identity() -> bool { true }
fn default_output_dir() -> PathBuf { PathBuf::from("samples") }
fn default_stride() -> u64 { 1 }

// TOML has no null
fn serialize_kwargs<S: Serializer>(kwargs: &Kwargs, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(kwargs.iter().filter(|(_, value)| !value.is_null()))
}

fn nests_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::List(items) => items.iter().any(nests_null),
        _ => false,
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: None,
            strict_engine: false,
            empty_to_identity: default_empty_to_identity(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            rules: Vec::new(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, PersistError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML. Top-level `Null` kwargs are skipped; a `Null` inside a
    /// list kwarg cannot be written and is reported by rule and key.
    pub fn to_toml_string(&self) -> Result<String, PersistError> {
        for rule in &self.sampling.rules {
            let nested = rule
                .kwargs
                .iter()
                .find(|(_, value)| matches!(value, Value::List(items) if items.iter().any(nests_null)));
            if let Some((key, _)) = nested {
                return Err(PersistError::Toml(format!(
                    "rule '{}': kwarg '{}' holds a null inside a list",
                    rule.stem, key
                )));
            }
        }
        toml::to_string_pretty(self).map_err(|e| PersistError::Toml(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert!(config.system.empty_to_identity);
        assert_eq!(config.sampling.output_dir, PathBuf::from("samples"));
    }

    #[test]
    fn rules_parse_with_kwargs() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [system]
            name = "meadow"
            seed = 42
            strict_engine = true

            [[sampling.rules]]
            stem = "agents_{}"
            sampler = "agent"
            stride = 10
            serializer = "to_csv"
            kwargs = { sep = ";" }

            [[sampling.rules]]
            stem = "topology"
            sampler = "graph"
            serializer = "write_dot"
            "#,
        )
        .unwrap();
        assert_eq!(config.system.seed, Some(42));
        assert!(config.system.strict_engine);
        assert_eq!(config.sampling.rules.len(), 2);
        assert_eq!(config.sampling.rules[0].kwargs.get("sep"), Some(&Value::from(";")));
        assert_eq!(config.sampling.rules[1].sampler, SamplerKind::Graph);
        assert_eq!(config.sampling.rules[1].stride, 1);
    }

    fn rule_with(kwargs: Kwargs) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.sampling.rules.push(RuleConfig {
            stem: "agents_{}".to_string(),
            sampler: SamplerKind::Agent,
            stride: 1,
            serializer: "to_csv".to_string(),
            kwargs,
        });
        config
    }

    #[test]
    fn null_kwargs_are_dropped_when_written() {
        let kwargs: Kwargs = [("sep".to_string(), Value::from(";")), ("header".to_string(), Value::Null)]
            .into_iter()
            .collect();
        let written = rule_with(kwargs).to_toml_string().unwrap();
        assert!(!written.contains("header"));

        let reread = SimulationConfig::from_toml_str(&written).unwrap();
        let kwargs = &reread.sampling.rules[0].kwargs;
        assert_eq!(kwargs.get("sep"), Some(&Value::from(";")));
        assert_eq!(kwargs.get("header"), None);
    }

    #[test]
    fn null_inside_a_list_kwarg_is_reported() {
        let kwargs: Kwargs = [("columns".to_string(), Value::List(vec![Value::from("id"), Value::Null]))]
            .into_iter()
            .collect();
        let err = rule_with(kwargs).to_toml_string().unwrap_err();
        assert!(matches!(
            err,
            PersistError::Toml(ref msg) if msg == "rule 'agents_{}': kwarg 'columns' holds a null inside a list"
        ));
    }

    #[test]
    fn unknown_sampler_is_rejected() {
        let err = SimulationConfig::from_toml_str(
            r#"
            [[sampling.rules]]
            stem = "x"
            sampler = "weather"
            serializer = "to_csv"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PersistError::Toml(_)));
    }
}
