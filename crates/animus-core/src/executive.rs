//! Verbs, their outcomes, and the seam that executes them.
//!
//! Clauses and plans never call an agent directly; they go through an
//! [`Executive`], so the same policy can run against a bare agent or against
//! an agent routed through its management system.

use crate::bank::ArrayBank;
use crate::error::{EngineError, PolicyError, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The executive verbs an agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Sense,
    Interpret,
    Mould,
    Act,
    Tickle,
    Pronounce,
    Enact,
    Pump,
    Compel,
    Mutate,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Sense => "sense",
            Verb::Interpret => "interpret",
            Verb::Mould => "mould",
            Verb::Act => "act",
            Verb::Tickle => "tickle",
            Verb::Pronounce => "pronounce",
            Verb::Enact => "enact",
            Verb::Pump => "pump",
            Verb::Compel => "compel",
            Verb::Mutate => "mutate",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = PolicyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sense" => Ok(Verb::Sense),
            "interpret" => Ok(Verb::Interpret),
            "mould" => Ok(Verb::Mould),
            "act" => Ok(Verb::Act),
            "tickle" => Ok(Verb::Tickle),
            "pronounce" => Ok(Verb::Pronounce),
            "enact" => Ok(Verb::Enact),
            "pump" => Ok(Verb::Pump),
            "compel" => Ok(Verb::Compel),
            "mutate" => Ok(Verb::Mutate),
            other => Err(PolicyError::UnknownVerb(other.to_string())),
        }
    }
}

/// What a verb produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// An organ ran and its outputs were written.
    Completed,
    /// A policy verb evaluated to a truth value.
    Verdict(bool),
    /// A tickled cortex revealed these feature values.
    Feature(Vec<Value>),
    /// The engine failed and the organ is not strict.
    Captured(EngineError),
}

impl Outcome {
    /// Truth value used by clause conjunctions and plan edges.
    ///
    /// A captured engine failure counts as false.
    pub fn is_true(&self) -> bool {
        match self {
            Outcome::Completed => true,
            Outcome::Verdict(b) => *b,
            Outcome::Feature(values) => !values.is_empty(),
            Outcome::Captured(_) => false,
        }
    }

    pub fn captured(&self) -> Option<&EngineError> {
        match self {
            Outcome::Captured(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_feature(self) -> Option<Vec<Value>> {
        match self {
            Outcome::Feature(values) => Some(values),
            _ => None,
        }
    }
}

/// Something that can perform verbs on behalf of one agent.
pub trait Executive {
    fn perform(&mut self, verb: Verb, phrase: &str) -> Result<Outcome>;

    /// The arrays auto-conditions are evaluated against.
    fn arrays(&self) -> Result<&ArrayBank>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_from_their_names() {
        for verb in [Verb::Sense, Verb::Mould, Verb::Pump, Verb::Mutate, Verb::Enact] {
            assert_eq!(verb.as_str().parse::<Verb>().unwrap(), verb);
        }
        assert_eq!("dance".parse::<Verb>(), Err(PolicyError::UnknownVerb("dance".into())));
    }

    #[test]
    fn captured_failures_are_falsy() {
        assert!(Outcome::Completed.is_true());
        assert!(!Outcome::Captured(EngineError::new("boom")).is_true());
        assert!(!Outcome::Feature(vec![]).is_true());
        assert!(Outcome::Verdict(true).is_true());
    }
}
