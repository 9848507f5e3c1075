//! Auto-conditions: pure predicates over imprint slices.

use crate::bank::ArrayBank;
use crate::error::{ArrayError, PolicyError, Result};
use crate::operator::{ArrayRef, ArraySource};
use crate::types::Value;
use std::fmt;
use std::sync::Arc;

/// Which imprint a condition reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionSource {
    Belief(String),
    Resource,
    Essence,
}

impl ConditionSource {
    pub fn array_ref(&self) -> ArrayRef {
        match self {
            ConditionSource::Belief(name) => ArrayRef::Belief(name.clone()),
            ConditionSource::Resource => ArrayRef::Resource,
            ConditionSource::Essence => ArrayRef::Essence,
        }
    }
}

/// The keys a condition hands to its predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection {
    /// Every value of the array, in key order.
    All,
    Keys(Vec<String>),
}

impl From<&str> for KeySelection {
    fn from(key: &str) -> Self {
        KeySelection::Keys(vec![key.to_string()])
    }
}

impl From<Vec<&str>> for KeySelection {
    fn from(keys: Vec<&str>) -> Self {
        KeySelection::Keys(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for KeySelection {
    fn from(keys: Vec<String>) -> Self {
        KeySelection::Keys(keys)
    }
}

impl<const N: usize> From<[&str; N]> for KeySelection {
    fn from(keys: [&str; N]) -> Self {
        KeySelection::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

pub type Predicate = dyn Fn(&[Value]) -> bool + Send + Sync;

/// A predicate bound to a slice of a belief, the resource or the essence.
#[derive(Clone)]
pub struct AutoCondition {
    source: ConditionSource,
    keys: KeySelection,
    predicate: Arc<Predicate>,
}

impl AutoCondition {
    pub fn new<F>(source: ConditionSource, keys: impl Into<KeySelection>, predicate: F) -> Result<Self>
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        let keys = keys.into();
        if keys == KeySelection::Keys(Vec::new()) {
            return Err(PolicyError::EmptySelection(source.array_ref().to_string()).into());
        }
        Ok(Self {
            source,
            keys,
            predicate: Arc::new(predicate),
        })
    }

    pub fn belief<F>(name: impl Into<String>, keys: impl Into<KeySelection>, predicate: F) -> Result<Self>
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        Self::new(ConditionSource::Belief(name.into()), keys, predicate)
    }

    pub fn resource<F>(keys: impl Into<KeySelection>, predicate: F) -> Result<Self>
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        Self::new(ConditionSource::Resource, keys, predicate)
    }

    pub fn essence<F>(keys: impl Into<KeySelection>, predicate: F) -> Result<Self>
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        Self::new(ConditionSource::Essence, keys, predicate)
    }

    pub fn source(&self) -> &ConditionSource {
        &self.source
    }

    /// Evaluate against the current arrays. Never consumes anything.
    pub fn evaluate(&self, arrays: &ArrayBank) -> Result<bool> {
        let r = self.source.array_ref();
        let array = arrays.array(&r).ok_or_else(|| ArrayError::Missing(r.to_string()))?;
        let values = match &self.keys {
            KeySelection::All => array.snapshot(),
            KeySelection::Keys(keys) => keys
                .iter()
                .map(|k| array.peek(k).cloned())
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok((self.predicate)(&values))
    }
}

impl fmt::Debug for AutoCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoCondition")
            .field("source", &self.source)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::error::AnimusError;

    fn bank() -> ArrayBank {
        let mut bank = ArrayBank::new();
        bank.insert(
            Array::resource("stock", ["energy", "water"])
                .unwrap()
                .with_values([4.0, 9.0])
                .unwrap(),
        )
        .unwrap();
        bank
    }

    #[test]
    fn selected_keys_reach_the_predicate_in_order() {
        let cond = AutoCondition::resource(["water", "energy"], |v| {
            v[0].as_f64() == Some(9.0) && v[1].as_f64() == Some(4.0)
        })
        .unwrap();
        assert!(cond.evaluate(&bank()).unwrap());
    }

    #[test]
    fn all_keys_by_default() {
        let cond = AutoCondition::resource(KeySelection::All, |v| v.len() == 2).unwrap();
        assert!(cond.evaluate(&bank()).unwrap());
    }

    #[test]
    fn missing_belief_is_an_error() {
        let cond = AutoCondition::belief("joy", "joy_index", |_| true).unwrap();
        let err = cond.evaluate(&bank()).unwrap_err();
        assert_eq!(err, AnimusError::Array(ArrayError::Missing("belief:joy".into())));
    }

    #[test]
    fn empty_key_list_is_rejected() {
        let err = AutoCondition::resource(Vec::<String>::new(), |_| true).unwrap_err();
        assert!(matches!(err, AnimusError::Policy(PolicyError::EmptySelection(_))));
    }
}
