//! The array store an agent carries.

use crate::array::{Array, ArrayKind};
use crate::error::{AgentError, ArrayError, Result};
use crate::operator::{ArrayRef, ArraySource};
use std::collections::BTreeMap;

/// Every array an agent owns, keyed the way operators reference them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayBank {
    essence: Option<Array>,
    resource: Option<Array>,
    beliefs: BTreeMap<String, Array>,
    buzzes: BTreeMap<String, Array>,
    directions: BTreeMap<String, Array>,
    features: BTreeMap<String, Array>,
}

impl ArrayBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn essence(&self) -> Option<&Array> {
        self.essence.as_ref()
    }

    pub fn resource(&self) -> Option<&Array> {
        self.resource.as_ref()
    }

    pub fn belief(&self, name: &str) -> Option<&Array> {
        self.beliefs.get(name)
    }

    pub fn buzz(&self, name: &str) -> Option<&Array> {
        self.buzzes.get(name)
    }

    pub fn direction(&self, name: &str) -> Option<&Array> {
        self.directions.get(name)
    }

    pub fn feature(&self, name: &str) -> Option<&Array> {
        self.features.get(name)
    }

    pub fn beliefs(&self) -> impl Iterator<Item = &Array> {
        self.beliefs.values()
    }

    /// Insert an array, replacing whatever was held under the same reference.
    pub fn insert(&mut self, array: Array) -> Result<()> {
        let name = array.name().to_string();
        match array.kind() {
            ArrayKind::Essence => self.essence = Some(array),
            ArrayKind::Resource => self.resource = Some(array),
            ArrayKind::Belief => {
                self.beliefs.insert(name, array);
            }
            ArrayKind::Buzz => {
                self.buzzes.insert(name, array);
            }
            ArrayKind::Direction => {
                self.directions.insert(name, array);
            }
            ArrayKind::Feature => {
                self.features.insert(name, array);
            }
            ArrayKind::MapArguments => {
                return Err(ArrayError::WrongKind {
                    array: name,
                    expected: "an agent-held array".into(),
                    found: ArrayKind::MapArguments,
                }
                .into())
            }
        }
        Ok(())
    }

    pub(crate) fn insert_feature(&mut self, feature: Array) {
        self.features.insert(feature.name().to_string(), feature);
    }

    /// Register an organ's output message.
    ///
    /// An existing array of the same shape is kept with its values; a
    /// different shape under the same name is a conflict.
    pub fn register(&mut self, template: &Array) -> Result<()> {
        let r = ArrayRef::of(template).ok_or_else(|| ArrayError::WrongKind {
            array: template.name().to_string(),
            expected: "an agent-held array".into(),
            found: template.kind(),
        })?;
        match self.array(&r) {
            Some(existing) if existing.same_shape(template) => Ok(()),
            Some(_) => Err(AgentError::MessageConflict {
                name: template.name().to_string(),
            }
            .into()),
            None => self.insert(template.clone()),
        }
    }

    /// The persistent arrays, in sampling order: resource, essence, beliefs.
    pub fn imprints(&self) -> Vec<(ArrayRef, &Array)> {
        let mut out = Vec::new();
        if let Some(resource) = &self.resource {
            out.push((ArrayRef::Resource, resource));
        }
        if let Some(essence) = &self.essence {
            out.push((ArrayRef::Essence, essence));
        }
        for (name, belief) in &self.beliefs {
            out.push((ArrayRef::Belief(name.clone()), belief));
        }
        out
    }
}

impl ArraySource for ArrayBank {
    fn array(&self, r: &ArrayRef) -> Option<&Array> {
        match r {
            ArrayRef::Essence => self.essence.as_ref(),
            ArrayRef::Resource => self.resource.as_ref(),
            ArrayRef::Belief(n) => self.beliefs.get(n),
            ArrayRef::Buzz(n) => self.buzzes.get(n),
            ArrayRef::Direction(n) => self.directions.get(n),
            ArrayRef::Feature(n) => self.features.get(n),
        }
    }

    fn array_mut(&mut self, r: &ArrayRef) -> Option<&mut Array> {
        match r {
            ArrayRef::Essence => self.essence.as_mut(),
            ArrayRef::Resource => self.resource.as_mut(),
            ArrayRef::Belief(n) => self.beliefs.get_mut(n),
            ArrayRef::Buzz(n) => self.buzzes.get_mut(n),
            ArrayRef::Direction(n) => self.directions.get_mut(n),
            ArrayRef::Feature(n) => self.features.get_mut(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnimusError;
    use crate::types::Value;

    #[test]
    fn register_keeps_existing_values() {
        let mut bank = ArrayBank::new();
        let joy = Array::belief("joy", ["joy_index"]).unwrap().with_values([3]).unwrap();
        bank.insert(joy).unwrap();

        let template = Array::belief("joy", ["joy_index"]).unwrap();
        bank.register(&template).unwrap();
        assert_eq!(bank.belief("joy").unwrap().snapshot(), vec![Value::Int(3)]);
    }

    #[test]
    fn register_rejects_a_reshaped_message() {
        let mut bank = ArrayBank::new();
        bank.register(&Array::buzz("dice", ["d1", "d2"]).unwrap()).unwrap();
        let err = bank.register(&Array::buzz("dice", ["d1"]).unwrap()).unwrap_err();
        assert!(matches!(err, AnimusError::Agent(AgentError::MessageConflict { .. })));
    }

    #[test]
    fn imprints_skip_flash_messages() {
        let mut bank = ArrayBank::new();
        bank.insert(Array::resource("stock", ["energy"]).unwrap()).unwrap();
        bank.insert(Array::belief("mood", ["level"]).unwrap()).unwrap();
        bank.insert(Array::buzz("noise", ["db"]).unwrap()).unwrap();
        let refs: Vec<String> = bank.imprints().iter().map(|(r, _)| r.to_string()).collect();
        assert_eq!(refs, vec!["resource", "belief:mood"]);
    }
}
