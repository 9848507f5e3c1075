//! Arrays — fixed-schema key→value records.
//!
//! An array declares an ordered, immutable tuple of semantic keys at
//! construction. Its behaviour on read depends on its persistence:
//!
//! - **Imprint** arrays (essence, resource, belief) keep their values between
//!   operations; reads never change them.
//! - **Flash** arrays (buzz, direction, feature, map arguments) are transient:
//!   reading every value clears the array, reading one key clears that slot,
//!   and reading an entirely empty flash fails with `EmptyFlashAccess`.

use crate::error::ArrayError;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Whether reads leave the values in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persistence {
    Imprint,
    Flash,
}

/// The role an array plays on an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArrayKind {
    /// Disposition beyond intentional change.
    Essence,
    /// Intentionally controllable holdings.
    Resource,
    /// Derived cognitive state.
    Belief,
    /// Sensor output.
    Buzz,
    /// Actuator input.
    Direction,
    /// Cortex output.
    Feature,
    /// Arguments of a scaffold map, filled by an engine and consumed on application.
    MapArguments,
}

impl ArrayKind {
    pub fn persistence(&self) -> Persistence {
        match self {
            ArrayKind::Essence | ArrayKind::Resource | ArrayKind::Belief => Persistence::Imprint,
            ArrayKind::Buzz
            | ArrayKind::Direction
            | ArrayKind::Feature
            | ArrayKind::MapArguments => Persistence::Flash,
        }
    }

    pub fn is_flash(&self) -> bool {
        self.persistence() == Persistence::Flash
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArrayKind::Essence => "essence",
            ArrayKind::Resource => "resource",
            ArrayKind::Belief => "belief",
            ArrayKind::Buzz => "buzz",
            ArrayKind::Direction => "direction",
            ArrayKind::Feature => "feature",
            ArrayKind::MapArguments => "map arguments",
        }
    }
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered mapping from a fixed tuple of keys to values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArrayRepr")]
pub struct Array {
    name: String,
    kind: ArrayKind,
    keys: Vec<String>,
    slots: Vec<Value>,
}

/// Serialized form of an [`Array`]; decoding goes back through [`Array::new`].
#[derive(Deserialize)]
struct ArrayRepr {
    name: String,
    kind: ArrayKind,
    keys: Vec<String>,
    #[serde(default)]
    slots: Vec<Value>,
}

impl TryFrom<ArrayRepr> for Array {
    type Error = ArrayError;

    fn try_from(repr: ArrayRepr) -> Result<Self, Self::Error> {
        let array = Array::new(repr.name, repr.kind, repr.keys)?;
        if repr.slots.is_empty() {
            Ok(array)
        } else {
            array.with_values(repr.slots)
        }
    }
}

impl Array {
    /// Create an array with every slot unset.
    ///
    /// Keys must be distinct and there must be at least one.
    pub fn new<K, S>(name: impl Into<String>, kind: ArrayKind, keys: K) -> Result<Self, ArrayError>
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(ArrayError::NoKeys { array: name });
        }
        let mut seen = HashSet::new();
        for key in &keys {
            if !seen.insert(key.as_str()) {
                return Err(ArrayError::DuplicateKey {
                    array: name,
                    key: key.clone(),
                });
            }
        }
        let slots = vec![Value::Null; keys.len()];
        Ok(Self {
            name,
            kind,
            keys,
            slots,
        })
    }

    pub fn essence<K: IntoIterator<Item = S>, S: Into<String>>(name: impl Into<String>, keys: K) -> Result<Self, ArrayError> {
        Self::new(name, ArrayKind::Essence, keys)
    }

    pub fn resource<K: IntoIterator<Item = S>, S: Into<String>>(name: impl Into<String>, keys: K) -> Result<Self, ArrayError> {
        Self::new(name, ArrayKind::Resource, keys)
    }

    pub fn belief<K: IntoIterator<Item = S>, S: Into<String>>(name: impl Into<String>, keys: K) -> Result<Self, ArrayError> {
        Self::new(name, ArrayKind::Belief, keys)
    }

    pub fn buzz<K: IntoIterator<Item = S>, S: Into<String>>(name: impl Into<String>, keys: K) -> Result<Self, ArrayError> {
        Self::new(name, ArrayKind::Buzz, keys)
    }

    pub fn direction<K: IntoIterator<Item = S>, S: Into<String>>(name: impl Into<String>, keys: K) -> Result<Self, ArrayError> {
        Self::new(name, ArrayKind::Direction, keys)
    }

    pub fn feature<K: IntoIterator<Item = S>, S: Into<String>>(name: impl Into<String>, keys: K) -> Result<Self, ArrayError> {
        Self::new(name, ArrayKind::Feature, keys)
    }

    /// A one-key array. A single key can never collide, so this cannot fail.
    pub fn single(name: impl Into<String>, kind: ArrayKind, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            keys: vec![key.into()],
            slots: vec![Value::Null],
        }
    }

    /// Builder-style `set_values`, handy when declaring initial imprints.
    pub fn with_values<I, V>(mut self, values: I) -> Result<Self, ArrayError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.set_values(values)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_flash(&self) -> bool {
        self.kind.is_flash()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    fn index_of(&self, key: &str) -> Result<usize, ArrayError> {
        self.position(key).ok_or_else(|| ArrayError::UnknownKey {
            array: self.name.clone(),
            key: key.to_string(),
        })
    }

    /// Whether the other array declares exactly the same keys in the same order.
    pub fn same_shape(&self, other: &Array) -> bool {
        self.keys == other.keys
    }

    /// True iff every slot is unset. Never consumes.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Value::is_null)
    }

    /// True iff some, but not all, slots are unset.
    pub fn is_partially_empty(&self) -> bool {
        let unset = self.slots.iter().filter(|v| v.is_null()).count();
        unset > 0 && unset < self.slots.len()
    }

    /// Set every slot, in key order.
    pub fn set_values<I, V>(&mut self, values: I) -> Result<(), ArrayError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.len() != self.keys.len() {
            return Err(ArrayError::LengthMismatch {
                array: self.name.clone(),
                expected: self.keys.len(),
                found: values.len(),
            });
        }
        self.slots = values;
        Ok(())
    }

    /// Set the only slot of a single-key array.
    pub fn set_scalar(&mut self, value: impl Into<Value>) -> Result<(), ArrayError> {
        self.set_values([value.into()])
    }

    /// Read every value. Flash arrays are cleared by the read and fail when
    /// entirely empty.
    pub fn values(&mut self) -> Result<Vec<Value>, ArrayError> {
        if !self.is_flash() {
            return Ok(self.slots.clone());
        }
        if self.is_empty() {
            return Err(ArrayError::EmptyFlashAccess {
                array: self.name.clone(),
            });
        }
        let out = std::mem::replace(&mut self.slots, vec![Value::Null; self.keys.len()]);
        Ok(out)
    }

    /// Non-consuming copy of the current values, whatever the persistence.
    pub fn snapshot(&self) -> Vec<Value> {
        self.slots.clone()
    }

    /// Key/value pairs in construction order. On a flash each yielded slot is consumed.
    pub fn items(&mut self) -> Vec<(String, Value)> {
        let flash = self.is_flash();
        self.keys
            .iter()
            .zip(self.slots.iter_mut())
            .map(|(k, slot)| {
                let value = if flash {
                    std::mem::take(slot)
                } else {
                    slot.clone()
                };
                (k.clone(), value)
            })
            .collect()
    }

    /// Read one value; on a flash the slot is cleared afterwards.
    pub fn get(&mut self, key: &str) -> Result<Value, ArrayError> {
        let idx = self.index_of(key)?;
        if self.is_flash() {
            Ok(std::mem::take(&mut self.slots[idx]))
        } else {
            Ok(self.slots[idx].clone())
        }
    }

    /// Read one value without consuming it.
    pub fn peek(&self, key: &str) -> Result<&Value, ArrayError> {
        let idx = self.index_of(key)?;
        Ok(&self.slots[idx])
    }

    /// Write one value. Keys not declared at construction are rejected.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ArrayError> {
        let idx = self.index_of(key)?;
        self.slots[idx] = value.into();
        Ok(())
    }

    /// Reset every slot to unset.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Value::Null;
        }
    }
}

/// An ordered concatenation of arrays sharing one persistence.
///
/// Keys need not be unique across constituents, so there is no keyed access.
#[derive(Debug, Clone, PartialEq)]
pub struct SupraArray {
    arrays: Vec<Array>,
    persistence: Persistence,
}

impl SupraArray {
    pub fn new(arrays: Vec<Array>) -> Result<Self, ArrayError> {
        let first = arrays.first().ok_or(ArrayError::NoSources)?;
        let persistence = first.kind().persistence();
        if arrays.iter().any(|a| a.kind().persistence() != persistence) {
            return Err(ArrayError::MixedVariants);
        }
        Ok(Self {
            arrays,
            persistence,
        })
    }

    pub fn persistence(&self) -> Persistence {
        self.persistence
    }

    /// Total number of slots across constituents.
    pub fn len(&self) -> usize {
        self.arrays.iter().map(Array::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.iter().all(Array::is_empty)
    }

    /// Distribute values over the constituents in order.
    pub fn set_values<I, V>(&mut self, values: I) -> Result<(), ArrayError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let total = self.len();
        if values.len() != total {
            return Err(ArrayError::LengthMismatch {
                array: self.names().join("+"),
                expected: total,
                found: values.len(),
            });
        }
        let mut rest = values.into_iter();
        for array in &mut self.arrays {
            let chunk: Vec<Value> = rest.by_ref().take(array.len()).collect();
            array.set_values(chunk)?;
        }
        Ok(())
    }

    /// Concatenated values; a flash supra-array is cleared by the read.
    pub fn values(&mut self) -> Result<Vec<Value>, ArrayError> {
        if self.persistence == Persistence::Flash && self.is_empty() {
            return Err(ArrayError::EmptyFlashAccess {
                array: self.names().join("+"),
            });
        }
        let mut out = Vec::with_capacity(self.len());
        for array in &mut self.arrays {
            if array.is_flash() && array.is_empty() {
                out.extend(std::iter::repeat(Value::Null).take(array.len()));
            } else {
                out.extend(array.values()?);
            }
        }
        Ok(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Array> {
        self.arrays.iter()
    }

    pub fn into_arrays(self) -> Vec<Array> {
        self.arrays
    }

    fn names(&self) -> Vec<&str> {
        self.arrays.iter().map(Array::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dice() -> Array {
        Array::buzz("dice", ["d1", "d2", "d3"]).unwrap()
    }

    #[test]
    fn set_values_lands_on_key_positions() {
        let mut a = Array::resource("stock", ["energy", "coins"]).unwrap();
        a.set_values([Value::from(3.0), Value::from(7)]).unwrap();
        assert_eq!(a.peek("energy").unwrap(), &Value::Float(3.0));
        assert_eq!(a.peek("coins").unwrap(), &Value::Int(7));
    }

    #[test]
    fn duplicate_and_empty_keys_are_rejected() {
        assert!(matches!(
            Array::belief("b", ["x", "x"]),
            Err(ArrayError::DuplicateKey { .. })
        ));
        assert!(matches!(
            Array::belief("b", Vec::<String>::new()),
            Err(ArrayError::NoKeys { .. })
        ));
    }

    #[test]
    fn length_mismatch_fails() {
        let mut a = dice();
        assert!(matches!(
            a.set_values([1, 2]),
            Err(ArrayError::LengthMismatch { expected: 3, found: 2, .. })
        ));
        assert!(a.set_scalar(1).is_err());
    }

    #[test]
    fn flash_values_clear_the_array() {
        let mut a = dice();
        a.set_values([1, 2, 3]).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a.values().unwrap(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(a.is_empty());
        assert!(matches!(a.values(), Err(ArrayError::EmptyFlashAccess { .. })));
    }

    #[test]
    fn flash_single_key_read_clears_one_slot() {
        let mut a = dice();
        a.set_values([1, 2, 3]).unwrap();
        assert_eq!(a.get("d2").unwrap(), Value::Int(2));
        assert!(a.peek("d2").unwrap().is_null());
        assert_eq!(a.peek("d1").unwrap(), &Value::Int(1));
        assert!(a.is_partially_empty());
    }

    #[test]
    fn imprint_reads_do_not_consume() {
        let mut a = Array::belief("joy", ["joy_index"]).unwrap();
        a.set_scalar(0).unwrap();
        let before = a.is_empty();
        a.values().unwrap();
        a.get("joy_index").unwrap();
        a.items();
        assert_eq!(a.is_empty(), before);
        assert_eq!(a.peek("joy_index").unwrap(), &Value::Int(0));
    }

    #[test]
    fn flash_items_consume_every_slot() {
        let mut a = dice();
        a.set_values([4, 5, 6]).unwrap();
        let items = a.items();
        assert_eq!(items[0], ("d1".to_string(), Value::Int(4)));
        assert!(a.is_empty());
    }

    #[test]
    fn unknown_key_write_fails() {
        let mut a = dice();
        assert!(matches!(a.set("d9", 1), Err(ArrayError::UnknownKey { .. })));
    }

    #[test]
    fn supra_array_distributes_and_concatenates() {
        let a = Array::buzz("a", ["x", "y"]).unwrap();
        let b = Array::buzz("b", ["x"]).unwrap();
        let mut supra = SupraArray::new(vec![a, b]).unwrap();
        assert_eq!(supra.len(), 3);
        supra.set_values([1, 2, 3]).unwrap();
        let names: Vec<&str> = supra.iter().map(Array::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(supra.values().unwrap().len(), 3);
        assert!(supra.is_empty());
    }

    #[test]
    fn supra_array_fills_gaps_of_a_partially_read_flash() {
        let a = Array::buzz("a", ["x", "y"]).unwrap();
        let b = Array::buzz("b", ["z"]).unwrap();
        let mut supra = SupraArray::new(vec![a, b]).unwrap();
        supra.set_values([1, 2, 3]).unwrap();
        let mut arrays = supra.into_arrays();
        assert_eq!(arrays[0].get("x").unwrap(), Value::Int(1));
        assert_eq!(arrays[1].values().unwrap(), vec![Value::Int(3)]);
        let mut supra = SupraArray::new(arrays).unwrap();
        assert!(!supra.is_empty());
        assert_eq!(supra.values().unwrap(), vec![Value::Null, Value::Int(2), Value::Null]);
        assert!(supra.is_empty());
        assert!(matches!(supra.values(), Err(ArrayError::EmptyFlashAccess { .. })));
    }

    #[test]
    fn deserialize_reruns_construction_checks() {
        let ok: Array =
            serde_json::from_str(r#"{"name":"b","kind":"Belief","keys":["x","y"],"slots":[1,null]}"#).unwrap();
        assert_eq!(ok.peek("x").unwrap(), &Value::Int(1));
        assert!(ok.peek("y").unwrap().is_null());

        let short = serde_json::from_str::<Array>(r#"{"name":"b","kind":"Belief","keys":["x","y"],"slots":[null]}"#);
        assert!(short.is_err());
        let dup = serde_json::from_str::<Array>(r#"{"name":"b","kind":"Belief","keys":["x","x"]}"#);
        assert!(dup.is_err());
        let none = serde_json::from_str::<Array>(r#"{"name":"b","kind":"Belief","keys":[]}"#);
        assert!(none.is_err());

        let round: Array = serde_json::from_str(&serde_json::to_string(&ok).unwrap()).unwrap();
        assert_eq!(round, ok);
    }

    #[test]
    fn supra_array_rejects_mixed_variants() {
        let a = Array::buzz("a", ["x"]).unwrap();
        let b = Array::belief("b", ["x"]).unwrap();
        assert_eq!(SupraArray::new(vec![a, b]), Err(ArrayError::MixedVariants));
    }
}
