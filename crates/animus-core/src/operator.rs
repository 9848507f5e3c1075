//! Array operators — read-only views over an agent's arrays.
//!
//! An operator is a recipe resolved against an [`ArraySource`] at call time.
//! It never builds new persistent state: resolving returns the values the
//! recipe selects, consuming flash slots exactly as a direct read would.

use crate::array::{Array, ArrayKind, Persistence};
use crate::error::ArrayError;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Names one array held by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArrayRef {
    Essence,
    Resource,
    Belief(String),
    Buzz(String),
    Direction(String),
    Feature(String),
}

impl ArrayRef {
    pub fn belief(name: impl Into<String>) -> Self {
        ArrayRef::Belief(name.into())
    }

    pub fn buzz(name: impl Into<String>) -> Self {
        ArrayRef::Buzz(name.into())
    }

    pub fn direction(name: impl Into<String>) -> Self {
        ArrayRef::Direction(name.into())
    }

    pub fn feature(name: impl Into<String>) -> Self {
        ArrayRef::Feature(name.into())
    }

    /// The reference under which an array is registered on an agent.
    ///
    /// Map argument arrays are owned by their map and have no reference.
    pub fn of(array: &Array) -> Option<Self> {
        let name = array.name().to_string();
        match array.kind() {
            ArrayKind::Essence => Some(ArrayRef::Essence),
            ArrayKind::Resource => Some(ArrayRef::Resource),
            ArrayKind::Belief => Some(ArrayRef::Belief(name)),
            ArrayKind::Buzz => Some(ArrayRef::Buzz(name)),
            ArrayKind::Direction => Some(ArrayRef::Direction(name)),
            ArrayKind::Feature => Some(ArrayRef::Feature(name)),
            ArrayKind::MapArguments => None,
        }
    }

    pub fn kind(&self) -> ArrayKind {
        match self {
            ArrayRef::Essence => ArrayKind::Essence,
            ArrayRef::Resource => ArrayKind::Resource,
            ArrayRef::Belief(_) => ArrayKind::Belief,
            ArrayRef::Buzz(_) => ArrayKind::Buzz,
            ArrayRef::Direction(_) => ArrayKind::Direction,
            ArrayRef::Feature(_) => ArrayKind::Feature,
        }
    }

    pub fn persistence(&self) -> Persistence {
        self.kind().persistence()
    }
}

impl fmt::Display for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayRef::Essence => write!(f, "essence"),
            ArrayRef::Resource => write!(f, "resource"),
            ArrayRef::Belief(n) => write!(f, "belief:{}", n),
            ArrayRef::Buzz(n) => write!(f, "buzz:{}", n),
            ArrayRef::Direction(n) => write!(f, "direction:{}", n),
            ArrayRef::Feature(n) => write!(f, "feature:{}", n),
        }
    }
}

/// Anything that can hand out arrays by reference.
pub trait ArraySource {
    fn array(&self, r: &ArrayRef) -> Option<&Array>;
    fn array_mut(&mut self, r: &ArrayRef) -> Option<&mut Array>;
}

fn lookup<'a, S: ArraySource + ?Sized>(src: &'a S, r: &ArrayRef) -> Result<&'a Array, ArrayError> {
    src.array(r).ok_or_else(|| ArrayError::Missing(r.to_string()))
}

fn lookup_mut<'a, S: ArraySource + ?Sized>(
    src: &'a mut S,
    r: &ArrayRef,
) -> Result<&'a mut Array, ArrayError> {
    src.array_mut(r).ok_or_else(|| ArrayError::Missing(r.to_string()))
}

/// A derivational view over one or more arrays.
///
/// Built only through its constructors, which validate the recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayOperator {
    recipe: Recipe,
}

#[derive(Debug, Clone, PartialEq)]
enum Recipe {
    /// The single underlying array, unchanged.
    Identity(ArrayRef),
    /// A named subset of one array's keys.
    Slice { source: ArrayRef, keys: Vec<String> },
    /// Several arrays concatenated in order.
    Extend(Vec<ArrayRef>),
    /// A per-key pick from several same-shape arrays: `picks[i]` names the
    /// source supplying the i-th key.
    Mix { sources: Vec<ArrayRef>, picks: Vec<usize> },
}

impl ArrayOperator {
    fn from_recipe(recipe: Recipe) -> Self {
        Self { recipe }
    }

    pub fn identity(source: ArrayRef) -> Self {
        Self::from_recipe(Recipe::Identity(source))
    }

    pub fn slice<K, S>(source: ArrayRef, keys: K) -> Result<Self, ArrayError>
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(ArrayError::EmptySelection);
        }
        let mut seen = HashSet::new();
        if let Some(key) = keys.iter().find(|k| !seen.insert(k.as_str())) {
            return Err(ArrayError::DuplicateKey {
                array: source.to_string(),
                key: key.clone(),
            });
        }
        Ok(Self::from_recipe(Recipe::Slice { source, keys }))
    }

    pub fn extend(sources: Vec<ArrayRef>) -> Result<Self, ArrayError> {
        check_sources(&sources)?;
        Ok(Self::from_recipe(Recipe::Extend(sources)))
    }

    pub fn mix(sources: Vec<ArrayRef>, picks: Vec<usize>) -> Result<Self, ArrayError> {
        check_sources(&sources)?;
        if picks.is_empty() {
            return Err(ArrayError::EmptySelection);
        }
        if let Some(&pick) = picks.iter().find(|&&p| p >= sources.len()) {
            return Err(ArrayError::PickOutOfRange {
                pick,
                sources: sources.len(),
            });
        }
        Ok(Self::from_recipe(Recipe::Mix { sources, picks }))
    }

    /// Every array the recipe reads from.
    pub fn sources(&self) -> Vec<&ArrayRef> {
        match &self.recipe {
            Recipe::Identity(r) => vec![r],
            Recipe::Slice { source, .. } => vec![source],
            Recipe::Extend(rs) | Recipe::Mix { sources: rs, .. } => rs.iter().collect(),
        }
    }

    fn first_source(&self) -> &ArrayRef {
        match &self.recipe {
            Recipe::Identity(r) | Recipe::Slice { source: r, .. } => r,
            Recipe::Extend(rs) | Recipe::Mix { sources: rs, .. } => &rs[0],
        }
    }

    pub fn persistence(&self) -> Persistence {
        self.first_source().persistence()
    }

    /// Whether every source has one of the given kinds.
    pub fn reads_only(&self, kinds: &[ArrayKind]) -> bool {
        self.sources().iter().all(|r| kinds.contains(&r.kind()))
    }

    /// The single underlying array of an identity view.
    ///
    /// Returns `None` for any other recipe, or when the array is absent.
    pub fn identity_of<'a, S: ArraySource + ?Sized>(&self, src: &'a S) -> Option<&'a Array> {
        match &self.recipe {
            Recipe::Identity(r) => src.array(r),
            _ => None,
        }
    }

    /// Resolve the recipe into values, consuming flash slots that are read.
    pub fn resolve<S: ArraySource + ?Sized>(&self, src: &mut S) -> Result<Vec<Value>, ArrayError> {
        match &self.recipe {
            Recipe::Identity(r) => lookup_mut(src, r)?.values(),
            Recipe::Slice { source, keys } => {
                let array = lookup_mut(src, source)?;
                for key in keys {
                    array.peek(key)?;
                }
                if array.is_flash() && keys.iter().all(|k| array.peek(k).map_or(true, Value::is_null)) {
                    return Err(ArrayError::EmptyFlashAccess {
                        array: array.name().to_string(),
                    });
                }
                keys.iter().map(|k| array.get(k)).collect()
            }
            Recipe::Extend(sources) => {
                let all_empty = sources
                    .iter()
                    .map(|r| lookup(src, r).map(Array::is_empty))
                    .collect::<Result<Vec<_>, _>>()?
                    .into_iter()
                    .all(|e| e);
                if self.persistence() == Persistence::Flash && all_empty {
                    return Err(ArrayError::EmptyFlashAccess {
                        array: describe(sources),
                    });
                }
                let mut out = Vec::new();
                for r in sources {
                    let array = lookup_mut(src, r)?;
                    if array.is_flash() && array.is_empty() {
                        out.extend(std::iter::repeat(Value::Null).take(array.len()));
                    } else {
                        out.extend(array.values()?);
                    }
                }
                Ok(out)
            }
            Recipe::Mix { sources, picks } => {
                let keys = mix_keys(src, sources, picks)?;
                let picked_empty = keys
                    .iter()
                    .zip(picks)
                    .map(|(k, &p)| lookup(src, pick(sources, p)?).and_then(|a| a.peek(k).map(Value::is_null)))
                    .collect::<Result<Vec<_>, _>>()?
                    .into_iter()
                    .all(|e| e);
                if self.persistence() == Persistence::Flash && picked_empty {
                    return Err(ArrayError::EmptyFlashAccess {
                        array: describe(sources),
                    });
                }
                keys.iter()
                    .zip(picks)
                    .map(|(k, &p)| lookup_mut(src, pick(sources, p)?)?.get(k))
                    .collect()
            }
        }
    }

    /// Resolve without consuming anything, whatever the persistence.
    pub fn peek<S: ArraySource + ?Sized>(&self, src: &S) -> Result<Vec<Value>, ArrayError> {
        match &self.recipe {
            Recipe::Identity(r) => Ok(lookup(src, r)?.snapshot()),
            Recipe::Slice { source, keys } => {
                let array = lookup(src, source)?;
                keys.iter().map(|k| array.peek(k).cloned()).collect()
            }
            Recipe::Extend(sources) => {
                let mut out = Vec::new();
                for r in sources {
                    out.extend(lookup(src, r)?.snapshot());
                }
                Ok(out)
            }
            Recipe::Mix { sources, picks } => {
                let keys = mix_keys(src, sources, picks)?;
                keys.iter()
                    .zip(picks)
                    .map(|(k, &p)| lookup(src, pick(sources, p)?)?.peek(k).cloned())
                    .collect()
            }
        }
    }

    /// The keys the resolved values line up with.
    pub fn keys<S: ArraySource + ?Sized>(&self, src: &S) -> Result<Vec<String>, ArrayError> {
        match &self.recipe {
            Recipe::Identity(r) => Ok(lookup(src, r)?.keys().to_vec()),
            Recipe::Slice { keys, .. } => Ok(keys.clone()),
            Recipe::Extend(sources) => {
                let mut out = Vec::new();
                for r in sources {
                    let array = lookup(src, r)?;
                    out.extend(array.keys().iter().map(|k| format!("{}.{}", array.name(), k)));
                }
                Ok(out)
            }
            Recipe::Mix { sources, picks } => mix_keys(src, sources, picks),
        }
    }

    /// Resolve into a standalone array, used when a whole message must be
    /// handed to a consumer. Extended keys are prefixed with their array name.
    pub fn materialise<S: ArraySource + ?Sized>(&self, src: &mut S) -> Result<Array, ArrayError> {
        let keys = self.keys(src)?;
        let first = self.first_source().clone();
        let (name, kind) = {
            let array = lookup(src, &first)?;
            (array.name().to_string(), array.kind())
        };
        let values = self.resolve(src)?;
        Array::new(name, kind, keys)?.with_values(values)
    }
}

fn check_sources(sources: &[ArrayRef]) -> Result<(), ArrayError> {
    let first = sources.first().ok_or(ArrayError::NoSources)?;
    if sources.iter().any(|r| r.persistence() != first.persistence()) {
        return Err(ArrayError::MixedVariants);
    }
    Ok(())
}

fn mix_keys<S: ArraySource + ?Sized>(
    src: &S,
    sources: &[ArrayRef],
    picks: &[usize],
) -> Result<Vec<String>, ArrayError> {
    let (head, rest) = sources.split_first().ok_or(ArrayError::NoSources)?;
    let first = lookup(src, head)?;
    for r in rest {
        if !lookup(src, r)?.same_shape(first) {
            return Err(ArrayError::ShapeMismatch);
        }
    }
    if picks.len() != first.len() {
        return Err(ArrayError::LengthMismatch {
            array: first.name().to_string(),
            expected: first.len(),
            found: picks.len(),
        });
    }
    Ok(first.keys().to_vec())
}

fn pick(sources: &[ArrayRef], p: usize) -> Result<&ArrayRef, ArrayError> {
    sources.get(p).ok_or(ArrayError::PickOutOfRange {
        pick: p,
        sources: sources.len(),
    })
}

fn describe(sources: &[ArrayRef]) -> String {
    sources
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Store(HashMap<ArrayRef, Array>);

    impl Store {
        fn with(mut self, array: Array) -> Self {
            self.0.insert(ArrayRef::of(&array).unwrap(), array);
            self
        }
    }

    impl ArraySource for Store {
        fn array(&self, r: &ArrayRef) -> Option<&Array> {
            self.0.get(r)
        }
        fn array_mut(&mut self, r: &ArrayRef) -> Option<&mut Array> {
            self.0.get_mut(r)
        }
    }

    fn store() -> Store {
        Store::default()
            .with(Array::resource("stock", ["energy", "coins"]).unwrap().with_values([10.0, 2.0]).unwrap())
            .with(Array::buzz("left", ["a", "b"]).unwrap().with_values([1, 2]).unwrap())
            .with(Array::buzz("right", ["a", "b"]).unwrap().with_values([3, 4]).unwrap())
    }

    #[test]
    fn identity_returns_the_same_array_each_time() {
        let s = store();
        let op = ArrayOperator::identity(ArrayRef::Resource);
        let first = op.identity_of(&s).unwrap();
        let second = op.identity_of(&s).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.name(), "stock");
    }

    #[test]
    fn slice_reads_named_keys() {
        let mut s = store();
        let op = ArrayOperator::slice(ArrayRef::Resource, ["coins"]).unwrap();
        assert_eq!(op.resolve(&mut s).unwrap(), vec![Value::Float(2.0)]);
        assert_eq!(op.resolve(&mut s).unwrap(), vec![Value::Float(2.0)]);
    }

    #[test]
    fn slice_on_flash_consumes_only_selected_slots() {
        let mut s = store();
        let op = ArrayOperator::slice(ArrayRef::buzz("left"), ["b"]).unwrap();
        assert_eq!(op.resolve(&mut s).unwrap(), vec![Value::Int(2)]);
        let left = s.array(&ArrayRef::buzz("left")).unwrap();
        assert_eq!(left.peek("a").unwrap(), &Value::Int(1));
        assert!(matches!(op.resolve(&mut s), Err(ArrayError::EmptyFlashAccess { .. })));
    }

    #[test]
    fn extend_concatenates() {
        let mut s = store();
        let op = ArrayOperator::extend(vec![ArrayRef::buzz("left"), ArrayRef::buzz("right")]).unwrap();
        assert_eq!(op.keys(&s).unwrap()[2], "right.a");
        assert_eq!(op.resolve(&mut s).unwrap().len(), 4);
        assert!(s.array(&ArrayRef::buzz("right")).unwrap().is_empty());
    }

    #[test]
    fn mix_picks_per_key() {
        let mut s = store();
        let op = ArrayOperator::mix(vec![ArrayRef::buzz("left"), ArrayRef::buzz("right")], vec![1, 0]).unwrap();
        assert_eq!(op.resolve(&mut s).unwrap(), vec![Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn construction_checks() {
        assert_eq!(
            ArrayOperator::extend(vec![ArrayRef::Resource, ArrayRef::buzz("left")]),
            Err(ArrayError::MixedVariants)
        );
        assert_eq!(
            ArrayOperator::slice(ArrayRef::Resource, Vec::<String>::new()),
            Err(ArrayError::EmptySelection)
        );
        assert!(matches!(
            ArrayOperator::mix(vec![ArrayRef::Resource], vec![1]),
            Err(ArrayError::PickOutOfRange { .. })
        ));
    }

    #[test]
    fn slice_rejects_repeated_keys() {
        assert_eq!(
            ArrayOperator::slice(ArrayRef::Resource, ["energy", "coins", "energy"]),
            Err(ArrayError::DuplicateKey {
                array: ArrayRef::Resource.to_string(),
                key: "energy".to_string(),
            })
        );
        let mut s = store();
        let op = ArrayOperator::slice(ArrayRef::Resource, ["coins", "energy"]).unwrap();
        assert_eq!(op.resolve(&mut s).unwrap(), vec![Value::Float(2.0), Value::Float(10.0)]);
    }

    #[test]
    fn materialise_builds_a_message() {
        let mut s = store();
        let op = ArrayOperator::slice(ArrayRef::buzz("right"), ["a"]).unwrap();
        let msg = op.materialise(&mut s).unwrap();
        assert_eq!(msg.keys(), &["a".to_string()]);
        assert_eq!(msg.kind(), ArrayKind::Buzz);
        assert_eq!(msg.peek("a").unwrap(), &Value::Int(3));
    }
}
