//! Scaffold maps — transient recipes that mutate persistent agent state.
//!
//! A map reads "apply mapper `f` with these arguments to key `K` of scaffold
//! `S`". Its arguments live in a flash array: an engine fills them in, and
//! applying the map consumes them. This is how engine output reaches an
//! agent's essence or resource without the engine ever holding the agent.

use crate::array::{Array, ArrayKind};
use crate::error::{ArrayError, EngineError, Result, ScaffoldError};
use crate::numeric;
use crate::operator::{ArrayRef, ArraySource};
use crate::types::Value;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Which persistent scaffold a map writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaffoldTarget {
    Resource,
    Essence,
}

impl ScaffoldTarget {
    pub fn array_ref(&self) -> ArrayRef {
        match self {
            ScaffoldTarget::Resource => ArrayRef::Resource,
            ScaffoldTarget::Essence => ArrayRef::Essence,
        }
    }
}

impl fmt::Display for ScaffoldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaffoldTarget::Resource => write!(f, "resource"),
            ScaffoldTarget::Essence => write!(f, "essence"),
        }
    }
}

/// Signature of a custom mapper: current value, arguments, generator.
pub type MapperFn = dyn Fn(&Value, &[Value], &mut dyn RngCore) -> std::result::Result<Value, EngineError> + Send + Sync;

/// The function a map applies. The first input is always the current value.
#[derive(Clone)]
pub enum Mapper {
    /// `reset(x, v) = v`
    Reset,
    /// `delta(x, d) = x + d`
    Delta,
    /// `scale(x, f) = x * f`
    Scale,
    /// `delta_scale(x, d, f) = (x + d) * f`
    DeltaScale,
    /// `wiener(x, sigma) = x + sigma * z`
    Wiener,
    /// `wiener_bounded(x, sigma, lo, hi) = clamp(x + sigma * z, lo, hi)`
    WienerBounded,
    /// `exponential_convergence(x, target, rate) = target + (x - target) * exp(-rate)`
    ExponentialConvergence,
    /// Replace one random character of `x` with a different one from `alphabet`.
    FlipOneChar,
    Custom { name: String, func: Arc<MapperFn> },
}

impl Mapper {
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &[Value], &mut dyn RngCore) -> std::result::Result<Value, EngineError> + Send + Sync + 'static,
    {
        Mapper::Custom {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Mapper::Reset => "reset",
            Mapper::Delta => "delta",
            Mapper::Scale => "scale",
            Mapper::DeltaScale => "delta_scale",
            Mapper::Wiener => "wiener",
            Mapper::WienerBounded => "wiener_bounded",
            Mapper::ExponentialConvergence => "exponential_convergence",
            Mapper::FlipOneChar => "flip_one_char",
            Mapper::Custom { name, .. } => name,
        }
    }

    /// Number of arguments after the current value; `None` for custom mappers.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Mapper::Reset | Mapper::Delta | Mapper::Scale | Mapper::Wiener | Mapper::FlipOneChar => Some(1),
            Mapper::DeltaScale | Mapper::ExponentialConvergence => Some(2),
            Mapper::WienerBounded => Some(3),
            Mapper::Custom { .. } => None,
        }
    }

    /// Compute the new value from the current one.
    ///
    /// A built-in mapper given the wrong number of arguments fails with
    /// [`ScaffoldError::Arity`].
    pub fn apply(&self, current: &Value, args: &[Value], rng: &mut dyn RngCore) -> std::result::Result<Value, ScaffoldError> {
        if let Some(expected) = self.arity() {
            if args.len() != expected {
                return Err(ScaffoldError::Arity {
                    mapper: self.name().to_string(),
                    expected,
                    found: args.len(),
                });
            }
        }
        let fail = |reason: String| ScaffoldError::Mapper {
            mapper: self.name().to_string(),
            reason,
        };
        let num = |v: &Value| v.as_f64().ok_or_else(|| fail(format!("expected a number, got {}", v.type_name())));
        match self {
            Mapper::Reset => Ok(args[0].clone()),
            Mapper::Delta => add(current, &args[0]).ok_or_else(|| fail(mismatch(current, &args[0]))),
            Mapper::Scale => mul(current, &args[0]).ok_or_else(|| fail(mismatch(current, &args[0]))),
            Mapper::DeltaScale => {
                let shifted = add(current, &args[0]).ok_or_else(|| fail(mismatch(current, &args[0])))?;
                mul(&shifted, &args[1]).ok_or_else(|| fail(mismatch(&shifted, &args[1])))
            }
            Mapper::Wiener => {
                let x = num(current)?;
                let sigma = num(&args[0])?;
                Ok(Value::Float(x + sigma * numeric::standard_normal(rng)))
            }
            Mapper::WienerBounded => {
                let x = num(current)?;
                let sigma = num(&args[0])?;
                let (lo, hi) = (num(&args[1])?, num(&args[2])?);
                if lo > hi {
                    return Err(fail(format!("lower bound {} above upper bound {}", lo, hi)));
                }
                Ok(Value::Float((x + sigma * numeric::standard_normal(rng)).clamp(lo, hi)))
            }
            Mapper::ExponentialConvergence => {
                let x = num(current)?;
                Ok(Value::Float(numeric::exponential_convergence(x, num(&args[0])?, num(&args[1])?)))
            }
            Mapper::FlipOneChar => {
                let text = current.as_str().ok_or_else(|| fail("expected text".into()))?;
                let alphabet = args[0].as_str().ok_or_else(|| fail("alphabet must be text".into()))?;
                flip_one_char(text, alphabet, rng).map(Value::Text).map_err(fail)
            }
            Mapper::Custom { func, .. } => func(current, args, rng).map_err(|e| fail(e.message)),
        }
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapper({})", self.name())
    }
}

impl FromStr for Mapper {
    type Err = ScaffoldError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reset" => Ok(Mapper::Reset),
            "delta" => Ok(Mapper::Delta),
            "scale" => Ok(Mapper::Scale),
            "delta_scale" => Ok(Mapper::DeltaScale),
            "wiener" => Ok(Mapper::Wiener),
            "wiener_bounded" => Ok(Mapper::WienerBounded),
            "exponential_convergence" => Ok(Mapper::ExponentialConvergence),
            "flip_one_char" => Ok(Mapper::FlipOneChar),
            other => Err(ScaffoldError::UnknownMapper(other.to_string())),
        }
    }
}

fn mismatch(a: &Value, b: &Value) -> String {
    format!("cannot combine {} with {}", a.type_name(), b.type_name())
}

fn add(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(Value::Int(x.wrapping_add(*y))),
        _ => Some(Value::Float(a.as_f64()? + b.as_f64()?)),
    }
}

fn mul(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(Value::Int(x.wrapping_mul(*y))),
        _ => Some(Value::Float(a.as_f64()? * b.as_f64()?)),
    }
}

fn flip_one_char(text: &str, alphabet: &str, rng: &mut dyn RngCore) -> std::result::Result<String, String> {
    let mut chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(String::new());
    }
    let idx = rng.gen_range(0..chars.len());
    let candidates: Vec<char> = alphabet.chars().filter(|&c| c != chars[idx]).collect();
    if candidates.is_empty() {
        return Err(format!("alphabet '{}' offers no replacement for '{}'", alphabet, chars[idx]));
    }
    chars[idx] = candidates[rng.gen_range(0..candidates.len())];
    Ok(chars.into_iter().collect())
}

/// One "apply mapper to key" recipe.
#[derive(Debug, Clone)]
pub struct ScaffoldMap {
    target: ScaffoldTarget,
    key: String,
    mapper: Mapper,
    args: Array,
}

impl ScaffoldMap {
    /// Build a map. Standard mappers check their argument count here.
    pub fn new<K, S>(target: ScaffoldTarget, key: impl Into<String>, mapper: Mapper, arg_keys: K) -> Result<Self>
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into();
        let arg_keys: Vec<String> = arg_keys.into_iter().map(Into::into).collect();
        if let Some(expected) = mapper.arity() {
            if expected != arg_keys.len() {
                return Err(ScaffoldError::Arity {
                    mapper: mapper.name().to_string(),
                    expected,
                    found: arg_keys.len(),
                }
                .into());
            }
        }
        let args = Array::new(format!("{}.{}", target, key), ArrayKind::MapArguments, arg_keys)?;
        Ok(Self {
            target,
            key,
            mapper,
            args,
        })
    }

    /// Build a map from a standard mapper name.
    pub fn named<K, S>(target: ScaffoldTarget, key: impl Into<String>, mapper: &str, arg_keys: K) -> Result<Self>
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(target, key, mapper.parse()?, arg_keys)
    }

    pub fn resource<K: IntoIterator<Item = S>, S: Into<String>>(key: impl Into<String>, mapper: &str, arg_keys: K) -> Result<Self> {
        Self::named(ScaffoldTarget::Resource, key, mapper, arg_keys)
    }

    pub fn essence<K: IntoIterator<Item = S>, S: Into<String>>(key: impl Into<String>, mapper: &str, arg_keys: K) -> Result<Self> {
        Self::named(ScaffoldTarget::Essence, key, mapper, arg_keys)
    }

    pub fn target(&self) -> ScaffoldTarget {
        self.target
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn arg_keys(&self) -> &[String] {
        self.args.keys()
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn arguments(&self) -> &Array {
        &self.args
    }

    pub fn set_arguments<I, V>(&mut self, values: I) -> std::result::Result<(), ArrayError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args.set_values(values)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn clear(&mut self) {
        self.args.clear();
    }

    /// Apply the map to the scaffold held by `scaffolds`.
    ///
    /// Returns whether the target value changed hands. The arguments are
    /// consumed by every call that gets past the target lookup. With
    /// `empty_to_identity`, empty or partially empty arguments leave the
    /// target untouched; without it they fail.
    pub fn apply_to<S: ArraySource + ?Sized>(
        &mut self,
        scaffolds: &mut S,
        rng: &mut dyn RngCore,
        empty_to_identity: bool,
    ) -> Result<bool> {
        let scaffold = scaffolds
            .array_mut(&self.target.array_ref())
            .ok_or_else(|| ScaffoldError::MissingScaffold(self.target.to_string()))?;
        let current = scaffold.peek(&self.key)?.clone();
        if current.is_null() {
            return Err(ScaffoldError::UnsetTarget {
                target: self.target.to_string(),
                key: self.key.clone(),
            }
            .into());
        }

        if self.args.is_empty() {
            if empty_to_identity {
                return Ok(false);
            }
            return Err(ArrayError::EmptyFlashAccess {
                array: self.args.name().to_string(),
            }
            .into());
        }
        if self.args.is_partially_empty() {
            self.args.clear();
            if empty_to_identity {
                return Ok(false);
            }
            return Err(ScaffoldError::PartialArguments {
                map: self.args.name().to_string(),
            }
            .into());
        }

        let args = self.args.values()?;
        let updated = self.mapper.apply(&current, &args, rng)?;
        debug!(
            target_scaffold = %self.target,
            key = %self.key,
            mapper = self.mapper.name(),
            "applying scaffold map"
        );
        scaffold.set(&self.key, updated)?;
        Ok(true)
    }
}

/// An ordered collection of maps on one scaffold, applied in declaration order.
#[derive(Debug, Clone)]
pub struct MapCollection {
    maps: Vec<ScaffoldMap>,
}

impl MapCollection {
    pub fn new(maps: Vec<ScaffoldMap>) -> Result<Self> {
        let first = maps.first().ok_or(ArrayError::NoSources)?;
        if maps.iter().any(|m| m.target != first.target) {
            return Err(ScaffoldError::MixedTargets.into());
        }
        Ok(Self { maps })
    }

    pub fn single(map: ScaffoldMap) -> Self {
        Self { maps: vec![map] }
    }

    pub fn target(&self) -> ScaffoldTarget {
        self.maps[0].target
    }

    /// Total number of argument slots, in declared key order.
    pub fn arity(&self) -> usize {
        self.maps.iter().map(ScaffoldMap::arity).sum()
    }

    /// Target keys, one per map.
    pub fn target_keys(&self) -> Vec<&str> {
        self.maps.iter().map(ScaffoldMap::key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(ScaffoldMap::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScaffoldMap> {
        self.maps.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ScaffoldMap> {
        self.maps.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn clear(&mut self) {
        self.maps.iter_mut().for_each(ScaffoldMap::clear);
    }

    /// Distribute argument values over the maps, in declaration order.
    pub fn set_values<I, V>(&mut self, values: I) -> std::result::Result<(), ArrayError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.len() != self.arity() {
            return Err(ArrayError::LengthMismatch {
                array: self.target_keys().join("+"),
                expected: self.arity(),
                found: values.len(),
            });
        }
        let mut rest = values.into_iter();
        for map in &mut self.maps {
            let chunk: Vec<Value> = rest.by_ref().take(map.arity()).collect();
            map.set_arguments(chunk)?;
        }
        Ok(())
    }

    /// Apply every map in order; returns how many changed their target.
    pub fn apply_to<S: ArraySource + ?Sized>(
        &mut self,
        scaffolds: &mut S,
        rng: &mut dyn RngCore,
        empty_to_identity: bool,
    ) -> Result<usize> {
        let mut applied = 0;
        for map in &mut self.maps {
            if map.apply_to(scaffolds, rng, empty_to_identity)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

impl From<ScaffoldMap> for MapCollection {
    fn from(map: ScaffoldMap) -> Self {
        MapCollection::single(map)
    }
}
