//! Instructors: named organs that run an engine over snapshots of an
//! agent's arrays.
//!
//! An engine never sees the agent. It receives the inputs its organ kind
//! offers, in a fixed order, and returns a flat list of values. The first
//! values fill the output message; the rest fill the scaffold maps in their
//! declared key order. Maps are applied by the owner once the engine has
//! returned.
//!
//! | Kind | Message | Output | Maps |
//! |------|---------|--------|------|
//! | Sensor | none | buzz | optional |
//! | Actuator | direction | none | optional |
//! | Interpreter | buzz or belief | belief | optional |
//! | Moulder | belief | direction | optional |
//! | Cortex | optional imprint | feature | never |
//! | Compulsion | none | none | resource, required |
//! | Mutation / MultiMutation | none | none | essence, required |

use crate::agent::{AVAILABLE_CORTICES, CORTEX_NAMES, REVEAL_CORTICES};
use crate::array::{Array, ArrayKind};
use crate::bank::ArrayBank;
use crate::error::{AnimusError, ArrayError, EngineError, InstructorError, Result};
use crate::executive::{Outcome, Verb};
use crate::numeric;
use crate::operator::{ArrayOperator, ArrayRef, ArraySource};
use crate::scaffold::{MapCollection, ScaffoldTarget};
use crate::types::{AgentId, Kwargs, Value};
use rand::RngCore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared engine closure, already normalised to a flat output list.
pub type EngineFn = dyn Fn(EngineArgs<'_>) -> std::result::Result<Vec<Value>, EngineError> + Send + Sync;

/// What an engine receives, in the order its organ kind defines.
pub struct EngineArgs<'a> {
    /// Direction, buzz, belief or imprint values, depending on the kind.
    pub message: &'a [Value],
    pub resource: Option<&'a [Value]>,
    pub essence: Option<&'a [Value]>,
    /// Current output belief, offered to belief updaters only.
    pub belief: Option<&'a [Value]>,
    pub agent_id: Option<AgentId>,
    /// The essence key being mutated, for multi-mutations.
    pub target_key: Option<&'a str>,
    pub kwargs: &'a Kwargs,
    pub rng: &'a mut dyn RngCore,
}

fn number(values: Option<&[Value]>, idx: usize, what: &str) -> std::result::Result<f64, EngineError> {
    values
        .and_then(|v| v.get(idx))
        .and_then(Value::as_f64)
        .ok_or_else(|| EngineError::new(format!("{} value {} is not a number", what, idx)))
}

impl EngineArgs<'_> {
    pub fn message_f64(&self, idx: usize) -> std::result::Result<f64, EngineError> {
        number(Some(self.message), idx, "message")
    }

    pub fn resource_f64(&self, idx: usize) -> std::result::Result<f64, EngineError> {
        number(self.resource, idx, "resource")
    }

    pub fn essence_f64(&self, idx: usize) -> std::result::Result<f64, EngineError> {
        number(self.essence, idx, "essence")
    }

    pub fn belief_f64(&self, idx: usize) -> std::result::Result<f64, EngineError> {
        number(self.belief, idx, "belief")
    }

    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    pub fn kwarg_f64(&self, name: &str) -> std::result::Result<f64, EngineError> {
        self.kwargs
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| EngineError::new(format!("kwarg '{}' is missing or not a number", name)))
    }
}

/// Engine return values that can be spread over outputs.
///
/// Scalars and strings become a one-element output.
pub trait IntoOutputs {
    fn into_outputs(self) -> Vec<Value>;
}

impl<T: Into<Value>> IntoOutputs for Vec<T> {
    fn into_outputs(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

macro_rules! scalar_outputs {
    ($($t:ty),*) => {
        $(impl IntoOutputs for $t {
            fn into_outputs(self) -> Vec<Value> {
                vec![self.into()]
            }
        })*
    };
}

scalar_outputs!(Value, bool, i32, i64, u64, f64, String, &str);

impl IntoOutputs for () {
    fn into_outputs(self) -> Vec<Value> {
        Vec::new()
    }
}

impl<A: Into<Value>, B: Into<Value>> IntoOutputs for (A, B) {
    fn into_outputs(self) -> Vec<Value> {
        vec![self.0.into(), self.1.into()]
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> IntoOutputs for (A, B, C) {
    fn into_outputs(self) -> Vec<Value> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

/// A cloneable handle on an engine closure.
#[derive(Clone)]
pub struct Engine(Arc<EngineFn>);

impl Engine {
    pub fn new<F, O>(f: F) -> Self
    where
        F: Fn(EngineArgs<'_>) -> std::result::Result<O, EngineError> + Send + Sync + 'static,
        O: IntoOutputs,
    {
        Engine(Arc::new(move |args: EngineArgs<'_>| {
            f(args).map(IntoOutputs::into_outputs)
        }))
    }

    pub fn call(&self, args: EngineArgs<'_>) -> std::result::Result<Vec<Value>, EngineError> {
        (self.0)(args)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Engine(..)")
    }
}

/// Which organ an instructor is, with the parameters specific to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstructorKind {
    Sensor,
    Actuator,
    Interpreter { belief_updater: bool },
    Moulder,
    Cortex,
    Compulsion,
    Mutation { prob: f64 },
    MultiMutation { prob: f64 },
}

impl InstructorKind {
    pub fn category(&self) -> Category {
        match self {
            InstructorKind::Sensor => Category::Sensor,
            InstructorKind::Actuator => Category::Actuator,
            InstructorKind::Interpreter { .. } => Category::Interpreter,
            InstructorKind::Moulder => Category::Moulder,
            InstructorKind::Cortex => Category::Cortex,
            InstructorKind::Compulsion => Category::Compulsion,
            InstructorKind::Mutation { .. } | InstructorKind::MultiMutation { .. } => Category::Mutation,
        }
    }

    /// Mutations leave missed maps unset, which always applies as identity.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            InstructorKind::Mutation { .. } | InstructorKind::MultiMutation { .. }
        )
    }

    fn accepts_input(&self, op: &ArrayOperator) -> bool {
        match self {
            InstructorKind::Actuator => op.reads_only(&[ArrayKind::Direction]),
            InstructorKind::Interpreter { .. } => op.reads_only(&[ArrayKind::Buzz, ArrayKind::Belief]),
            InstructorKind::Moulder => op.reads_only(&[ArrayKind::Belief]),
            InstructorKind::Cortex => {
                op.reads_only(&[ArrayKind::Essence, ArrayKind::Resource, ArrayKind::Belief])
            }
            _ => false,
        }
    }

    fn output_kind(&self) -> Option<ArrayKind> {
        match self {
            InstructorKind::Sensor => Some(ArrayKind::Buzz),
            InstructorKind::Interpreter { .. } => Some(ArrayKind::Belief),
            InstructorKind::Moulder => Some(ArrayKind::Direction),
            InstructorKind::Cortex => Some(ArrayKind::Feature),
            _ => None,
        }
    }

    fn required_target(&self) -> Option<ScaffoldTarget> {
        match self {
            InstructorKind::Compulsion => Some(ScaffoldTarget::Resource),
            InstructorKind::Mutation { .. } | InstructorKind::MultiMutation { .. } => {
                Some(ScaffoldTarget::Essence)
            }
            _ => None,
        }
    }
}

/// Organ categories as an agent files them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Sensor,
    Interpreter,
    Moulder,
    Actuator,
    Cortex,
    Compulsion,
    Mutation,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Sensor => "sensor",
            Category::Interpreter => "interpreter",
            Category::Moulder => "moulder",
            Category::Actuator => "actuator",
            Category::Cortex => "cortex",
            Category::Compulsion => "compulsion",
            Category::Mutation => "mutation",
        }
    }

    /// The category an organ verb dispatches to.
    pub fn of_verb(verb: Verb) -> Option<Category> {
        match verb {
            Verb::Sense => Some(Category::Sensor),
            Verb::Interpret => Some(Category::Interpreter),
            Verb::Mould => Some(Category::Moulder),
            Verb::Act => Some(Category::Actuator),
            Verb::Tickle => Some(Category::Cortex),
            Verb::Compel => Some(Category::Compulsion),
            Verb::Mutate => Some(Category::Mutation),
            Verb::Pronounce | Verb::Enact | Verb::Pump => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshots gathered for one engine call.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub message: Vec<Value>,
    pub resource: Option<Vec<Value>>,
    pub essence: Option<Vec<Value>>,
    pub belief: Option<Vec<Value>>,
    pub agent_id: Option<AgentId>,
}

impl Inputs {
    pub fn args<'a>(
        &'a self,
        kwargs: &'a Kwargs,
        target_key: Option<&'a str>,
        rng: &'a mut dyn RngCore,
    ) -> EngineArgs<'a> {
        EngineArgs {
            message: &self.message,
            resource: self.resource.as_deref(),
            essence: self.essence.as_deref(),
            belief: self.belief.as_deref(),
            agent_id: self.agent_id,
            target_key,
            kwargs,
            rng,
        }
    }
}

/// A named organ: an engine plus the wiring that feeds and drains it.
///
/// The engine type is a parameter so that system-owned interactions can reuse
/// the same wiring with an engine that also sees the system.
#[derive(Debug, Clone)]
pub struct Instructor<E = Engine> {
    name: String,
    kind: InstructorKind,
    engine: E,
    input: Option<ArrayOperator>,
    output: Option<Array>,
    maps: Option<MapCollection>,
    resource_op: Option<ArrayOperator>,
    essence_op: Option<ArrayOperator>,
    kwargs: Kwargs,
    pass_agent_id: bool,
    strict: bool,
}

fn check_probability(prob: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&prob) {
        Ok(prob)
    } else {
        Err(InstructorError::InvalidProbability(prob).into())
    }
}

impl<E> Instructor<E> {
    fn bare(name: impl Into<String>, kind: InstructorKind, engine: E) -> Self {
        Self {
            name: name.into(),
            kind,
            engine,
            input: None,
            output: None,
            maps: None,
            resource_op: None,
            essence_op: None,
            kwargs: Kwargs::new(),
            pass_agent_id: false,
            strict: false,
        }
    }

    pub fn sensor(name: impl Into<String>, engine: E) -> Self {
        Self::bare(name, InstructorKind::Sensor, engine)
    }

    pub fn actuator(name: impl Into<String>, engine: E, direction: ArrayOperator) -> Result<Self> {
        Self::bare(name, InstructorKind::Actuator, engine).with_input(direction)
    }

    pub fn interpreter(name: impl Into<String>, engine: E, input: ArrayOperator, output: Array) -> Result<Self> {
        let kind = InstructorKind::Interpreter { belief_updater: false };
        Self::bare(name, kind, engine).with_input(input)?.with_output(output)
    }

    /// An interpreter that also receives its output belief's current values.
    pub fn belief_updater(name: impl Into<String>, engine: E, input: ArrayOperator, output: Array) -> Result<Self> {
        let kind = InstructorKind::Interpreter { belief_updater: true };
        Self::bare(name, kind, engine).with_input(input)?.with_output(output)
    }

    pub fn moulder(name: impl Into<String>, engine: E, belief: ArrayOperator, output: Array) -> Result<Self> {
        Self::bare(name, InstructorKind::Moulder, engine)
            .with_input(belief)?
            .with_output(output)
    }

    pub fn cortex(name: impl Into<String>, engine: E, output: Array) -> Result<Self> {
        Self::bare(name, InstructorKind::Cortex, engine).with_output(output)
    }

    pub fn compulsion(name: impl Into<String>, engine: E, maps: impl Into<MapCollection>) -> Result<Self> {
        Self::bare(name, InstructorKind::Compulsion, engine).with_maps(maps)
    }

    pub fn mutation(name: impl Into<String>, engine: E, maps: impl Into<MapCollection>, prob: f64) -> Result<Self> {
        let kind = InstructorKind::Mutation {
            prob: check_probability(prob)?,
        };
        Self::bare(name, kind, engine).with_maps(maps)
    }

    /// A mutation drawing one trial per essence key it targets.
    pub fn multi_mutation(
        name: impl Into<String>,
        engine: E,
        maps: impl Into<MapCollection>,
        prob: f64,
    ) -> Result<Self> {
        let kind = InstructorKind::MultiMutation {
            prob: check_probability(prob)?,
        };
        Self::bare(name, kind, engine).with_maps(maps)
    }

    pub fn with_input(mut self, op: ArrayOperator) -> Result<Self> {
        if !self.kind.accepts_input(&op) {
            let reason = match self.kind.category() {
                Category::Actuator => "actuators read directions only",
                Category::Interpreter => "interpreters read buzzes or beliefs only",
                Category::Moulder => "moulders read beliefs only",
                Category::Cortex => "cortices read imprints only",
                _ => "this organ reads no message",
            };
            return Err(InstructorError::InvalidInput {
                organ: self.name,
                reason: reason.into(),
            }
            .into());
        }
        self.input = Some(op);
        Ok(self)
    }

    pub fn with_output(mut self, output: Array) -> Result<Self> {
        match self.kind.output_kind() {
            Some(kind) if kind == output.kind() => {
                self.output = Some(output);
                Ok(self)
            }
            Some(kind) => Err(InstructorError::InvalidOutput {
                organ: self.name,
                reason: format!("expected a {}, got a {}", kind, output.kind()),
            }
            .into()),
            None => Err(InstructorError::InvalidOutput {
                organ: self.name,
                reason: format!("a {} produces no message", self.kind.category()),
            }
            .into()),
        }
    }

    pub fn with_maps(mut self, maps: impl Into<MapCollection>) -> Result<Self> {
        let maps = maps.into();
        if self.kind == InstructorKind::Cortex {
            return Err(InstructorError::InvalidOutput {
                organ: self.name,
                reason: "cortices carry no scaffold maps".into(),
            }
            .into());
        }
        if let Some(required) = self.kind.required_target() {
            if maps.target() != required {
                return Err(InstructorError::MissingMap {
                    organ: self.name,
                    required: required.to_string(),
                }
                .into());
            }
        }
        self.maps = Some(maps);
        Ok(self)
    }

    pub fn with_resource(mut self, op: ArrayOperator) -> Result<Self> {
        if !op.reads_only(&[ArrayKind::Resource]) {
            return Err(InstructorError::InvalidInput {
                organ: self.name,
                reason: "resource read must target the resource".into(),
            }
            .into());
        }
        self.resource_op = Some(op);
        Ok(self)
    }

    pub fn with_essence(mut self, op: ArrayOperator) -> Result<Self> {
        if !op.reads_only(&[ArrayKind::Essence]) {
            return Err(InstructorError::InvalidInput {
                organ: self.name,
                reason: "essence read must target the essence".into(),
            }
            .into());
        }
        self.essence_op = Some(op);
        Ok(self)
    }

    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn passing_agent_id(mut self) -> Self {
        self.pass_agent_id = true;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InstructorKind {
        self.kind
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn input(&self) -> Option<&ArrayOperator> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&Array> {
        self.output.as_ref()
    }

    pub fn output_ref(&self) -> Option<ArrayRef> {
        self.output.as_ref().and_then(ArrayRef::of)
    }

    pub fn maps(&self) -> Option<&MapCollection> {
        self.maps.as_ref()
    }

    pub fn maps_mut(&mut self) -> Option<&mut MapCollection> {
        self.maps.as_mut()
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn set_kwarg(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.kwargs.insert(key.into(), value.into());
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Number of values the engine must return per call.
    pub fn expected_outputs(&self) -> usize {
        self.output.as_ref().map_or(0, Array::len) + self.maps.as_ref().map_or(0, MapCollection::arity)
    }

    /// Gather the engine inputs from `bank`. Flash messages are consumed.
    pub fn prepare(&self, bank: &mut ArrayBank, agent_id: Option<AgentId>) -> Result<Inputs> {
        let message = match &self.input {
            Some(op) => op.resolve(bank)?,
            None => Vec::new(),
        };
        let resource = self.resource_op.as_ref().map(|op| op.peek(&*bank)).transpose()?;
        let essence = self.essence_op.as_ref().map(|op| op.peek(&*bank)).transpose()?;
        let belief = match self.kind {
            InstructorKind::Interpreter { belief_updater: true } => self
                .output_ref()
                .and_then(|r| bank.array(&r))
                .map(Array::snapshot),
            _ => None,
        };
        Ok(Inputs {
            message,
            resource,
            essence,
            belief,
            agent_id: if self.pass_agent_id { agent_id } else { None },
        })
    }

    /// Spread an engine result over the output message and the maps.
    ///
    /// A failed engine, or one returning the wrong number of values, leaves
    /// every output unset.
    pub fn deliver(
        &mut self,
        bank: &mut ArrayBank,
        result: std::result::Result<Vec<Value>, EngineError>,
    ) -> Result<Outcome> {
        let values = match result {
            Ok(values) => values,
            Err(e) => return self.capture(e),
        };
        let expected = self.expected_outputs();
        if values.len() != expected {
            return self.capture(self.arity_error(expected, values.len()));
        }

        let mut rest = values.into_iter();
        if let Some(output) = &self.output {
            let head: Vec<Value> = rest.by_ref().take(output.len()).collect();
            let r = ArrayRef::of(output).ok_or_else(|| ArrayError::Missing(output.name().to_string()))?;
            bank.array_mut(&r)
                .ok_or_else(|| ArrayError::Missing(r.to_string()))?
                .set_values(head)?;
        }
        if let Some(maps) = &mut self.maps {
            maps.set_values(rest)?;
        }
        Ok(Outcome::Completed)
    }

    /// Fill the arguments of the single map targeting `key`.
    pub fn deliver_map(
        &mut self,
        key: &str,
        result: std::result::Result<Vec<Value>, EngineError>,
    ) -> Result<Outcome> {
        let values = match result {
            Ok(values) => values,
            Err(e) => return self.capture(e),
        };
        let arity = self
            .maps
            .iter()
            .flat_map(MapCollection::iter)
            .find(|m| m.key() == key)
            .map(|m| m.arity())
            .ok_or_else(|| ArrayError::UnknownKey {
                array: self.name.clone(),
                key: key.to_string(),
            })?;
        if values.len() != arity {
            return self.capture(self.arity_error(arity, values.len()));
        }
        if let Some(map) = self.maps.iter_mut().flat_map(MapCollection::iter_mut).find(|m| m.key() == key) {
            map.set_arguments(values)?;
        }
        Ok(Outcome::Completed)
    }

    fn arity_error(&self, expected: usize, found: usize) -> EngineError {
        EngineError::new(
            InstructorError::OutputArity {
                organ: self.name.clone(),
                expected,
                found,
            }
            .to_string(),
        )
    }

    fn capture(&self, e: EngineError) -> Result<Outcome> {
        if self.strict {
            return Err(AnimusError::Engine(e));
        }
        warn!(organ = %self.name, error = %e, "engine failure captured");
        Ok(Outcome::Captured(e))
    }
}

impl Instructor<Engine> {
    /// The cortex every agent carries. It reveals the list held in its
    /// `cortex_names` kwarg, which the agent keeps current.
    pub(crate) fn reveal_cortices() -> Self {
        let engine = Engine::new(|args| {
            Ok::<_, EngineError>(
                args.kwarg(CORTEX_NAMES)
                    .cloned()
                    .unwrap_or_else(|| Value::List(Vec::new())),
            )
        });
        let mut organ = Self::bare(REVEAL_CORTICES, InstructorKind::Cortex, engine);
        organ.output = Some(Array::single(AVAILABLE_CORTICES, ArrayKind::Feature, CORTEX_NAMES));
        organ
    }

    /// Run the organ once against `bank`.
    ///
    /// Maps are left filled for the caller to apply.
    pub fn call(
        &mut self,
        bank: &mut ArrayBank,
        agent_id: Option<AgentId>,
        rng: &mut dyn RngCore,
    ) -> Result<Outcome> {
        debug!(organ = %self.name, category = %self.kind.category(), "running engine");
        match self.kind {
            InstructorKind::Mutation { prob } => {
                if !numeric::bernoulli(rng, prob) {
                    return Ok(Outcome::Completed);
                }
                let inputs = self.prepare(bank, agent_id)?;
                let result = self.engine.call(inputs.args(&self.kwargs, None, rng));
                self.deliver(bank, result)
            }
            InstructorKind::MultiMutation { prob } => {
                let keys: Vec<String> = self
                    .maps
                    .iter()
                    .flat_map(MapCollection::target_keys)
                    .map(str::to_string)
                    .collect();
                let inputs = self.prepare(bank, agent_id)?;
                for key in keys {
                    if !numeric::bernoulli(rng, prob) {
                        continue;
                    }
                    let result = self.engine.call(inputs.args(&self.kwargs, Some(&key), rng));
                    let outcome = self.deliver_map(&key, result)?;
                    if outcome != Outcome::Completed {
                        return Ok(outcome);
                    }
                }
                Ok(Outcome::Completed)
            }
            _ => {
                let inputs = self.prepare(bank, agent_id)?;
                let result = self.engine.call(inputs.args(&self.kwargs, None, rng));
                self.deliver(bank, result)
            }
        }
    }
}
