//! Agents: arrays, organs and policies gathered under one name.
//!
//! An agent is built from its name alone and populated through setters.
//! Its id is assigned when a management system takes it in. Every verb
//! resolves an organ or policy by name; organ verbs run the engine and then
//! apply any scaffold maps it filled back onto the agent itself.

use crate::array::{Array, ArrayKind};
use crate::bank::ArrayBank;
use crate::error::{AgentError, ArrayError, PolicyError, Result, SocketError};
use crate::executive::{Executive, Outcome, Verb};
use crate::instructor::{Category, Instructor};
use crate::operator::ArraySource;
use crate::policy::{Clause, Heartbeat, Plan};
use crate::scaffold::MapCollection;
use crate::socket::Socket;
use crate::types::{rng_from_seed, AgentId, SimRng, Tick, Value};
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the cortex every agent carries.
pub const REVEAL_CORTICES: &str = "reveal_available_cortices";
/// Feature written by [`REVEAL_CORTICES`].
pub const AVAILABLE_CORTICES: &str = "available_cortices";
/// Single key of [`AVAILABLE_CORTICES`], and the kwarg holding the list.
pub const CORTEX_NAMES: &str = "cortex_names";

#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    id: Option<AgentId>,
    inert: bool,
    ticks: Tick,
    strict_engine: bool,
    empty_to_identity: bool,
    bank: ArrayBank,
    organs: BTreeMap<Category, BTreeMap<String, Instructor>>,
    clauses: BTreeMap<String, Clause>,
    plans: BTreeMap<String, Plan>,
    heartbeats: BTreeMap<String, Heartbeat>,
    sockets: BTreeMap<String, Socket>,
    rng: SimRng,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        let mut agent = Self {
            name: name.into(),
            id: None,
            inert: false,
            ticks: 0,
            strict_engine: false,
            empty_to_identity: true,
            bank: ArrayBank::new(),
            organs: BTreeMap::new(),
            clauses: BTreeMap::new(),
            plans: BTreeMap::new(),
            heartbeats: BTreeMap::new(),
            sockets: BTreeMap::new(),
            rng: rng_from_seed(None),
        };
        let reveal = Instructor::reveal_cortices();
        if let Some(feature) = reveal.output() {
            agent.bank.insert_feature(feature.clone());
        }
        agent
            .organs
            .entry(Category::Cortex)
            .or_default()
            .insert(REVEAL_CORTICES.to_string(), reveal);
        agent.refresh_cortex_names();
        agent
    }

    /// Replace the agent's generator with one seeded from `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SimRng::seed_from_u64(seed);
        self
    }

    pub fn set_rng(&mut self, rng: SimRng) {
        self.rng = rng;
    }

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<AgentId> {
        self.id
    }

    pub fn set_id(&mut self, id: AgentId) {
        self.id = Some(id);
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    pub fn mark_inert(&mut self) {
        self.inert = true;
    }

    /// Clear the inert flag and reset the age.
    pub fn revive(&mut self) {
        self.inert = false;
        self.ticks = 0;
    }

    pub fn ticks(&self) -> Tick {
        self.ticks
    }

    pub(crate) fn advance(&mut self, by: Tick) -> Tick {
        self.ticks = self.ticks.saturating_add(by);
        self.ticks
    }

    pub fn is_strict_engine(&self) -> bool {
        self.strict_engine
    }

    /// Turn strict engines on or off for every current and future organ.
    pub fn set_strict_engine(&mut self, strict: bool) {
        self.strict_engine = strict;
        for organ in self.organs.values_mut().flat_map(BTreeMap::values_mut) {
            organ.set_strict(strict);
        }
    }

    pub fn empty_to_identity(&self) -> bool {
        self.empty_to_identity
    }

    pub fn set_empty_to_identity(&mut self, on: bool) {
        self.empty_to_identity = on;
    }

    pub fn bank(&self) -> &ArrayBank {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut ArrayBank {
        &mut self.bank
    }

    pub fn essence(&self) -> Option<&Array> {
        self.bank.essence()
    }

    pub fn resource(&self) -> Option<&Array> {
        self.bank.resource()
    }

    pub fn belief(&self, name: &str) -> Option<&Array> {
        self.bank.belief(name)
    }

    fn set_kind(&mut self, array: Array, allowed: &[ArrayKind], expected: &str) -> Result<()> {
        if !allowed.contains(&array.kind()) {
            return Err(ArrayError::WrongKind {
                array: array.name().to_string(),
                expected: expected.to_string(),
                found: array.kind(),
            }
            .into());
        }
        self.bank.insert(array)
    }

    pub fn set_essence(&mut self, essence: Array) -> Result<()> {
        self.set_kind(essence, &[ArrayKind::Essence], "essence")
    }

    pub fn set_resource(&mut self, resource: Array) -> Result<()> {
        self.set_kind(resource, &[ArrayKind::Resource], "resource")
    }

    pub fn set_belief(&mut self, belief: Array) -> Result<()> {
        self.set_kind(belief, &[ArrayKind::Belief], "belief")
    }

    /// Register a buzz, direction or feature message.
    pub fn set_message(&mut self, message: Array) -> Result<()> {
        self.set_kind(
            message,
            &[ArrayKind::Buzz, ArrayKind::Direction, ArrayKind::Feature],
            "buzz, direction or feature",
        )
    }

    /// File an organ under its category and register its output message.
    pub fn add_organ(&mut self, mut organ: Instructor) -> Result<()> {
        let category = organ.kind().category();
        if self
            .organs
            .get(&category)
            .is_some_and(|slot| slot.contains_key(organ.name()))
        {
            return Err(AgentError::Duplicate {
                agent: self.name.clone(),
                category: category.to_string(),
                name: organ.name().to_string(),
            }
            .into());
        }
        if let Some(output) = organ.output() {
            self.bank.register(output)?;
        }
        if self.strict_engine {
            organ.set_strict(true);
        }
        self.organs
            .entry(category)
            .or_default()
            .insert(organ.name().to_string(), organ);
        if category == Category::Cortex {
            self.refresh_cortex_names();
        }
        Ok(())
    }

    /// Builder-style [`Agent::add_organ`].
    pub fn with_organ(mut self, organ: Instructor) -> Result<Self> {
        self.add_organ(organ)?;
        Ok(self)
    }

    pub fn organ(&self, category: Category, name: &str) -> Option<&Instructor> {
        self.organs.get(&category).and_then(|slot| slot.get(name))
    }

    pub fn organ_mut(&mut self, category: Category, name: &str) -> Option<&mut Instructor> {
        self.organs.get_mut(&category).and_then(|slot| slot.get_mut(name))
    }

    pub fn organ_names(&self, category: Category) -> Vec<&str> {
        self.organs
            .get(&category)
            .map(|slot| slot.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn refresh_cortex_names(&mut self) {
        let names: Vec<Value> = self
            .organ_names(Category::Cortex)
            .into_iter()
            .map(Value::from)
            .collect();
        if let Some(reveal) = self.organ_mut(Category::Cortex, REVEAL_CORTICES) {
            reveal.set_kwarg(CORTEX_NAMES, Value::List(names));
        }
    }

    fn add_policy<T>(
        agent: &str,
        slot: &mut BTreeMap<String, T>,
        category: &str,
        name: &str,
        policy: T,
    ) -> Result<()> {
        if slot.contains_key(name) {
            return Err(AgentError::Duplicate {
                agent: agent.to_string(),
                category: category.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        slot.insert(name.to_string(), policy);
        Ok(())
    }

    pub fn add_clause(&mut self, clause: Clause) -> Result<()> {
        let name = clause.name().to_string();
        Self::add_policy(&self.name, &mut self.clauses, "clause", &name, clause)
    }

    pub fn add_plan(&mut self, plan: Plan) -> Result<()> {
        let name = plan.name().to_string();
        Self::add_policy(&self.name, &mut self.plans, "plan", &name, plan)
    }

    pub fn add_heartbeat(&mut self, heartbeat: Heartbeat) -> Result<()> {
        let name = heartbeat.name().to_string();
        Self::add_policy(&self.name, &mut self.heartbeats, "heartbeat", &name, heartbeat)
    }

    /// Insert a heartbeat, replacing any existing one of the same name.
    pub fn set_heartbeat(&mut self, heartbeat: Heartbeat) {
        self.heartbeats.insert(heartbeat.name().to_string(), heartbeat);
    }

    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.get(name)
    }

    pub fn plan(&self, name: &str) -> Option<&Plan> {
        self.plans.get(name)
    }

    pub fn heartbeat(&self, name: &str) -> Option<&Heartbeat> {
        self.heartbeats.get(name)
    }

    /// Offer `verb(phrase)` to the whitelisted peers. Returns the token they
    /// must present.
    pub fn offer_socket(
        &mut self,
        name: impl Into<String>,
        verb: Verb,
        phrase: impl Into<String>,
        whitelist: impl IntoIterator<Item = AgentId>,
    ) -> String {
        let token = uuid::Builder::from_random_bytes(self.rng.gen())
            .into_uuid()
            .to_string();
        let socket = Socket::new(name, verb, phrase, token.clone(), whitelist);
        self.sockets.insert(socket.name().to_string(), socket);
        token
    }

    pub fn socket(&self, name: &str) -> Option<&Socket> {
        self.sockets.get(name)
    }

    pub fn socket_mut(&mut self, name: &str) -> Option<&mut Socket> {
        self.sockets.get_mut(name)
    }

    /// Run the verb bound to `socket` on behalf of `caller`.
    pub fn connect(&mut self, caller: Option<AgentId>, socket: &str, token: &str) -> Result<Outcome> {
        let bound = self
            .sockets
            .get(socket)
            .ok_or_else(|| SocketError::UnknownSocket(socket.to_string()))?;
        bound.admit(caller, token)?;
        let (verb, phrase) = (bound.verb(), bound.phrase().to_string());
        debug!(agent = %self.name, socket, verb = %verb, "socket connection admitted");
        self.perform(verb, &phrase)
    }

    fn run_organ(&mut self, category: Category, name: &str) -> Result<Outcome> {
        let organ = self
            .organs
            .get_mut(&category)
            .and_then(|slot| slot.get_mut(name))
            .ok_or_else(|| AgentError::MissingOrgan {
                agent: self.name.clone(),
                category: category.to_string(),
                name: name.to_string(),
            })?;
        debug!(agent = %self.name, category = %category, organ = name, "dispatching verb");

        let empty_to_identity = self.empty_to_identity || organ.kind().is_mutation();
        let outcome = match organ.call(&mut self.bank, self.id, &mut self.rng) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(maps) = organ.maps_mut() {
                    maps.clear();
                }
                return Err(e);
            }
        };
        if let Some(maps) = organ.maps_mut() {
            if outcome != Outcome::Completed {
                maps.clear();
            } else if let Err(e) = maps.apply_to(&mut self.bank, &mut self.rng, empty_to_identity) {
                maps.clear();
                return Err(e);
            }
        }
        Ok(outcome)
    }

    /// Apply maps filled outside the agent, such as by a system interaction.
    ///
    /// The maps are cleared when application fails.
    pub fn apply_maps(&mut self, maps: &mut MapCollection) -> Result<usize> {
        let applied = maps.apply_to(&mut self.bank, &mut self.rng, self.empty_to_identity);
        if applied.is_err() {
            maps.clear();
        }
        applied
    }

    /// Run one of the agent's own sensors.
    ///
    /// Sensing through a system interaction reaches past this agent, so it is
    /// only available through the management system's `AgentHandle`.
    pub fn sense(&mut self, name: &str) -> Result<Outcome> {
        self.run_organ(Category::Sensor, name)
    }

    pub fn interpret(&mut self, name: &str) -> Result<Outcome> {
        self.run_organ(Category::Interpreter, name)
    }

    pub fn mould(&mut self, name: &str) -> Result<Outcome> {
        self.run_organ(Category::Moulder, name)
    }

    /// Run one of the agent's own actuators.
    ///
    /// Actuating through a system interaction is only available through the
    /// management system's `AgentHandle`; here an unknown name fails with
    /// `AgentError::MissingOrgan`.
    pub fn act(&mut self, name: &str) -> Result<Outcome> {
        self.run_organ(Category::Actuator, name)
    }

    pub fn compel(&mut self, name: &str) -> Result<Outcome> {
        self.run_organ(Category::Compulsion, name)
    }

    pub fn mutate(&mut self, name: &str) -> Result<Outcome> {
        self.run_organ(Category::Mutation, name)
    }

    /// Query a cortex and return the feature it revealed.
    pub fn tickle(&mut self, name: &str) -> Result<Outcome> {
        let outcome = self.run_organ(Category::Cortex, name)?;
        if outcome != Outcome::Completed {
            return Ok(outcome);
        }
        let feature = self
            .organ(Category::Cortex, name)
            .and_then(Instructor::output_ref)
            .and_then(|r| self.bank.array_mut(&r));
        match feature {
            Some(feature) => {
                let values = feature.snapshot();
                feature.clear();
                Ok(Outcome::Feature(values))
            }
            None => Ok(Outcome::Feature(Vec::new())),
        }
    }

    pub fn pronounce(&mut self, name: &str) -> Result<bool> {
        let clause = self
            .clauses
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::MissingClause(name.to_string()))?;
        clause.pronounce(self)
    }

    pub fn enact(&mut self, name: &str) -> Result<bool> {
        let plan = self
            .plans
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::MissingPlan(name.to_string()))?;
        plan.enact(self)
    }

    pub fn pump(&mut self, name: &str) -> Result<bool> {
        let heartbeat = self
            .heartbeats
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::MissingHeartbeat(name.to_string()))?;
        heartbeat.pump(self)
    }

    /// Pump every heartbeat; true only if the agent survives all of them.
    pub fn pump_all(&mut self) -> Result<bool> {
        let heartbeats: Vec<Heartbeat> = self.heartbeats.values().cloned().collect();
        let mut viable = !self.inert;
        for heartbeat in heartbeats {
            viable &= heartbeat.pump(self)?;
        }
        Ok(viable)
    }
}

impl Executive for Agent {
    fn perform(&mut self, verb: Verb, phrase: &str) -> Result<Outcome> {
        match verb {
            Verb::Sense => self.sense(phrase),
            Verb::Interpret => self.interpret(phrase),
            Verb::Mould => self.mould(phrase),
            Verb::Act => self.act(phrase),
            Verb::Tickle => self.tickle(phrase),
            Verb::Compel => self.compel(phrase),
            Verb::Mutate => self.mutate(phrase),
            Verb::Pronounce => self.pronounce(phrase).map(Outcome::Verdict),
            Verb::Enact => self.enact(phrase).map(Outcome::Verdict),
            Verb::Pump if phrase.is_empty() => self.pump_all().map(Outcome::Verdict),
            Verb::Pump => self.pump(phrase).map(Outcome::Verdict),
        }
    }

    fn arrays(&self) -> Result<&ArrayBank> {
        Ok(&self.bank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnimusError, EngineError};
    use crate::instructor::Engine;
    use crate::operator::{ArrayOperator, ArrayRef};
    use crate::scaffold::ScaffoldMap;

    fn forager() -> Agent {
        let mut agent = Agent::new("forager").with_seed(7);
        agent
            .set_resource(Array::resource("stock", ["energy"]).unwrap().with_values([10.0]).unwrap())
            .unwrap();
        let engine = Engine::new(|_args| Ok::<_, EngineError>((3, -1.0)));
        let eye = Instructor::sensor("eye", engine)
            .with_output(Array::buzz("light", ["lux"]).unwrap())
            .unwrap()
            .with_maps(ScaffoldMap::resource("energy", "delta", ["cost"]).unwrap())
            .unwrap();
        agent.add_organ(eye).unwrap();
        agent
    }

    fn energy(agent: &Agent) -> Value {
        agent.resource().unwrap().peek("energy").unwrap().clone()
    }

    #[test]
    fn sensing_fills_the_buzz_and_pays_through_the_map() {
        let mut agent = forager();
        assert_eq!(agent.sense("eye").unwrap(), Outcome::Completed);
        assert_eq!(agent.bank().buzz("light").unwrap().snapshot(), vec![Value::Int(3)]);
        assert_eq!(energy(&agent), Value::Float(9.0));
    }

    #[test]
    fn captured_failures_leave_the_resource_alone() {
        let mut agent = forager();
        let engine = Engine::new(|_args| Err::<(), _>(EngineError::new("blind")));
        let broken = Instructor::sensor("broken", engine)
            .with_maps(ScaffoldMap::resource("energy", "delta", ["cost"]).unwrap())
            .unwrap();
        agent.add_organ(broken).unwrap();

        let outcome = agent.sense("broken").unwrap();
        assert!(outcome.captured().is_some());
        assert_eq!(energy(&agent), Value::Float(10.0));
    }

    fn drifting(fail_on: &'static str) -> Agent {
        let mut agent = forager();
        agent
            .set_essence(Array::essence("traits", ["t1", "t2", "t3"]).unwrap().with_values([1.0, 2.0, 3.0]).unwrap())
            .unwrap();
        let maps = MapCollection::new(vec![
            ScaffoldMap::essence("t1", "delta", ["d"]).unwrap(),
            ScaffoldMap::essence("t2", "delta", ["d"]).unwrap(),
            ScaffoldMap::essence("t3", "delta", ["d"]).unwrap(),
        ])
        .unwrap();
        let engine = Engine::new(move |args| {
            if args.target_key == Some(fail_on) {
                return Err(EngineError::new("drift stalled"));
            }
            Ok::<_, EngineError>(0.5)
        });
        agent
            .add_organ(Instructor::multi_mutation("drift", engine, maps, 1.0).unwrap())
            .unwrap();
        agent
    }

    fn drift_is_clear(agent: &Agent) -> bool {
        agent
            .organ(Category::Mutation, "drift")
            .and_then(Instructor::maps)
            .is_some_and(MapCollection::is_empty)
    }

    #[test]
    fn failed_multi_mutation_clears_every_map() {
        let mut agent = drifting("t2");
        let outcome = agent.mutate("drift").unwrap();
        assert!(outcome.captured().is_some());
        assert!(drift_is_clear(&agent), "t1 was filled before t2 failed");
        assert_eq!(
            agent.essence().unwrap().snapshot(),
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]
        );

        let mut strict = drifting("t3");
        strict.set_strict_engine(true);
        assert_eq!(
            strict.mutate("drift").unwrap_err(),
            AnimusError::Engine(EngineError::new("drift stalled"))
        );
        assert!(drift_is_clear(&strict));
        assert_eq!(
            strict.essence().unwrap().snapshot(),
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]
        );

        let mut healthy = drifting("none");
        assert_eq!(healthy.mutate("drift").unwrap(), Outcome::Completed);
        assert_eq!(
            healthy.essence().unwrap().snapshot(),
            vec![Value::Float(1.5), Value::Float(2.5), Value::Float(3.5)]
        );
    }

    #[test]
    fn strict_mode_applies_to_existing_organs() {
        let mut agent = forager();
        let engine = Engine::new(|_args| Err::<(), _>(EngineError::new("blind")));
        agent.add_organ(Instructor::sensor("broken", engine)).unwrap();
        agent.set_strict_engine(true);
        let err = agent.sense("broken").unwrap_err();
        assert_eq!(err, AnimusError::Engine(EngineError::new("blind")));
    }

    #[test]
    fn missing_and_duplicate_organs() {
        let mut agent = forager();
        assert!(matches!(
            agent.act("legs"),
            Err(AnimusError::Agent(AgentError::MissingOrgan { .. }))
        ));
        let again = Instructor::sensor("eye", Engine::new(|_args| Ok::<_, EngineError>(())));
        assert!(matches!(
            agent.add_organ(again),
            Err(AnimusError::Agent(AgentError::Duplicate { .. }))
        ));
    }

    #[test]
    fn builtin_cortex_reveals_every_cortex() {
        let mut agent = forager();
        let mirror = Instructor::cortex(
            "mirror",
            Engine::new(|args| Ok::<_, EngineError>(args.resource_f64(0)?)),
            Array::feature("glow", ["level"]).unwrap(),
        )
        .unwrap()
        .with_input(ArrayOperator::identity(ArrayRef::Resource))
        .unwrap()
        .with_resource(ArrayOperator::identity(ArrayRef::Resource))
        .unwrap();
        agent.add_organ(mirror).unwrap();

        let revealed = agent.tickle(REVEAL_CORTICES).unwrap();
        assert_eq!(
            revealed,
            Outcome::Feature(vec![Value::List(vec![
                Value::from("mirror"),
                Value::from(REVEAL_CORTICES),
            ])])
        );
        assert_eq!(agent.tickle("mirror").unwrap(), Outcome::Feature(vec![Value::Float(10.0)]));
        assert!(agent.bank().feature("glow").unwrap().is_empty());
    }

    #[test]
    fn sockets_run_their_verb_for_whitelisted_callers() {
        let mut agent = forager();
        let friend = AgentId::new();
        let token = agent.offer_socket("feed", Verb::Sense, "eye", [friend]);

        assert_eq!(agent.connect(Some(friend), "feed", &token).unwrap(), Outcome::Completed);
        assert_eq!(energy(&agent), Value::Float(9.0));
        assert!(matches!(
            agent.connect(Some(friend), "feed", "wrong"),
            Err(AnimusError::Socket(SocketError::BadToken(_)))
        ));
        assert!(matches!(
            agent.connect(Some(friend), "nope", &token),
            Err(AnimusError::Socket(SocketError::UnknownSocket(_)))
        ));
        assert_eq!(energy(&agent), Value::Float(9.0));
    }

    #[test]
    fn revive_resets_age() {
        let mut agent = forager();
        agent.add_heartbeat(Heartbeat::new("age").with_max_ticker(0)).unwrap();
        assert!(!agent.pump("age").unwrap());
        agent.revive();
        assert!(!agent.is_inert());
        assert_eq!(agent.ticks(), 0);
    }
}
