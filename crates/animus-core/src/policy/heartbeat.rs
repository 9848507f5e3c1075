//! Heartbeats: age tickers with survival conditions.

use super::condition::AutoCondition;
use crate::agent::Agent;
use crate::error::Result;
use crate::types::Tick;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Heartbeat {
    name: String,
    conditions: Vec<AutoCondition>,
    ticker: Tick,
    max_ticker: Option<Tick>,
}

impl Heartbeat {
    /// A heartbeat ticking by one with no age limit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
            ticker: 1,
            max_ticker: None,
        }
    }

    pub fn with_ticker(mut self, ticker: Tick) -> Self {
        self.ticker = ticker;
        self
    }

    pub fn with_max_ticker(mut self, max: Tick) -> Self {
        self.max_ticker = Some(max);
        self
    }

    pub fn with_condition(mut self, condition: AutoCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ticker(&self) -> Tick {
        self.ticker
    }

    pub fn max_ticker(&self) -> Option<Tick> {
        self.max_ticker
    }

    /// Advance the agent's age by one beat.
    ///
    /// Every condition is checked first; a false one marks the agent inert.
    /// The agent also turns inert once its age exceeds the limit. Returns
    /// whether the agent is still viable.
    pub fn pump(&self, agent: &mut Agent) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.evaluate(agent.bank())? {
                debug!(heartbeat = %self.name, agent = agent.name(), "survival condition failed");
                agent.mark_inert();
            }
        }
        let ticks = agent.advance(self.ticker);
        if self.max_ticker.is_some_and(|max| ticks > max) {
            debug!(heartbeat = %self.name, agent = agent.name(), ticks, "age limit exceeded");
            agent.mark_inert();
        }
        Ok(!agent.is_inert())
    }
}
