//! Clauses: named verb sequences.

use super::condition::AutoCondition;
use crate::error::Result;
use crate::executive::{Executive, Verb};
use tracing::debug;

/// An ordered list of verbs, optionally judged by an auto-condition.
#[derive(Debug, Clone)]
pub struct Clause {
    name: String,
    steps: Vec<(Verb, String)>,
    condition: Option<AutoCondition>,
}

impl Clause {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            condition: None,
        }
    }

    /// Build a clause from `(verb, phrase)` pairs, verbs given by name.
    pub fn from_pairs<'a, I>(name: impl Into<String>, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut clause = Self::new(name);
        for (verb, phrase) in pairs {
            clause.steps.push((verb.parse()?, phrase.to_string()));
        }
        Ok(clause)
    }

    pub fn with_step(mut self, verb: Verb, phrase: impl Into<String>) -> Self {
        self.steps.push((verb, phrase.into()));
        self
    }

    pub fn with_condition(mut self, condition: AutoCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[(Verb, String)] {
        &self.steps
    }

    /// Perform every step in order.
    ///
    /// Without a condition the verdict is the conjunction of the step
    /// outcomes; with one, it is the condition evaluated afterwards.
    pub fn pronounce<E: Executive + ?Sized>(&self, exec: &mut E) -> Result<bool> {
        debug!(clause = %self.name, steps = self.steps.len(), "pronouncing clause");
        let mut verdict = true;
        for (verb, phrase) in &self.steps {
            verdict &= exec.perform(*verb, phrase)?.is_true();
        }
        match &self.condition {
            Some(condition) => condition.evaluate(exec.arrays()?),
            None => Ok(verdict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::bank::ArrayBank;
    use crate::error::{AnimusError, PolicyError};
    use crate::executive::Outcome;

    /// Records the verbs it is asked to perform and answers from a script.
    struct Script {
        answers: Vec<bool>,
        performed: Vec<(Verb, String)>,
        bank: ArrayBank,
    }

    impl Executive for Script {
        fn perform(&mut self, verb: Verb, phrase: &str) -> Result<Outcome> {
            self.performed.push((verb, phrase.to_string()));
            Ok(Outcome::Verdict(self.answers.remove(0)))
        }

        fn arrays(&self) -> Result<&ArrayBank> {
            Ok(&self.bank)
        }
    }

    fn script(answers: Vec<bool>) -> Script {
        let mut bank = ArrayBank::new();
        bank.insert(Array::belief("joy", ["joy_index"]).unwrap().with_values([2]).unwrap())
            .unwrap();
        Script {
            answers,
            performed: Vec::new(),
            bank,
        }
    }

    #[test]
    fn every_step_runs_even_after_a_false_one() {
        let clause = Clause::from_pairs("routine", [("sense", "eye"), ("interpret", "score")]).unwrap();
        let mut exec = script(vec![false, true]);
        assert!(!clause.pronounce(&mut exec).unwrap());
        assert_eq!(exec.performed.len(), 2);
        assert_eq!(exec.performed[1], (Verb::Interpret, "score".to_string()));
    }

    #[test]
    fn condition_overrides_the_conjunction() {
        let clause = Clause::new("happy")
            .with_step(Verb::Sense, "eye")
            .with_condition(AutoCondition::belief("joy", "joy_index", |v| v[0].as_i64() > Some(0)).unwrap());
        let mut exec = script(vec![false]);
        assert!(clause.pronounce(&mut exec).unwrap());
    }

    #[test]
    fn unknown_verbs_fail_at_construction() {
        let err = Clause::from_pairs("bad", [("juggle", "balls")]).unwrap_err();
        assert_eq!(err, AnimusError::Policy(PolicyError::UnknownVerb("juggle".into())));
    }
}
