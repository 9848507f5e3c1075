//! Plans: binary execution trees over verbs.
//!
//! Nodes live in an arena and are addressed by index. Each edge carries a
//! polarity; after a node's verb runs, the edge whose polarity matches the
//! verb's truth value is followed. A plan must be stamped and approved
//! before it can be enacted.

use crate::error::{PolicyError, Result};
use crate::executive::{Executive, Verb};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    pub verb: Verb,
    pub phrase: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlanEdge {
    parent: usize,
    child: usize,
    polarity: bool,
}

/// The path taken by one enactment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    /// Node indices in visiting order; the last one is where traversal stopped.
    pub path: Vec<usize>,
    /// Truth value of the last node's verb.
    pub result: bool,
}

impl Traversal {
    pub fn last(&self) -> Option<usize> {
        self.path.last().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    name: String,
    nodes: Vec<PlanNode>,
    edges: Vec<PlanEdge>,
    root: Option<usize>,
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            root: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self, idx: usize) -> Option<&PlanNode> {
        self.nodes.get(idx)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node and return its index. Any previous approval is revoked.
    pub fn add_node(&mut self, verb: Verb, phrase: impl Into<String>) -> usize {
        self.root = None;
        self.nodes.push(PlanNode {
            verb,
            phrase: phrase.into(),
        });
        self.nodes.len() - 1
    }

    /// Connect `parent` to `child`, followed when `parent` yields `polarity`.
    pub fn add_edge(&mut self, parent: usize, child: usize, polarity: bool) -> Result<()> {
        for node in [parent, child] {
            if node >= self.nodes.len() {
                return Err(PolicyError::UnknownNode {
                    plan: self.name.clone(),
                    node,
                }
                .into());
            }
        }
        self.root = None;
        self.edges.push(PlanEdge {
            parent,
            child,
            polarity,
        });
        Ok(())
    }

    pub fn is_stamped(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<usize> {
        self.root
    }

    fn not_a_tree(&self, reason: impl Into<String>) -> PolicyError {
        PolicyError::NotATree {
            plan: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Check the plan is a binary tree and fix its root.
    ///
    /// Every node but the root has exactly one parent, each parent has at most
    /// one edge per polarity, and every node is reachable from the root.
    pub fn stamp_and_approve(&mut self) -> Result<()> {
        self.root = None;
        if self.nodes.is_empty() {
            return Err(self.not_a_tree("no nodes").into());
        }

        let mut in_degree = vec![0usize; self.nodes.len()];
        for edge in &self.edges {
            in_degree[edge.child] += 1;
        }
        if let Some(node) = in_degree.iter().position(|&d| d > 1) {
            return Err(self.not_a_tree(format!("node {} has several parents", node)).into());
        }
        let roots: Vec<usize> = (0..self.nodes.len()).filter(|&n| in_degree[n] == 0).collect();
        if roots.len() != 1 {
            return Err(self.not_a_tree(format!("{} candidate roots", roots.len())).into());
        }
        for (i, a) in self.edges.iter().enumerate() {
            if self.edges[i + 1..]
                .iter()
                .any(|b| b.parent == a.parent && b.polarity == a.polarity)
            {
                return Err(self
                    .not_a_tree(format!("node {} has two {} edges", a.parent, a.polarity))
                    .into());
            }
        }

        let root = roots[0];
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut seen[node], true) {
                continue;
            }
            stack.extend(self.edges.iter().filter(|e| e.parent == node).map(|e| e.child));
        }
        if let Some(node) = seen.iter().position(|s| !s) {
            return Err(self.not_a_tree(format!("node {} is unreachable", node)).into());
        }

        self.root = Some(root);
        Ok(())
    }

    /// Walk the tree from the root, performing each node's verb.
    ///
    /// Traversal stops at a leaf. A node with children but no edge matching
    /// its result is a dangling polarity.
    pub fn traverse<E: Executive + ?Sized>(&self, exec: &mut E) -> Result<Traversal> {
        let mut node = self.root.ok_or_else(|| PolicyError::NotStamped(self.name.clone()))?;
        let mut path = Vec::new();
        loop {
            let step = &self.nodes[node];
            debug!(plan = %self.name, node, verb = %step.verb, phrase = %step.phrase, "plan step");
            let result = exec.perform(step.verb, &step.phrase)?.is_true();
            path.push(node);

            let mut children = self.edges.iter().filter(|e| e.parent == node).peekable();
            if children.peek().is_none() {
                return Ok(Traversal { path, result });
            }
            match children.find(|e| e.polarity == result) {
                Some(edge) => node = edge.child,
                None => {
                    return Err(PolicyError::DanglingPolarity {
                        plan: self.name.clone(),
                        node,
                        result,
                    }
                    .into())
                }
            }
        }
    }

    /// Enact the plan, returning the truth value of the node it stopped at.
    pub fn enact<E: Executive + ?Sized>(&self, exec: &mut E) -> Result<bool> {
        self.traverse(exec).map(|t| t.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::ArrayBank;
    use crate::error::AnimusError;
    use crate::executive::Outcome;

    struct Script(Vec<bool>, ArrayBank);

    impl Executive for Script {
        fn perform(&mut self, _verb: Verb, _phrase: &str) -> Result<Outcome> {
            Ok(Outcome::Verdict(self.0.remove(0)))
        }

        fn arrays(&self) -> Result<&ArrayBank> {
            Ok(&self.1)
        }
    }

    fn diamond_free_plan() -> Plan {
        let mut plan = Plan::new("p");
        let root = plan.add_node(Verb::Pronounce, "root");
        let yes = plan.add_node(Verb::Pronounce, "yes");
        let no = plan.add_node(Verb::Pronounce, "no");
        plan.add_edge(root, yes, true).unwrap();
        plan.add_edge(root, no, false).unwrap();
        plan
    }

    #[test]
    fn unstamped_plans_refuse_to_run() {
        let plan = diamond_free_plan();
        let err = plan.enact(&mut Script(vec![true, true], ArrayBank::new())).unwrap_err();
        assert_eq!(err, AnimusError::Policy(PolicyError::NotStamped("p".into())));
    }

    #[test]
    fn polarity_picks_the_branch() {
        let mut plan = diamond_free_plan();
        plan.stamp_and_approve().unwrap();
        let t = plan.traverse(&mut Script(vec![false, true], ArrayBank::new())).unwrap();
        assert_eq!(t.path, vec![0, 2]);
        assert!(t.result);
    }

    #[test]
    fn two_parents_is_not_a_tree() {
        let mut plan = diamond_free_plan();
        let last = plan.add_node(Verb::Sense, "eye");
        plan.add_edge(1, last, true).unwrap();
        plan.add_edge(2, last, true).unwrap();
        assert!(matches!(
            plan.stamp_and_approve(),
            Err(AnimusError::Policy(PolicyError::NotATree { .. }))
        ));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut plan = Plan::new("loop");
        let a = plan.add_node(Verb::Sense, "a");
        let b = plan.add_node(Verb::Sense, "b");
        let c = plan.add_node(Verb::Sense, "c");
        plan.add_edge(a, b, true).unwrap();
        plan.add_edge(b, c, true).unwrap();
        plan.add_edge(c, b, false).unwrap();
        assert!(plan.stamp_and_approve().is_err());
    }

    #[test]
    fn missing_branch_is_a_dangling_polarity() {
        let mut plan = Plan::new("half");
        let root = plan.add_node(Verb::Sense, "eye");
        let next = plan.add_node(Verb::Act, "leg");
        plan.add_edge(root, next, true).unwrap();
        plan.stamp_and_approve().unwrap();
        let err = plan.enact(&mut Script(vec![false], ArrayBank::new())).unwrap_err();
        assert_eq!(
            err,
            AnimusError::Policy(PolicyError::DanglingPolarity {
                plan: "half".into(),
                node: 0,
                result: false,
            })
        );
    }

    #[test]
    fn adding_nodes_revokes_approval() {
        let mut plan = diamond_free_plan();
        plan.stamp_and_approve().unwrap();
        plan.add_node(Verb::Sense, "late");
        assert!(!plan.is_stamped());
    }
}
