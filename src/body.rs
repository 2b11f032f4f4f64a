use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;

use crate::{formula::Formula, math::OrderedSet};

pub(crate) mod parser;

/// A non-empty conjunction of states. Ordinary automata only use singletons, alternating
/// automata use conjunctions like `0 & 2` to branch universally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateConjunction(pub(crate) Vec<u32>);

impl StateConjunction {
    /// Creates a conjunction of the given states. Returns `None` if `states` is empty.
    pub fn new<I: IntoIterator<Item = u32>>(states: I) -> Option<Self> {
        let states: Vec<_> = states.into_iter().collect();
        if states.is_empty() {
            None
        } else {
            Some(Self(states))
        }
    }

    /// A conjunction consisting only of `state`.
    pub fn singleton(state: u32) -> Self {
        Self(vec![state])
    }

    /// If `self` is a singleton, returns the state it consists of.
    pub fn get_singleton(&self) -> Option<u32> {
        match self.0.as_slice() {
            [state] => Some(*state),
            _ => None,
        }
    }

    /// The states in the order they were written.
    pub fn states(&self) -> &[u32] {
        &self.0
    }
}

impl From<u32> for StateConjunction {
    fn from(value: u32) -> Self {
        Self::singleton(value)
    }
}

impl Display for StateConjunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0.iter().join(" & "))
    }
}

/// The acceptance sets a state or an edge belongs to, written as `{0 3}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AcceptanceSignature(OrderedSet<u32>);

impl AcceptanceSignature {
    /// An empty signature.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds the acceptance set `set`.
    pub fn insert(&mut self, set: u32) {
        self.0.insert(set);
    }

    /// Returns `true` if the acceptance set `set` is part of the signature.
    pub fn contains(&self, set: u32) -> bool {
        self.0.contains(&set)
    }

    /// Iterates over the acceptance sets in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// The number of acceptance sets in the signature.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the signature contains no acceptance set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u32> for AcceptanceSignature {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for AcceptanceSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{{{}}}", self.iter().join(" "))
    }
}

/// An edge leaving a [`State`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub(crate) target: StateConjunction,
    pub(crate) label: Option<Formula>,
    pub(crate) acceptance: Option<AcceptanceSignature>,
}

impl Edge {
    /// Creates an unlabeled edge to `target` without acceptance signature.
    pub fn new<T: Into<StateConjunction>>(target: T) -> Self {
        Self {
            target: target.into(),
            label: None,
            acceptance: None,
        }
    }

    /// Sets the label.
    pub fn with_label(mut self, label: Formula) -> Self {
        self.label = Some(label);
        self
    }

    /// Sets the acceptance signature.
    pub fn with_acceptance<I: IntoIterator<Item = u32>>(mut self, sets: I) -> Self {
        self.acceptance = Some(sets.into_iter().collect());
        self
    }

    /// The target, a singleton unless the automaton branches universally.
    pub fn target(&self) -> &StateConjunction {
        &self.target
    }

    /// The label, if the edge carries one.
    pub fn label(&self) -> Option<&Formula> {
        self.label.as_ref()
    }

    /// The acceptance signature, if the edge carries one.
    pub fn acceptance(&self) -> Option<&AcceptanceSignature> {
        self.acceptance.as_ref()
    }
}

/// A state together with its outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    pub(crate) index: u32,
    pub(crate) name: Option<String>,
    pub(crate) label: Option<Formula>,
    pub(crate) acceptance: Option<AcceptanceSignature>,
    pub(crate) edges: Vec<Edge>,
}

impl State {
    /// Creates a state with the given index and nothing else.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            name: None,
            label: None,
            acceptance: None,
            edges: vec![],
        }
    }

    /// Sets the display name.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the label.
    pub fn with_label(mut self, label: Formula) -> Self {
        self.label = Some(label);
        self
    }

    /// Sets the acceptance signature.
    pub fn with_acceptance<I: IntoIterator<Item = u32>>(mut self, sets: I) -> Self {
        self.acceptance = Some(sets.into_iter().collect());
        self
    }

    /// Appends an outgoing edge.
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// The index of the state.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The display name, if there is one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The label, present if and only if the automaton is state-labeled.
    pub fn label(&self) -> Option<&Formula> {
        self.label.as_ref()
    }

    /// The acceptance signature, if the state carries one.
    pub fn acceptance(&self) -> Option<&AcceptanceSignature> {
        self.acceptance.as_ref()
    }

    /// The outgoing edges in the order they were listed.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_are_sets() {
        let sig: AcceptanceSignature = [3, 0, 3].into_iter().collect();
        assert_eq!(sig.len(), 2);
        assert!(sig.contains(3));
        assert!(!sig.contains(1));
        assert_eq!(sig.to_string(), "{0 3}");
        assert_eq!(sig, AcceptanceSignature::from_iter([0, 3]));
        assert_eq!(AcceptanceSignature::empty().to_string(), "{}");

        let mut sparse = AcceptanceSignature::empty();
        sparse.insert(u32::MAX);
        sparse.insert(7);
        assert_eq!(sparse.iter().collect::<Vec<_>>(), vec![7, u32::MAX]);
        assert_eq!(sparse.to_string(), "{7 4294967295}");
    }

    #[test]
    fn conjunctions() {
        assert!(StateConjunction::new([]).is_none());
        let conj = StateConjunction::new([0, 2]).unwrap();
        assert_eq!(conj.get_singleton(), None);
        assert_eq!(conj.to_string(), "0 & 2");
        assert_eq!(StateConjunction::from(4).get_singleton(), Some(4));
    }
}
