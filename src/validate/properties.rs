use tracing::warn;

use crate::{
    automaton::{LabelingMode, SourceMap},
    body::{Edge, State},
    error::ValidationErrorKind,
    header::{Header, Property},
    options::{ParseOptions, UnknownPropertyPolicy},
};

#[cfg(feature = "bdd")]
use crate::formula::bdd::LabelSpace;

use super::Findings;

fn edges(states: &[State]) -> impl Iterator<Item = (&State, &Edge)> + '_ {
    states
        .iter()
        .flat_map(|state| state.edges.iter().map(move |edge| (state, edge)))
}

/// Checks the declared properties against the automaton. Properties describing the
/// placement of labels and acceptance sets are always checked, structural ones only if
/// enabled in `options`. Properties that cannot be checked syntactically (like
/// `unambiguous` or `weak`) are taken at face value.
pub(super) fn check(
    header: &Header,
    states: &[State],
    positions: &SourceMap,
    options: &ParseOptions,
    labeling: LabelingMode,
    findings: &mut Findings,
) {
    let structural = options.check_properties();
    for property in header.properties.iter() {
        let reason = match property {
            Property::StateLabels => state_labels(states),
            Property::TransLabels => trans_labels(states),
            Property::ImplicitLabels => implicit_labels(header, states, labeling),
            Property::ExplicitLabels => (labeling == LabelingMode::Implicit
                && edges(states).next().is_some())
            .then(|| "no label is given explicitly".to_string()),
            Property::StateAcc => edges(states)
                .find(|(_, edge)| edge.acceptance.is_some())
                .map(|(state, _)| {
                    format!("an edge of state {} carries acceptance sets", state.index)
                }),
            Property::TransAcc => states
                .iter()
                .find(|state| state.acceptance.is_some())
                .map(|state| format!("state {} carries acceptance sets", state.index)),
            Property::NoUnivBranch if structural => universal_branching(header, states),
            Property::Deterministic if structural => nondeterminism(header, states, labeling),
            Property::Complete if structural => incompleteness(header, states, labeling),
            Property::Unknown(name) => {
                match options.unknown_properties() {
                    UnknownPropertyPolicy::Preserve => {}
                    UnknownPropertyPolicy::Warn => warn!("ignoring unknown property `{name}`"),
                    UnknownPropertyPolicy::Reject => findings.push(
                        ValidationErrorKind::UnknownProperty { name: name.clone() },
                        positions.header.properties,
                    ),
                }
                None
            }
            _ => None,
        };

        if let Some(reason) = reason {
            findings.push(
                ValidationErrorKind::PropertyViolation {
                    property: property.clone(),
                    reason,
                },
                positions.header.properties,
            );
        }
    }
}

fn state_labels(states: &[State]) -> Option<String> {
    if let Some((state, _)) = edges(states).find(|(_, edge)| edge.label.is_some()) {
        return Some(format!("an edge of state {} is labeled", state.index));
    }
    states
        .iter()
        .find(|state| state.label.is_none())
        .map(|state| format!("state {} has no label", state.index))
}

fn trans_labels(states: &[State]) -> Option<String> {
    if let Some(state) = states.iter().find(|state| state.label.is_some()) {
        return Some(format!("state {} is labeled", state.index));
    }
    edges(states)
        .find(|(_, edge)| edge.label.is_none())
        .map(|(state, _)| format!("an edge of state {} has no label", state.index))
}

/// With implicit labels the edges of a state correspond to the valuations of the atomic
/// propositions, so every state with edges needs one edge per valuation.
fn implicit_labels(header: &Header, states: &[State], labeling: LabelingMode) -> Option<String> {
    if labeling != LabelingMode::Implicit {
        return Some("the automaton carries explicit labels".to_string());
    }
    let expected = 1usize.checked_shl(header.ap_count)?;
    states
        .iter()
        .find(|state| !state.edges.is_empty() && state.edges.len() != expected)
        .map(|state| {
            format!(
                "state {} has {} edges, but {expected} are needed for implicit labels",
                state.index,
                state.edges.len()
            )
        })
}

fn universal_branching(header: &Header, states: &[State]) -> Option<String> {
    if header.start.iter().any(|start| start.get_singleton().is_none()) {
        return Some("a start state is a conjunction".to_string());
    }
    edges(states)
        .find(|(_, edge)| edge.target.get_singleton().is_none())
        .map(|(state, _)| format!("an edge of state {} leads to a conjunction", state.index))
}

fn nondeterminism(header: &Header, states: &[State], labeling: LabelingMode) -> Option<String> {
    if header.start.len() > 1 {
        return Some(format!("there are {} start states", header.start.len()));
    }
    if let Some(reason) = universal_branching(header, states) {
        return Some(reason);
    }
    match labeling {
        LabelingMode::State => states
            .iter()
            .find(|state| state.edges.len() > 1)
            .map(|state| {
                format!(
                    "state {} has {} edges which all share its label",
                    state.index,
                    state.edges.len()
                )
            }),
        LabelingMode::Transition => overlapping_labels(header, states),
        LabelingMode::Implicit => None,
    }
}

#[cfg(feature = "bdd")]
fn overlapping_labels(header: &Header, states: &[State]) -> Option<String> {
    let space = LabelSpace::new(header.ap_count, &header.aliases)?;
    for state in states {
        let Some(labels) = state
            .edges
            .iter()
            .map(|edge| space.encode(edge.label.as_ref()?))
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };
        if let Some((i, j)) = space.first_overlap(&labels) {
            return Some(format!(
                "the labels of edges {i} and {j} of state {} overlap",
                state.index
            ));
        }
    }
    None
}

#[cfg(not(feature = "bdd"))]
fn overlapping_labels(_header: &Header, _states: &[State]) -> Option<String> {
    None
}

fn incompleteness(header: &Header, states: &[State], labeling: LabelingMode) -> Option<String> {
    if let Some(state) = states.iter().find(|state| state.edges.is_empty()) {
        return Some(format!("state {} has no outgoing edges", state.index));
    }
    uncovered_valuations(header, states, labeling)
}

#[cfg(feature = "bdd")]
fn uncovered_valuations(
    header: &Header,
    states: &[State],
    labeling: LabelingMode,
) -> Option<String> {
    let space = LabelSpace::new(header.ap_count, &header.aliases)?;
    for state in states {
        let labels = match labeling {
            LabelingMode::State => state.label.iter().map(|label| space.encode(label)).collect(),
            LabelingMode::Transition => state
                .edges
                .iter()
                .map(|edge| space.encode(edge.label.as_ref()?))
                .collect::<Option<Vec<_>>>(),
            LabelingMode::Implicit => Some(vec![space.tautology()]),
        };
        if let Some(labels) = labels {
            if !space.covers(&labels) {
                return Some(format!(
                    "the edges of state {} do not cover all valuations",
                    state.index
                ));
            }
        }
    }
    None
}

#[cfg(not(feature = "bdd"))]
fn uncovered_valuations(
    _header: &Header,
    _states: &[State],
    _labeling: LabelingMode,
) -> Option<String> {
    None
}
