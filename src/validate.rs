//! Semantic checks that run before an [`crate::Automaton`] is sealed.
//!
//! The checks are grouped into stages which run in a fixed order. Within a stage every
//! problem is reported, but the first stage that finds a problem ends validation, since later
//! stages rely on the guarantees of earlier ones (alias resolution for example assumes that
//! all proposition indices are in range).

use tracing::debug;

use crate::{
    automaton::{AcceptancePlacement, LabelingMode, SourceMap},
    body::{AcceptanceSignature, State},
    error::{Cardinality, Error, ErrorReport, RangeKind, ValidationError, ValidationErrorKind},
    formula::{Formula, FormulaContext},
    header::Header,
    lexer::Position,
    math::{Map, Set},
    options::ParseOptions,
};

mod properties;

/// Collects the errors of one validation stage.
#[derive(Debug, Default)]
pub(crate) struct Findings(Vec<ValidationError>);

impl Findings {
    pub fn push(&mut self, kind: ValidationErrorKind, position: Option<Position>) {
        self.0.push(ValidationError::new(kind, position));
    }

    fn conclude(self, stage: &str) -> Result<(), ErrorReport> {
        let count = self.0.len();
        let mut errors = self.0.into_iter().map(Error::from);
        match errors.next() {
            None => Ok(()),
            Some(first) => {
                debug!("{stage} check failed with {count} errors");
                Err(ErrorReport::new(first, errors))
            }
        }
    }
}

/// All label formulas of an automaton together with the position they were defined at:
/// alias definitions first, then state labels and edge labels in input order.
fn labels<'a>(
    header: &'a Header,
    states: &'a [State],
    positions: &'a SourceMap,
) -> impl Iterator<Item = (&'a Formula, Option<Position>)> + 'a {
    let aliases = header
        .aliases
        .values()
        .enumerate()
        .map(|(i, formula)| (formula, positions.header.aliases.get(i).copied()));
    let bodies = states.iter().enumerate().flat_map(move |(i, state)| {
        let state_label = state
            .label
            .as_ref()
            .map(|label| (label, positions.state(i)));
        let edge_labels = state
            .edges
            .iter()
            .enumerate()
            .filter_map(move |(j, edge)| Some((edge.label.as_ref()?, positions.edge(i, j))));
        state_label.into_iter().chain(edge_labels)
    });
    aliases.chain(bodies)
}

/// Runs all validation stages and, if they pass, returns where labels and acceptance sets
/// are placed.
pub(crate) fn validate(
    header: &Header,
    states: &[State],
    positions: &SourceMap,
    options: &ParseOptions,
) -> Result<(LabelingMode, AcceptancePlacement), ErrorReport> {
    check_ranges(header, states, positions).conclude("range")?;
    check_aliases(header, states, positions).conclude("alias")?;

    let mut findings = Findings::default();
    let labeling = labeling_mode(states, positions, &mut findings);
    let placement = acceptance_placement(states, positions, &mut findings);
    if findings.0.is_empty() {
        properties::check(header, states, positions, options, labeling, &mut findings);
    }
    findings.conclude("consistency")?;

    check_cardinality(header, states, positions).conclude("cardinality")?;
    Ok((labeling, placement))
}

fn check_signature(
    signature: Option<&AcceptanceSignature>,
    sets: u32,
    position: Option<Position>,
    findings: &mut Findings,
) {
    for set in signature.into_iter().flat_map(AcceptanceSignature::iter) {
        if set >= sets {
            findings.push(
                ValidationErrorKind::RangeViolation {
                    kind: RangeKind::AcceptanceSet,
                    index: set,
                    bound: sets,
                },
                position,
            );
        }
    }
}

fn check_ranges(header: &Header, states: &[State], positions: &SourceMap) -> Findings {
    let mut findings = Findings::default();
    let bound = header.states;
    let sets = header.acceptance.sets;

    for (label, position) in labels(header, states, positions) {
        if !label.fits(FormulaContext::Label) {
            findings.push(
                ValidationErrorKind::MisplacedAtom {
                    formula: label.to_string(),
                    context: FormulaContext::Label,
                },
                position,
            );
        }
        for p in label.propositions() {
            if p >= header.ap_count {
                findings.push(
                    ValidationErrorKind::RangeViolation {
                        kind: RangeKind::Proposition,
                        index: p,
                        bound: header.ap_count,
                    },
                    position,
                );
            }
        }
    }

    let condition = &header.acceptance.condition;
    if !condition.fits(FormulaContext::Acceptance) {
        findings.push(
            ValidationErrorKind::MisplacedAtom {
                formula: condition.to_string(),
                context: FormulaContext::Acceptance,
            },
            positions.header.acceptance,
        );
    }
    for set in condition.acceptance_sets() {
        if set >= sets {
            findings.push(
                ValidationErrorKind::RangeViolation {
                    kind: RangeKind::AcceptanceSet,
                    index: set,
                    bound: sets,
                },
                positions.header.acceptance,
            );
        }
    }

    for (i, start) in header.start.iter().enumerate() {
        for &q in start.states() {
            if q >= bound {
                findings.push(
                    ValidationErrorKind::RangeViolation {
                        kind: RangeKind::StartState,
                        index: q,
                        bound,
                    },
                    positions.header.start.get(i).copied(),
                );
            }
        }
    }

    for (i, state) in states.iter().enumerate() {
        if state.index >= bound {
            findings.push(
                ValidationErrorKind::RangeViolation {
                    kind: RangeKind::State,
                    index: state.index,
                    bound,
                },
                positions.state(i),
            );
        }
        check_signature(state.acceptance.as_ref(), sets, positions.state(i), &mut findings);

        for (j, edge) in state.edges.iter().enumerate() {
            for &q in edge.target.states() {
                if q >= bound {
                    findings.push(
                        ValidationErrorKind::RangeViolation {
                            kind: RangeKind::EdgeTarget,
                            index: q,
                            bound,
                        },
                        positions.edge(i, j),
                    );
                }
            }
            check_signature(
                edge.acceptance.as_ref(),
                sets,
                positions.edge(i, j),
                &mut findings,
            );
        }
    }
    findings
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Depth-first search through the alias definitions, reporting every cycle that closes over
/// an alias which is still in progress.
fn find_cycles<'a>(
    name: &'a str,
    header: &'a Header,
    marks: &mut Map<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    marks.insert(name, Mark::InProgress);
    stack.push(name);
    if let Some(definition) = header.aliases.get(name) {
        for referenced in definition.aliases() {
            if !header.aliases.contains_key(referenced) {
                continue;
            }
            match marks.get(referenced) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let from = stack
                        .iter()
                        .position(|on_stack| *on_stack == referenced)
                        .unwrap_or(0);
                    let mut chain: Vec<String> =
                        stack[from..].iter().map(|name| name.to_string()).collect();
                    chain.push(referenced.to_string());
                    cycles.push(chain);
                }
                None => find_cycles(referenced, header, marks, stack, cycles),
            }
        }
    }
    stack.pop();
    marks.insert(name, Mark::Done);
}

/// Returns `true` if the definition of `from` refers to `to`, directly or through other
/// aliases.
fn reaches(header: &Header, from: &str, to: &str) -> bool {
    let mut seen: Set<&str> = Set::default();
    let mut queue = vec![from];
    while let Some(current) = queue.pop() {
        if !seen.insert(current) {
            continue;
        }
        let Some(definition) = header.aliases.get(current) else {
            continue;
        };
        for referenced in definition.aliases() {
            if referenced == to {
                return true;
            }
            queue.push(referenced);
        }
    }
    false
}

fn check_aliases(header: &Header, states: &[State], positions: &SourceMap) -> Findings {
    let mut findings = Findings::default();

    for (label, position) in labels(header, states, positions) {
        for name in label.aliases() {
            if !header.aliases.contains_key(name) {
                findings.push(
                    ValidationErrorKind::UnresolvedAlias {
                        name: name.to_string(),
                    },
                    position,
                );
            }
        }
    }

    let mut marks = Map::default();
    let mut cycles = vec![];
    for name in header.aliases.keys() {
        if !marks.contains_key(name.as_str()) {
            find_cycles(name, header, &mut marks, &mut vec![], &mut cycles);
        }
    }
    for chain in cycles {
        let position = header
            .aliases
            .get_index_of(chain[0].as_str())
            .and_then(|i| positions.header.aliases.get(i).copied());
        findings.push(ValidationErrorKind::CyclicAlias { chain }, position);
    }

    for (i, (name, definition)) in header.aliases.iter().enumerate() {
        for referenced in definition.aliases() {
            let Some(j) = header.aliases.get_index_of(referenced) else {
                continue;
            };
            if j >= i && !reaches(header, referenced, name) {
                findings.push(
                    ValidationErrorKind::AliasUsedBeforeDefinition {
                        name: referenced.to_string(),
                    },
                    positions.header.aliases.get(i).copied(),
                );
            }
        }
    }
    findings
}

fn labeling_mode(states: &[State], positions: &SourceMap, findings: &mut Findings) -> LabelingMode {
    let labeled_states = states.iter().filter(|s| s.label.is_some()).count();
    let labeled_edges = states
        .iter()
        .flat_map(|s| &s.edges)
        .filter(|e| e.label.is_some())
        .count();

    if labeled_states > 0 {
        for (i, state) in states.iter().enumerate() {
            if state.label.is_none() {
                findings.push(
                    ValidationErrorKind::InconsistentLabeling {
                        reason: format!(
                            "state {} has no label although other states are labeled",
                            state.index
                        ),
                    },
                    positions.state(i),
                );
            }
            for (j, edge) in state.edges.iter().enumerate() {
                if edge.label.is_some() {
                    findings.push(
                        ValidationErrorKind::InconsistentLabeling {
                            reason: format!(
                                "edge of state {} is labeled although states carry labels",
                                state.index
                            ),
                        },
                        positions.edge(i, j),
                    );
                }
            }
        }
        LabelingMode::State
    } else if labeled_edges > 0 {
        for (i, state) in states.iter().enumerate() {
            for (j, edge) in state.edges.iter().enumerate() {
                if edge.label.is_none() {
                    findings.push(
                        ValidationErrorKind::InconsistentLabeling {
                            reason: format!(
                                "edge of state {} has no label although other edges are labeled",
                                state.index
                            ),
                        },
                        positions.edge(i, j),
                    );
                }
            }
        }
        LabelingMode::Transition
    } else {
        LabelingMode::Implicit
    }
}

fn acceptance_placement(
    states: &[State],
    positions: &SourceMap,
    findings: &mut Findings,
) -> AcceptancePlacement {
    let on_states = states.iter().any(|s| s.acceptance.is_some());
    let on_edges = states
        .iter()
        .flat_map(|s| &s.edges)
        .any(|e| e.acceptance.is_some());

    match (on_states, on_edges) {
        (true, true) => {
            for (i, state) in states.iter().enumerate() {
                for (j, edge) in state.edges.iter().enumerate() {
                    if edge.acceptance.is_some() {
                        findings.push(
                            ValidationErrorKind::InconsistentAcceptance {
                                reason: format!(
                                    "edge of state {} carries acceptance sets although states do",
                                    state.index
                                ),
                            },
                            positions.edge(i, j),
                        );
                    }
                }
            }
            AcceptancePlacement::State
        }
        (true, false) => AcceptancePlacement::State,
        (false, true) => AcceptancePlacement::Transition,
        (false, false) => AcceptancePlacement::Absent,
    }
}

fn check_cardinality(header: &Header, states: &[State], positions: &SourceMap) -> Findings {
    let mut findings = Findings::default();

    let actual = u32::try_from(states.len()).unwrap_or(u32::MAX);
    if actual != header.states {
        findings.push(
            ValidationErrorKind::CardinalityMismatch {
                what: Cardinality::States,
                declared: header.states,
                actual,
            },
            positions.header.states,
        );
    }
    let mut seen = Set::default();
    for (i, state) in states.iter().enumerate() {
        if !seen.insert(state.index) {
            findings.push(
                ValidationErrorKind::DuplicateState { index: state.index },
                positions.state(i),
            );
        }
    }

    let actual = u32::try_from(header.aps.len()).unwrap_or(u32::MAX);
    if actual != header.ap_count {
        findings.push(
            ValidationErrorKind::CardinalityMismatch {
                what: Cardinality::AtomicPropositions,
                declared: header.ap_count,
                actual,
            },
            positions.header.ap,
        );
    }
    let mut seen = Set::default();
    for ap in &header.aps {
        if !seen.insert(ap.as_str()) {
            findings.push(
                ValidationErrorKind::DuplicateProposition { name: ap.clone() },
                positions.header.ap,
            );
        }
    }
    findings
}
