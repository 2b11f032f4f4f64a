use tracing::trace;

use crate::{
    automaton::{Automaton, AutomatonBuilder},
    body::{Edge, State, StateConjunction},
    error::ErrorReport,
    formula::{AcceptanceAtom, AcceptanceKind, Formula},
    header::{CustomHeader, HeaderValue, Property, Tool},
};

/// Parameters for [`generate_random_automaton`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomAutomatonShape {
    /// Number of states.
    pub states: u32,
    /// Number of atomic propositions.
    pub aps: u32,
    /// Number of acceptance sets.
    pub sets: u32,
    /// Number of aliases to define.
    pub aliases: usize,
    /// Upper bound on the number of edges leaving each state.
    pub max_edges: usize,
    /// Maximal nesting depth of labels and of the acceptance condition.
    pub depth: u8,
    /// Probability that an edge branches universally into two states.
    pub universal_probability: f64,
}

impl Default for RandomAutomatonShape {
    fn default() -> Self {
        Self {
            states: 8,
            aps: 3,
            sets: 2,
            aliases: 2,
            max_edges: 4,
            depth: 3,
            universal_probability: 0.1,
        }
    }
}

/// Draws a random label over `aps` propositions which may also refer to the given aliases.
pub fn generate_random_label(aps: u32, aliases: &[String], depth: u8) -> Formula {
    if depth == 0 || fastrand::u8(..3) == 0 {
        let atoms = aps as usize + aliases.len();
        if atoms == 0 || fastrand::u8(..8) == 0 {
            return Formula::from(fastrand::bool());
        }
        let atom = fastrand::usize(..atoms);
        return match atom.checked_sub(aps as usize) {
            Some(alias) => Formula::alias(aliases[alias].as_str()),
            None => Formula::Proposition(atom as u32),
        };
    }
    let operands = || {
        (0..fastrand::usize(2..=3)).map(|_| generate_random_label(aps, aliases, depth - 1))
    };
    match fastrand::u8(..3) {
        0 => Formula::not(generate_random_label(aps, aliases, depth - 1)),
        1 => Formula::and(operands()),
        _ => Formula::or(operands()),
    }
}

/// Draws a random acceptance condition over `sets` acceptance sets.
pub fn generate_random_condition(sets: u32, depth: u8) -> Formula {
    if sets == 0 || depth == 0 || fastrand::u8(..3) == 0 {
        if sets == 0 {
            return Formula::from(fastrand::bool());
        }
        return Formula::AcceptanceSet(AcceptanceAtom {
            kind: if fastrand::bool() {
                AcceptanceKind::Inf
            } else {
                AcceptanceKind::Fin
            },
            set: fastrand::u32(..sets),
            negated: fastrand::u8(..4) == 0,
        });
    }
    let operands = (0..fastrand::usize(2..=3)).map(|_| generate_random_condition(sets, depth - 1));
    if fastrand::bool() {
        Formula::and(operands)
    } else {
        Formula::or(operands)
    }
}

fn random_signature(sets: u32) -> Option<Vec<u32>> {
    if sets == 0 || fastrand::bool() {
        None
    } else {
        Some((0..sets).filter(|_| fastrand::bool()).collect())
    }
}

/// Assembles a random transition-labeled automaton with the given `shape`. Every draw
/// respects the invariants checked during validation, aliases only refer to aliases defined
/// before them and all indices are in range. The builder is returned unsealed, so that
/// callers can add further items.
pub fn generate_random_builder(shape: RandomAutomatonShape) -> AutomatonBuilder {
    let mut builder = AutomatonBuilder::new(shape.states)
        .with_aps((0..shape.aps).map(|i| format!("p{i}")))
        .with_acceptance(shape.sets, generate_random_condition(shape.sets, shape.depth))
        .with_tool(Tool {
            name: "hoars".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        })
        .with_name("random \"automaton\"")
        .with_property(Property::TransLabels)
        .with_property(Property::ExplicitLabels)
        .with_property(Property::TransAcc)
        .with_custom_header(CustomHeader {
            name: "generator-seed".to_string(),
            values: vec![HeaderValue::Int(fastrand::u32(..)), HeaderValue::Boolean(true)],
        });

    let mut aliases: Vec<String> = vec![];
    for i in 0..shape.aliases {
        let definition = generate_random_label(shape.aps, &aliases, shape.depth);
        let name = format!("a{i}");
        builder = builder.with_alias(name.clone(), definition);
        aliases.push(name);
    }

    if shape.states > 0 {
        builder = builder.with_start(fastrand::u32(..shape.states));
    }
    for index in 0..shape.states {
        let mut state = State::new(index);
        if fastrand::bool() {
            state = state.with_name(format!("q{index} \\ \"quoted\""));
        }
        for _ in 0..fastrand::usize(..=shape.max_edges) {
            let first = fastrand::u32(..shape.states);
            let target = if fastrand::f64() < shape.universal_probability {
                StateConjunction(vec![first, fastrand::u32(..shape.states)])
            } else {
                StateConjunction::singleton(first)
            };
            let mut edge = Edge::new(target)
                .with_label(generate_random_label(shape.aps, &aliases, shape.depth));
            if let Some(signature) = random_signature(shape.sets) {
                edge = edge.with_acceptance(signature);
            }
            state = state.with_edge(edge);
        }
        builder = builder.with_state(state);
    }
    trace!("generated random automaton of shape {:?}", shape);
    builder
}

/// Generates a random automaton, see [`generate_random_builder`]. Validation of the result
/// is expected to succeed.
pub fn generate_random_automaton(shape: RandomAutomatonShape) -> Result<Automaton, ErrorReport> {
    generate_random_builder(shape).build()
}
