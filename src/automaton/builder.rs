use tracing::debug;

use crate::{
    body::{Edge, State, StateConjunction},
    error::{ErrorReport, ParseError, ParseErrorKind},
    formula::Formula,
    header::{
        Acceptance, AcceptanceName, AcceptanceParameter, CustomHeader, Header, HeaderPositions,
        Property, Tool,
    },
    lexer::Position,
    options::ParseOptions,
    validate::validate,
};

use super::Automaton;

/// Source positions of the parts of an automaton, kept next to the automaton while it is
/// being built so validation errors can point into the input.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceMap {
    pub header: HeaderPositions,
    /// One entry per state, in the order the states were added.
    pub states: Vec<Position>,
    /// One entry per edge, grouped like `states`.
    pub edges: Vec<Vec<Position>>,
}

impl SourceMap {
    pub fn state(&self, state: usize) -> Option<Position> {
        self.states.get(state).copied()
    }

    pub fn edge(&self, state: usize, edge: usize) -> Option<Position> {
        self.edges.get(state)?.get(edge).copied()
    }
}

/// Helper struct for constructing an [`Automaton`] piece by piece. Nothing is checked while
/// the builder is filled, all invariants are verified at once when [`AutomatonBuilder::build`]
/// is called.
///
/// # Example
///
/// We want to create an automaton over the single proposition `a` with one state, which
/// loops on `a` and is accepting.
/// ```
/// use hoars::prelude::*;
///
/// let automaton = AutomatonBuilder::new(1)
///     .with_aps(["a"])
///     .with_start(0)
///     .with_acceptance(1, Formula::inf(0))
///     .with_property(Property::TransLabels)
///     .with_state(
///         State::new(0)
///             .with_acceptance([0])
///             .with_edge(Edge::new(0).with_label(Formula::Proposition(0))),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(automaton.num_states(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct AutomatonBuilder {
    header: Header,
    states: Vec<State>,
    positions: SourceMap,
}

impl AutomatonBuilder {
    /// Creates a builder for an automaton with `states` states, no atomic propositions and
    /// the trivial acceptance condition `0 t`.
    pub fn new(states: u32) -> Self {
        Self::from_header(Header::new(states), HeaderPositions::default())
    }

    pub(crate) fn from_header(header: Header, positions: HeaderPositions) -> Self {
        Self {
            header,
            states: vec![],
            positions: SourceMap {
                header: positions,
                ..Default::default()
            },
        }
    }

    /// Sets the atomic propositions, their number is derived from the given names.
    pub fn with_aps<I, S>(mut self, aps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header.aps = aps.into_iter().map(Into::into).collect();
        self.header.ap_count = u32::try_from(self.header.aps.len()).unwrap_or(u32::MAX);
        self
    }

    /// Adds a start state, or a conjunction of start states.
    pub fn with_start<T: Into<StateConjunction>>(mut self, start: T) -> Self {
        self.header.start.push(start.into());
        self
    }

    /// Defines the alias `name`, given without the leading `@`. Redefining an alias replaces
    /// the previous definition.
    pub fn with_alias<S: Into<String>>(mut self, name: S, formula: Formula) -> Self {
        self.header.aliases.insert(name.into(), formula);
        self
    }

    /// Sets the number of acceptance sets and the acceptance condition.
    pub fn with_acceptance(mut self, sets: u32, condition: Formula) -> Self {
        self.header.acceptance = Acceptance::new(sets, condition);
        self
    }

    /// Sets the `acc-name:` item.
    pub fn with_acceptance_name<S, I>(mut self, name: S, parameters: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = AcceptanceParameter>,
    {
        self.header.acceptance_name = Some(AcceptanceName {
            name: name.into(),
            parameters: parameters.into_iter().collect(),
        });
        self
    }

    /// Sets the `tool:` item.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.header.tool = Some(tool);
        self
    }

    /// Sets the `name:` item.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.header.name = Some(name.into());
        self
    }

    /// Declares a property.
    pub fn with_property(mut self, property: Property) -> Self {
        self.header.properties.push(property);
        self
    }

    /// Adds a header item that is kept but not interpreted.
    pub fn with_custom_header(mut self, custom: CustomHeader) -> Self {
        self.header.custom.push(custom);
        self
    }

    /// Adds a state together with its edges.
    pub fn with_state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    #[cfg(test)]
    pub(crate) fn states(&self) -> &[State] {
        &self.states
    }

    /// Adds a state parsed at `position`. Must not be mixed with [`Self::with_state`], the
    /// positions are matched to states by their order.
    pub(crate) fn push_state_at(&mut self, state: State, position: Position) {
        self.states.push(state);
        self.positions.states.push(position);
        self.positions.edges.push(vec![]);
    }

    /// Appends `edge` to the most recently added state, there has to be one.
    pub(crate) fn push_edge_at(&mut self, edge: Edge, position: Position) -> Result<(), ParseError> {
        let Some(state) = self.states.last_mut() else {
            return Err(ParseError::new(ParseErrorKind::EdgeBeforeState, position));
        };
        state.edges.push(edge);
        if let Some(edges) = self.positions.edges.last_mut() {
            edges.push(position);
        }
        Ok(())
    }

    /// Validates the collected parts with the default [`ParseOptions`] and seals them into
    /// an [`Automaton`].
    pub fn build(self) -> Result<Automaton, ErrorReport> {
        self.build_with(&ParseOptions::default())
    }

    /// Validates the collected parts and seals them into an [`Automaton`]. If anything is
    /// wrong, all errors of the first failing validation stage are returned.
    pub fn build_with(self, options: &ParseOptions) -> Result<Automaton, ErrorReport> {
        let (labeling, placement) = validate(&self.header, &self.states, &self.positions, options)?;
        debug!(
            "sealing automaton with {} states and {} atomic propositions",
            self.states.len(),
            self.header.ap_count
        );
        Ok(Automaton::seal(self.header, self.states, labeling, placement))
    }
}
