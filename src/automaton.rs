use crate::{
    body::{Edge, State, StateConjunction},
    header::{Acceptance, Header, Properties},
};

mod builder;
pub use builder::AutomatonBuilder;
pub(crate) use builder::SourceMap;

mod output;
pub use output::WriteHoa;

/// Where the labels of an automaton are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelingMode {
    /// Every state carries a label, no edge does.
    State,
    /// Every edge carries a label, no state does.
    Transition,
    /// Nothing carries a label.
    Implicit,
}

/// Where the acceptance signatures of an automaton are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptancePlacement {
    /// Only states carry signatures.
    State,
    /// Only edges carry signatures.
    Transition,
    /// Neither states nor edges carry a signature.
    Absent,
}

/// A validated automaton. Instances are obtained by parsing or through an
/// [`AutomatonBuilder`] and cannot be modified afterwards.
///
/// States are stored densely, the state with index `i` is at position `i`.
///
/// # Example
///
/// ```
/// let automaton = hoars::parse(
///     "HOA: v1\nStates: 1\nStart: 0\nAP: 1 \"a\"\nAcceptance: 1 Inf(0)\n--BODY--\nState: 0 {0}\n[0] 0\n--END--\n",
/// )
/// .unwrap();
/// assert_eq!(automaton.num_states(), 1);
/// assert_eq!(automaton.aps(), &["a".to_string()]);
/// assert!(automaton.state(0).unwrap().acceptance().unwrap().contains(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    header: Header,
    states: Vec<State>,
    labeling: LabelingMode,
    placement: AcceptancePlacement,
}

impl Automaton {
    pub(crate) fn seal(
        header: Header,
        mut states: Vec<State>,
        labeling: LabelingMode,
        placement: AcceptancePlacement,
    ) -> Self {
        states.sort_by_key(|state| state.index);
        Self {
            header,
            states,
            labeling,
            placement,
        }
    }

    /// The header of the automaton.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The number of states.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Iterates over all states in ascending order of their index.
    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter()
    }

    /// Returns the state with the given index.
    pub fn state(&self, index: u32) -> Option<&State> {
        self.states.get(index as usize)
    }

    /// The outgoing edges of the state with the given index.
    pub fn edges_from(&self, index: u32) -> Option<&[Edge]> {
        self.state(index).map(State::edges)
    }

    /// The start states.
    pub fn start(&self) -> &[StateConjunction] {
        self.header.start()
    }

    /// The names of the atomic propositions.
    pub fn aps(&self) -> &[String] {
        self.header.aps()
    }

    /// The acceptance condition.
    pub fn acceptance(&self) -> &Acceptance {
        self.header.acceptance()
    }

    /// The declared properties.
    pub fn properties(&self) -> &Properties {
        self.header.properties()
    }

    /// The `name:` of the automaton, if there is one.
    pub fn name(&self) -> Option<&str> {
        self.header.name()
    }

    /// Where labels are placed.
    pub fn labeling_mode(&self) -> LabelingMode {
        self.labeling
    }

    /// Where acceptance signatures are placed.
    pub fn acceptance_placement(&self) -> AcceptancePlacement {
        self.placement
    }

    /// Shorthand for checking whether the labeling mode is [`LabelingMode::State`].
    pub fn is_state_labeled(&self) -> bool {
        self.labeling == LabelingMode::State
    }

    /// Returns `true` if some start state or edge target is a conjunction of several states.
    pub fn has_universal_branching(&self) -> bool {
        self.start()
            .iter()
            .chain(self.states.iter().flat_map(|s| s.edges.iter().map(|e| &e.target)))
            .any(|conj| conj.get_singleton().is_none())
    }
}
