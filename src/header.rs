use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{
    body::StateConjunction,
    formula::Formula,
    lexer::Position,
    math::InsertionMap,
};

pub(crate) mod parser;

/// The `Acceptance:` item, consisting of the number of acceptance sets and a condition over
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Acceptance {
    /// Number of acceptance sets, valid indices are `0..sets`.
    pub sets: u32,
    /// The acceptance condition, only using `Fin`/`Inf` atoms and boolean constants.
    pub condition: Formula,
}

impl Acceptance {
    /// Creates a new acceptance condition.
    pub fn new(sets: u32, condition: Formula) -> Self {
        Self { sets, condition }
    }
}

impl Default for Acceptance {
    fn default() -> Self {
        Self::new(0, Formula::True)
    }
}

/// A parameter of the `acc-name:` item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AcceptanceParameter {
    Boolean(bool),
    Int(u32),
    Identifier(String),
}

impl Display for AcceptanceParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AcceptanceParameter::Boolean(b) => write!(f, "{}", if *b { "t" } else { "f" }),
            AcceptanceParameter::Int(n) => write!(f, "{n}"),
            AcceptanceParameter::Identifier(ident) => write!(f, "{ident}"),
        }
    }
}

/// The `acc-name:` item, for example `generalized-Buchi 2`. It names the acceptance
/// condition and is purely informational.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcceptanceName {
    /// The name of the condition, like `Buchi` or `parity`.
    pub name: String,
    /// The parameters following the name.
    pub parameters: Vec<AcceptanceParameter>,
}

/// The `tool:` item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tool {
    /// Name of the tool that produced the automaton.
    pub name: String,
    /// Optional version of that tool.
    pub version: Option<String>,
}

/// A value of a header item this crate does not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum HeaderValue {
    Boolean(bool),
    Int(u32),
    Text(String),
    Identifier(String),
}

/// A header item that is not part of the format itself, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomHeader {
    /// The name of the item without the trailing colon.
    pub name: String,
    /// The values in the order they appear.
    pub values: Vec<HeaderValue>,
}

macro_rules! properties {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// A flag of the `properties:` item. Flags that are not part of the format are
        /// preserved as [`Property::Unknown`].
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[allow(missing_docs)]
        pub enum Property {
            $($variant,)*
            Unknown(String),
        }

        impl Property {
            /// Looks up the property with the given name.
            pub fn from_name(name: &str) -> Self {
                match name {
                    $($name => Property::$variant,)*
                    other => Property::Unknown(other.to_string()),
                }
            }

            /// The name of the property as it is written in a HOA file.
            pub fn name(&self) -> &str {
                match self {
                    $(Property::$variant => $name,)*
                    Property::Unknown(name) => name,
                }
            }
        }
    };
}

properties! {
    StateLabels => "state-labels",
    TransLabels => "trans-labels",
    ImplicitLabels => "implicit-labels",
    ExplicitLabels => "explicit-labels",
    StateAcc => "state-acc",
    TransAcc => "trans-acc",
    UnivBranch => "univ-branch",
    NoUnivBranch => "no-univ-branch",
    Deterministic => "deterministic",
    Complete => "complete",
    Unambiguous => "unambiguous",
    StutterInvariant => "stutter-invariant",
    Weak => "weak",
    VeryWeak => "very-weak",
    InherentlyWeak => "inherently-weak",
    Terminal => "terminal",
    Tight => "tight",
    Colored => "colored",
}

impl Property {
    /// Returns `true` if the property is not one of the flags defined by the format.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Property::Unknown(_))
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

/// The flags collected from all `properties:` items, in the order they were listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Properties(Vec<Property>);

impl Properties {
    /// Returns `true` if `property` was declared.
    pub fn contains(&self, property: &Property) -> bool {
        self.0.contains(property)
    }

    /// Iterates over all declared properties.
    pub fn iter(&self) -> impl Iterator<Item = &Property> + '_ {
        self.0.iter()
    }

    /// Iterates over the properties that are not defined by the format.
    pub fn unknown(&self) -> impl Iterator<Item = &Property> + '_ {
        self.0.iter().filter(|property| property.is_unknown())
    }

    /// Returns `true` if no property was declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, property: Property) {
        self.0.push(property);
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<T: IntoIterator<Item = Property>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything before `--BODY--`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub(crate) version: String,
    pub(crate) states: u32,
    pub(crate) start: Vec<StateConjunction>,
    pub(crate) ap_count: u32,
    pub(crate) aps: Vec<String>,
    pub(crate) aliases: InsertionMap<String, Formula>,
    pub(crate) acceptance: Acceptance,
    pub(crate) acceptance_name: Option<AcceptanceName>,
    pub(crate) tool: Option<Tool>,
    pub(crate) name: Option<String>,
    pub(crate) properties: Properties,
    pub(crate) custom: Vec<CustomHeader>,
}

impl Header {
    pub(crate) fn new(states: u32) -> Self {
        Self {
            version: "v1".to_string(),
            states,
            start: vec![],
            ap_count: 0,
            aps: vec![],
            aliases: InsertionMap::default(),
            acceptance: Acceptance::default(),
            acceptance_name: None,
            tool: None,
            name: None,
            properties: Properties::default(),
            custom: vec![],
        }
    }

    /// The version from the `HOA:` item, usually `v1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The declared number of states.
    pub fn states(&self) -> u32 {
        self.states
    }

    /// All start states, one entry per state conjunction.
    pub fn start(&self) -> &[StateConjunction] {
        &self.start
    }

    /// The declared number of atomic propositions.
    pub fn ap_count(&self) -> u32 {
        self.ap_count
    }

    /// The names of the atomic propositions, the position of a name is its index.
    pub fn aps(&self) -> &[String] {
        &self.aps
    }

    /// Alias definitions in the order they were given.
    pub fn aliases(&self) -> &InsertionMap<String, Formula> {
        &self.aliases
    }

    /// Looks up the definition of the alias `name`, given without `@`.
    pub fn alias(&self, name: &str) -> Option<&Formula> {
        self.aliases.get(name)
    }

    /// The acceptance condition.
    pub fn acceptance(&self) -> &Acceptance {
        &self.acceptance
    }

    /// The `acc-name:` item, if present.
    pub fn acceptance_name(&self) -> Option<&AcceptanceName> {
        self.acceptance_name.as_ref()
    }

    /// The `tool:` item, if present.
    pub fn tool(&self) -> Option<&Tool> {
        self.tool.as_ref()
    }

    /// The `name:` item, if present.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The declared properties.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Header items that are not interpreted, in input order.
    pub fn custom(&self) -> &[CustomHeader] {
        &self.custom
    }
}

/// Where the items of a parsed header are located, used to attach positions to validation
/// errors.
#[derive(Debug, Clone, Default)]
pub(crate) struct HeaderPositions {
    pub states: Option<Position>,
    /// One entry per start conjunction.
    pub start: Vec<Position>,
    pub ap: Option<Position>,
    /// One entry per alias, in definition order.
    pub aliases: Vec<Position>,
    pub acceptance: Option<Position>,
    pub properties: Option<Position>,
}
