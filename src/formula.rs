use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::math::OrderedSet;

/// The grammar for labels and acceptance conditions.
pub mod parser;

/// Converts label formulas into binary decision diagrams.
#[cfg(feature = "bdd")]
pub mod bdd;

/// Distinguishes `Fin` from `Inf` atoms in an acceptance condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AcceptanceKind {
    /// The acceptance set must be visited only finitely often.
    Fin,
    /// The acceptance set must be visited infinitely often.
    Inf,
}

impl Display for AcceptanceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AcceptanceKind::Fin => write!(f, "Fin"),
            AcceptanceKind::Inf => write!(f, "Inf"),
        }
    }
}

/// An atom of an acceptance condition such as `Inf(0)` or `Fin(!2)`. If `negated` is set,
/// the atom refers to the complement of the acceptance set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AcceptanceAtom {
    /// Whether this is a `Fin` or an `Inf` atom.
    pub kind: AcceptanceKind,
    /// Index of the acceptance set.
    pub set: u32,
    /// Whether the set is complemented.
    pub negated: bool,
}

impl Display for AcceptanceAtom {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}({}{})",
            self.kind,
            if self.negated { "!" } else { "" },
            self.set
        )
    }
}

/// The context a formula appears in, which determines which atoms are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaContext {
    /// Labels of states and edges as well as alias definitions. Atoms are propositions,
    /// aliases and the boolean constants, negation is allowed anywhere.
    Label,
    /// The `Acceptance:` condition. Atoms are `Fin`/`Inf` and the boolean constants,
    /// negation may only appear inside of an atom.
    Acceptance,
}

impl Display for FormulaContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FormulaContext::Label => write!(f, "labels"),
            FormulaContext::Acceptance => write!(f, "acceptance conditions"),
        }
    }
}

/// A boolean formula, used both for labels and for acceptance conditions. Conjunctions and
/// disjunctions are n-ary and kept flat, which means an [`Formula::Or`] never directly contains
/// another [`Formula::Or`] when constructed through [`Formula::or`] (the same holds for
/// conjunctions). This makes `a | b | c` and `(a | b) | c` indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// The constant `t`.
    True,
    /// The constant `f`.
    False,
    /// Reference to the atomic proposition with the given index.
    Proposition(u32),
    /// Reference to an alias, the name is stored without the leading `@`.
    Alias(String),
    /// A `Fin` or `Inf` atom of an acceptance condition.
    AcceptanceSet(AcceptanceAtom),
    /// Negation.
    Not(Box<Formula>),
    /// Conjunction of all operands.
    And(Vec<Formula>),
    /// Disjunction of all operands.
    Or(Vec<Formula>),
}

impl Formula {
    /// Builds a flat conjunction. Nested conjunctions are spliced into the result, a single
    /// operand is returned as is and an empty conjunction is [`Formula::True`].
    pub fn and<I: IntoIterator<Item = Formula>>(operands: I) -> Self {
        let mut flat = vec![];
        for operand in operands {
            match operand {
                Formula::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::True,
            1 => flat.pop().unwrap_or(Formula::True),
            _ => Formula::And(flat),
        }
    }

    /// Builds a flat disjunction, see [`Formula::and`]. An empty disjunction is
    /// [`Formula::False`].
    pub fn or<I: IntoIterator<Item = Formula>>(operands: I) -> Self {
        let mut flat = vec![];
        for operand in operands {
            match operand {
                Formula::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::False,
            1 => flat.pop().unwrap_or(Formula::False),
            _ => Formula::Or(flat),
        }
    }

    /// Negates the given formula. Negating a negation yields the negated formula itself.
    #[allow(clippy::should_implement_trait)]
    pub fn not(formula: Formula) -> Self {
        match formula {
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    /// Creates a reference to an alias.
    pub fn alias<S: Into<String>>(name: S) -> Self {
        Formula::Alias(name.into())
    }

    /// The atom `Fin(set)`.
    pub fn fin(set: u32) -> Self {
        Formula::AcceptanceSet(AcceptanceAtom {
            kind: AcceptanceKind::Fin,
            set,
            negated: false,
        })
    }

    /// The atom `Inf(set)`.
    pub fn inf(set: u32) -> Self {
        Formula::AcceptanceSet(AcceptanceAtom {
            kind: AcceptanceKind::Inf,
            set,
            negated: false,
        })
    }

    /// Visits `self` and all subformulas in pre-order.
    pub fn walk<'a, F: FnMut(&'a Formula)>(&'a self, f: &mut F) {
        f(self);
        match self {
            Formula::Not(inner) => inner.walk(f),
            Formula::And(operands) | Formula::Or(operands) => {
                for operand in operands {
                    operand.walk(f);
                }
            }
            _ => {}
        }
    }

    /// The indices of all atomic propositions occurring directly in `self`. Propositions
    /// hidden behind alias references are not included.
    pub fn propositions(&self) -> OrderedSet<u32> {
        let mut out = OrderedSet::new();
        self.walk(&mut |f| {
            if let Formula::Proposition(p) = f {
                out.insert(*p);
            }
        });
        out
    }

    /// The indices of all acceptance sets mentioned in `self`.
    pub fn acceptance_sets(&self) -> OrderedSet<u32> {
        let mut out = OrderedSet::new();
        self.walk(&mut |f| {
            if let Formula::AcceptanceSet(atom) = f {
                out.insert(atom.set);
            }
        });
        out
    }

    /// The names of all aliases referenced by `self`, in order of first occurrence.
    pub fn aliases(&self) -> Vec<&str> {
        let mut out: Vec<&str> = vec![];
        self.walk(&mut |f| {
            if let Formula::Alias(name) = f {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
        });
        out
    }

    /// Returns `true` if `self` only consists of atoms that are allowed in `context`.
    pub fn fits(&self, context: FormulaContext) -> bool {
        let mut fits = true;
        self.walk(&mut |f| match (f, context) {
            (Formula::Proposition(_) | Formula::Alias(_) | Formula::Not(_), FormulaContext::Acceptance)
            | (Formula::AcceptanceSet(_), FormulaContext::Label) => fits = false,
            _ => {}
        });
        fits
    }

    fn precedence(&self) -> u8 {
        match self {
            Formula::Or(_) => 1,
            Formula::And(_) => 2,
            Formula::Not(_) => 3,
            _ => 4,
        }
    }

    fn fmt_operand(&self, parent: u8, f: &mut Formatter<'_>) -> FmtResult {
        if self.precedence() <= parent {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_operands(&self, operands: &[Formula], op: &str, f: &mut Formatter<'_>) -> FmtResult {
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                write!(f, " {op} ")?;
            }
            operand.fmt_operand(self.precedence(), f)?;
        }
        Ok(())
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Formula::True => write!(f, "t"),
            Formula::False => write!(f, "f"),
            Formula::Proposition(p) => write!(f, "{p}"),
            Formula::Alias(name) => write!(f, "@{name}"),
            Formula::AcceptanceSet(atom) => write!(f, "{atom}"),
            Formula::Not(inner) if inner.precedence() < self.precedence() => write!(f, "!({inner})"),
            Formula::Not(inner) => write!(f, "!{inner}"),
            Formula::And(operands) if operands.is_empty() => write!(f, "t"),
            Formula::Or(operands) if operands.is_empty() => write!(f, "f"),
            Formula::And(operands) => self.fmt_operands(operands, "&", f),
            Formula::Or(operands) => self.fmt_operands(operands, "|", f),
        }
    }
}

impl From<bool> for Formula {
    fn from(value: bool) -> Self {
        if value {
            Formula::True
        } else {
            Formula::False
        }
    }
}

impl From<AcceptanceAtom> for Formula {
    fn from(value: AcceptanceAtom) -> Self {
        Formula::AcceptanceSet(value)
    }
}
