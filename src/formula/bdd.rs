use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet};

use crate::math::InsertionMap;

use super::Formula;

/// Encodes label formulas over a fixed number of atomic propositions as [`Bdd`]s, which
/// allows semantic questions like disjointness of two labels to be answered. Alias
/// references are expanded through the given alias definitions.
pub struct LabelSpace<'a> {
    variables: BddVariableSet,
    aliases: &'a InsertionMap<String, Formula>,
}

impl<'a> LabelSpace<'a> {
    /// Creates a label space with one variable per atomic proposition. Returns `None` if
    /// there are more propositions than the BDD library supports.
    pub fn new(ap_count: u32, aliases: &'a InsertionMap<String, Formula>) -> Option<Self> {
        let ap_count = u16::try_from(ap_count)
            .ok()
            .filter(|&count| count < u16::MAX)?;
        Some(Self {
            variables: BddVariableSet::new_anonymous(ap_count),
            aliases,
        })
    }

    /// The label that holds for every valuation.
    pub fn tautology(&self) -> Bdd {
        self.variables.mk_true()
    }

    /// Translates `formula` into a [`Bdd`]. Returns `None` if the formula references an
    /// undefined alias, a proposition outside of the space or contains acceptance atoms.
    /// Alias definitions must be acyclic.
    pub fn encode(&self, formula: &Formula) -> Option<Bdd> {
        match formula {
            Formula::True => Some(self.variables.mk_true()),
            Formula::False => Some(self.variables.mk_false()),
            Formula::Proposition(p) => {
                if (*p as usize) < self.variables.num_vars() as usize {
                    Some(self.variables.mk_var(BddVariable::from_index(*p as usize)))
                } else {
                    None
                }
            }
            Formula::Alias(name) => self.encode(self.aliases.get(name)?),
            Formula::AcceptanceSet(_) => None,
            Formula::Not(inner) => Some(self.encode(inner)?.not()),
            Formula::And(operands) => {
                let mut out = self.variables.mk_true();
                for operand in operands {
                    out = out.and(&self.encode(operand)?);
                }
                Some(out)
            }
            Formula::Or(operands) => {
                let mut out = self.variables.mk_false();
                for operand in operands {
                    out = out.or(&self.encode(operand)?);
                }
                Some(out)
            }
        }
    }

    /// Returns the indices of the first pair of labels that share a satisfying valuation.
    pub fn first_overlap(&self, labels: &[Bdd]) -> Option<(usize, usize)> {
        for (i, left) in labels.iter().enumerate() {
            for (j, right) in labels.iter().enumerate().skip(i + 1) {
                if !left.and(right).is_false() {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Returns `true` if every valuation satisfies at least one of the `labels`.
    pub fn covers(&self, labels: &[Bdd]) -> bool {
        labels
            .iter()
            .fold(self.variables.mk_false(), |acc, label| acc.or(label))
            .is_true()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_through_aliases() {
        let mut aliases = InsertionMap::default();
        aliases.insert("a".to_string(), Formula::Proposition(0));
        aliases.insert(
            "na".to_string(),
            Formula::not(Formula::alias("a")),
        );
        let space = LabelSpace::new(2, &aliases).unwrap();

        let left = space.encode(&Formula::alias("a")).unwrap();
        let right = space.encode(&Formula::alias("na")).unwrap();
        assert_eq!(space.first_overlap(&[left.clone(), right.clone()]), None);
        assert!(space.covers(&[left, right]));

        let both = space
            .encode(&Formula::and([Formula::Proposition(0), Formula::Proposition(1)]))
            .unwrap();
        let first = space.encode(&Formula::Proposition(1)).unwrap();
        assert_eq!(space.first_overlap(&[both.clone(), first.clone()]), Some((0, 1)));
        assert!(!space.covers(&[both, first]));

        assert!(space.encode(&Formula::Proposition(2)).is_none());
        assert!(space.encode(&Formula::alias("missing")).is_none());
        assert!(space.encode(&Formula::inf(0)).is_none());
    }

    #[test]
    fn zero_propositions() {
        let aliases = InsertionMap::default();
        let space = LabelSpace::new(0, &aliases).unwrap();
        assert!(space.covers(&[space.encode(&Formula::True).unwrap()]));
        assert!(!space.covers(&[]));
    }

    #[test]
    fn too_many_propositions() {
        let aliases = InsertionMap::default();
        assert!(LabelSpace::new(u16::MAX as u32, &aliases).is_none());
        assert!(LabelSpace::new(1 << 20, &aliases).is_none());
        assert!(LabelSpace::new(64, &aliases).is_some());
    }
}
