use std::collections::BTreeSet;

/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
pub type Set<S> = fxhash::FxHashSet<S>;
/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
pub type Map<K, V> = fxhash::FxHashMap<K, V>;

/// Type alias for sets whose iteration order is the natural order of the elements.
pub type OrderedSet<S> = BTreeSet<S>;

/// Type alias for maps that remember the order in which keys were inserted. Alias
/// definitions rely on this, as an alias may only refer to the ones defined before it.
pub type InsertionMap<K, V> = indexmap::IndexMap<K, V>;
