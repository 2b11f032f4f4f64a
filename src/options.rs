/// What to do with flags of the `properties:` item that are not defined by the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnknownPropertyPolicy {
    /// Keep unknown flags in the automaton without further notice.
    #[default]
    Preserve,
    /// Keep unknown flags, but emit a warning through `tracing`.
    Warn,
    /// Reject the automaton with a [`crate::ValidationErrorKind::UnknownProperty`] error.
    Reject,
}

/// Configures how documents are parsed and validated.
///
/// ```
/// use hoars::{ParseOptions, UnknownPropertyPolicy};
///
/// let strict = ParseOptions::default()
///     .with_unknown_properties(UnknownPropertyPolicy::Reject)
///     .with_property_checks(false);
/// assert!(!strict.check_properties());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseOptions {
    unknown_properties: UnknownPropertyPolicy,
    check_properties: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            unknown_properties: UnknownPropertyPolicy::default(),
            check_properties: true,
        }
    }
}

impl ParseOptions {
    /// Sets the policy for unknown properties.
    pub fn with_unknown_properties(mut self, policy: UnknownPropertyPolicy) -> Self {
        self.unknown_properties = policy;
        self
    }

    /// Enables or disables checking declared structural properties such as `deterministic`
    /// against the automaton. Properties that determine where labels and acceptance sets are
    /// placed are always checked.
    pub fn with_property_checks(mut self, check: bool) -> Self {
        self.check_properties = check;
        self
    }

    /// The policy for unknown properties.
    pub fn unknown_properties(&self) -> UnknownPropertyPolicy {
        self.unknown_properties
    }

    /// Whether structural properties are checked.
    pub fn check_properties(&self) -> bool {
        self.check_properties
    }
}
