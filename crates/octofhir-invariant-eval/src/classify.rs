//! Contained-reference rule specialization
//!
//! The generic `dom-3` rule ("every contained resource is referenced from
//! elsewhere in the resource") ships with an expression that misses canonical,
//! uri and url references. Any constraint written as `contained.where(...)` is
//! evaluated with [`CONTAINED_REFERENCE_TEMPLATE`] instead.

/// Prefix that marks a contained-reference check
pub const CONTAINED_REFERENCE_PREFIX: &str = "contained.where(";

/// Expression dispatched for every contained-reference check
///
/// Reads `%resource`, so it must be bound with [`crate::BindingContext::ByResource`].
/// Unreferenced ids are reported through the `unmatched` trace.
pub const CONTAINED_REFERENCE_TEMPLATE: &str = "contained.where((('#'+id in (%resource.descendants().reference | %resource.descendants().ofType(canonical) | %resource.descendants().ofType(uri) | %resource.descendants().ofType(url))) or descendants().where(reference = '#').exists() or descendants().where(ofType(canonical) = '#').exists() or descendants().where(ofType(canonical) = '#').exists()).not()).trace('unmatched', id).empty()";

/// How a constraint is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// Dispatched as written
    Standard,
    /// Replaced by the contained-reference template
    ContainedReferenceCheck,
}

impl ConstraintKind {
    /// Classify an expression by its literal prefix
    ///
    /// Matching is case-sensitive and does not trim leading whitespace.
    pub fn classify(expression: &str) -> Self {
        if expression.starts_with(CONTAINED_REFERENCE_PREFIX) {
            ConstraintKind::ContainedReferenceCheck
        } else {
            ConstraintKind::Standard
        }
    }

    /// The text actually sent to the engine
    pub fn dispatched_expression<'a>(&self, original: &'a str) -> &'a str {
        match self {
            ConstraintKind::Standard => original,
            ConstraintKind::ContainedReferenceCheck => CONTAINED_REFERENCE_TEMPLATE,
        }
    }

    /// Whether the whole resource is bound as `%resource` rather than `%rootResource`
    pub fn binds_resource(&self) -> bool {
        matches!(self, ConstraintKind::ContainedReferenceCheck)
    }
}
