//! The success/failure envelope used across the scaffold.
//!
//! Expected failure conditions are values, not unwound stacks: an operation
//! that can fail returns [`OpResult`], callers branch or short-circuit with
//! `?`, and a chain of fallible operations forwards the first failure's
//! reasons. Panics are reserved for programming bugs.

/// Broad classification of a failure, used by callers that need to react
/// differently (retry a conflict, reject invalid input, and so on) without
/// parsing reason strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A requested identity was absent.
    NotFound,
    /// Input was malformed or violated a constraint before any write.
    Validation,
    /// Two writers raced on the same row, or a uniqueness rule was hit.
    Conflict,
    /// Infrastructure was unavailable even after the bounded retry policy.
    Transient,
    /// Anything that should not happen under correct operation.
    Unexpected,
}

/// A failed outcome carrying one or more human-readable reasons.
///
/// A `Failure` always has at least one reason; the constructors enforce
/// this. Reasons are ordered: the first is the originating one, later
/// entries add context appended on the way up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    kind: FailureKind,
    reasons: Vec<String>,
}

/// Result alias for operations that fail with a [`Failure`].
pub type OpResult<T> = Result<T, Failure>;

impl Failure {
    /// Creates a failure of the given kind with one reason.
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reasons: vec![reason.into()],
        }
    }

    /// A failure for a requested identity that was absent.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, reason)
    }

    /// A failure for malformed or constraint-violating input.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, reason)
    }

    /// A failure for a concurrency or uniqueness conflict.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Conflict, reason)
    }

    /// A failure for exhausted transient infrastructure faults.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Transient, reason)
    }

    /// A failure for a condition that should not occur in correct operation.
    pub fn unexpected(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Unexpected, reason)
    }

    /// Appends a contextual reason, keeping the original ones.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    /// Returns the failure classification.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the ordered reasons. Never empty.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Returns true if this is a concurrency/uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        self.kind == FailureKind::Conflict
    }

    /// Returns true if the requested identity was absent.
    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::NotFound
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reasons.join("; "))
    }
}

impl std::error::Error for Failure {}
