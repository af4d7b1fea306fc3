//! Error types for document validation.
//!
//! Every error is fatal to the session that raised it: once an event is
//! rejected the context is abandoned, and callers wanting resilience drive
//! a new session over corrected input.

use std::error::Error as StdError;

use thiserror::Error;

use crate::datatype::{ArrayType, DataType};
use crate::event::Method;

/// Validation failure raised while dispatching an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// An event was checked against the current rule and found illegal.
    #[error("{method}{} is not allowed in {rule}", type_suffix(.data_type))]
    StructuralViolation {
        rule: &'static str,
        method: Method,
        data_type: Option<DataType>,
    },

    /// Attempted to pop the bottom-most rule. A correct rule table never
    /// gets here, so this indicates an internal consistency bug.
    #[error("rule stack underflow: cannot pop {rule}")]
    StackUnderflow { rule: &'static str },

    #[error("unsupported version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },

    #[error("invalid identifier {identifier:?}: {reason}")]
    InvalidIdentifier {
        identifier: String,
        reason: &'static str,
    },

    #[error("invalid text at byte {offset}: {reason}")]
    InvalidText { offset: usize, reason: &'static str },

    #[error("marker {0:?} is already defined")]
    DuplicateMarker(String),

    #[error("reference {0:?} does not match any marker")]
    UnresolvedReference(String),

    #[error("record type {0:?} is already defined")]
    DuplicateRecordType(String),

    #[error("record type {0:?} is not defined")]
    UndefinedRecordType(String),

    #[error("{array_type} of {element_count} elements needs {expected} bytes, got {actual}")]
    ArrayLengthMismatch {
        array_type: ArrayType,
        element_count: u64,
        expected: u64,
        actual: u64,
    },

    #[error("{received} bytes of array data overrun a chunk with {remaining} bytes remaining")]
    ChunkOverrun { remaining: u64, received: u64 },

    #[error("{limit} limit of {max} exceeded")]
    LimitExceeded { limit: &'static str, max: u64 },

    #[error("document stopped in {rule} before it was ended")]
    IncompleteDocument { rule: &'static str },

    #[error("session was aborted by an earlier error")]
    Aborted,
}

fn type_suffix(data_type: &Option<DataType>) -> String {
    match data_type {
        Some(dt) if !dt.is_empty() => format!(" ({})", dt),
        _ => String::new(),
    }
}

impl RuleError {
    /// Build a structural violation for `method` rejected by `rule`.
    pub fn violation(rule: &'static str, method: Method, data_type: DataType) -> Self {
        RuleError::StructuralViolation {
            rule,
            method,
            data_type: (!data_type.is_empty()).then_some(data_type),
        }
    }

    /// Check if this is the "wrong thing in wrong place" error.
    pub fn is_structural(&self) -> bool {
        matches!(self, RuleError::StructuralViolation { .. })
    }

    /// Check if this error indicates a bug in the rule table rather than
    /// bad input.
    pub fn is_bug(&self) -> bool {
        matches!(self, RuleError::StackUnderflow { .. })
    }
}

/// Error from a [`DocumentValidator`](crate::receiver::DocumentValidator)
/// session: either the rules rejected the event or the downstream receiver
/// failed on it.
#[derive(Debug, Error)]
pub enum SessionError<E: StdError + 'static> {
    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error("receiver failed: {0}")]
    Receiver(#[source] E),
}

impl<E: StdError + 'static> SessionError<E> {
    /// The rules error, if this failure came from validation.
    pub fn as_rule_error(&self) -> Option<&RuleError> {
        match self {
            SessionError::Rules(err) => Some(err),
            SessionError::Receiver(_) => None,
        }
    }
}
