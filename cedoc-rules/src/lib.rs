//! CEDOC Document Rules
//!
//! Structural validator for a streaming, event-based document encoding.
//! Decoders and encoders feed it one event at a time; it tracks where in
//! the document grammar the stream currently is and rejects any event that
//! is not legal there. No tree is built.
//!
//! # Architecture
//!
//! - **datatype.rs** - DataType bitflags, composite masks, array kinds
//! - **event.rs** - Borrowed document events and the Method catalogue
//! - **rule.rs** - Static rule table and default reactions
//! - **context.rs** - Rule stack, chunk bookkeeping, marker/record-type registries
//! - **dispatch.rs** - The single dispatcher and the structure-checking handler
//! - **receiver.rs** - Validation sessions forwarding to a downstream receiver
//! - **unicode.rs** - Character classification for identifiers and text
//! - **options.rs** - Session limits
//! - **error.rs** - Error types
//!
//! # Example
//!
//! ```
//! use cedoc_rules::{validate, Event};
//!
//! let events = [
//!     Event::BeginDocument,
//!     Event::Map,
//!     Event::string("a"),
//!     Event::Int(1),
//!     Event::EndContainer,
//!     Event::EndDocument,
//! ];
//! validate(&events).unwrap();
//! ```

pub mod context;
pub mod datatype;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod options;
pub mod receiver;
pub mod rule;
pub mod unicode;

pub use context::{ArrayProgress, Context, Frame};
pub use datatype::{ArrayType, DataType};
pub use dispatch::{dispatch, RuleHandler, StructureChecker};
pub use error::{RuleError, SessionError};
pub use event::{Event, Method, MethodCategory};
pub use options::RuleOptions;
pub use receiver::{validate, validate_with, DocumentValidator, EventReceiver, MethodLog, NullReceiver};
pub use rule::{Next, Reaction, RuleDef, RuleId, RULES};
pub use unicode::{classify, Classifier, PropertyFlags, UnicodeClassifier};
