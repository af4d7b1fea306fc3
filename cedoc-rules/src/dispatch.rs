//! Event dispatcher.
//!
//! One dispatcher serves every rule: it looks up the top rule, rejects
//! illegal events with a [`RuleError::StructuralViolation`], applies the
//! rule's built-in reaction when it has one, and otherwise hands the event
//! to a [`RuleHandler`].
//!
//! ```text
//! event ──▶ allows_type? ──no──▶ StructuralViolation
//!                │
//!               yes
//!                │
//!        default reaction? ──yes──▶ apply to Context
//!                │
//!               no
//!                ▼
//!        RuleHandler::handle(ctx, event)
//! ```

use memchr::memchr2;
use tracing::{debug, trace};

use crate::context::Context;
use crate::datatype::DataType;
use crate::error::RuleError;
use crate::event::{Event, Method};
use crate::rule::{Reaction, RuleId};
use crate::unicode::{validate_identifier, validate_text};

/// Receives legal events that have no built-in reaction in the current rule.
///
/// Implementations own whatever state change the event implies: when they
/// start or end a container they push or pop through the context.
pub trait RuleHandler {
    fn handle(&mut self, ctx: &mut Context, event: &Event<'_>) -> Result<(), RuleError>;
}

impl<H: RuleHandler + ?Sized> RuleHandler for &mut H {
    fn handle(&mut self, ctx: &mut Context, event: &Event<'_>) -> Result<(), RuleError> {
        (**self).handle(ctx, event)
    }
}

/// Validate one event against the current rule and apply its reaction.
pub fn dispatch<H: RuleHandler + ?Sized>(
    ctx: &mut Context,
    handler: &mut H,
    event: &Event<'_>,
) -> Result<(), RuleError> {
    let method = event.method();
    let data_type = event.data_type();
    let rule = ctx.current_rule();

    if !event.is_well_typed() || !rule.allows_type(method, data_type) {
        debug!(rule = rule.name, method = method.name(), %data_type, "structural violation");
        return Err(RuleError::violation(rule.name, method, data_type));
    }

    match rule.default_reaction(method) {
        Some(reaction) => {
            trace!(rule = rule.name, method = method.name(), ?reaction, "default");
            apply(ctx, reaction, event)
        }
        None => {
            trace!(rule = rule.name, method = method.name(), "forward");
            handler.handle(ctx, event)
        }
    }
}

/// Apply a built-in reaction.
pub fn apply(ctx: &mut Context, reaction: Reaction, event: &Event<'_>) -> Result<(), RuleError> {
    let method = event.method();
    match reaction {
        Reaction::Nothing => Ok(()),
        Reaction::Switch(rule) => {
            ctx.switch_rule(rule);
            Ok(())
        }
        Reaction::Complete => ctx.complete_object(method, event.data_type()),
        Reaction::Open(entry) => ctx.open_container(method, event.data_type(), entry),
        Reaction::OpenArray => match event {
            Event::ArrayBegin(array_type) => ctx.begin_array(method, *array_type),
            _ => Err(mismatch(ctx, event)),
        },
        Reaction::Chunk => match event {
            Event::ArrayChunk {
                length,
                more_chunks_follow,
            } => ctx.begin_chunk(*length, *more_chunks_follow),
            _ => Err(mismatch(ctx, event)),
        },
        Reaction::Data => match event {
            Event::ArrayData(data) => ctx.consume_data(data),
            _ => Err(mismatch(ctx, event)),
        },
        Reaction::Close => ctx.pop_rule().map(|_| ()),
    }
}

fn mismatch(ctx: &Context, event: &Event<'_>) -> RuleError {
    RuleError::violation(ctx.current_rule().name, event.method(), event.data_type())
}

/// The generic structure checker.
///
/// Handles every event that needs more than a push or pop: version checks,
/// marker and reference bookkeeping, record types, payload validation and
/// end of document. Events that reach it but do have a generic reaction
/// are applied as defaults, so it can back any rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureChecker;

impl StructureChecker {
    pub fn new() -> Self {
        Self
    }

    fn version(&mut self, ctx: &mut Context, version: u64) -> Result<(), RuleError> {
        let expected = ctx.options().version;
        if version != expected {
            return Err(RuleError::UnsupportedVersion {
                found: version,
                expected,
            });
        }
        ctx.switch_rule(RuleId::TopLevel);
        Ok(())
    }

    fn comment(&mut self, ctx: &mut Context, multiline: bool, contents: &[u8]) -> Result<(), RuleError> {
        if !multiline {
            if let Some(pos) = memchr2(b'\n', b'\r', contents) {
                return Err(RuleError::InvalidText {
                    offset: pos,
                    reason: "line break in single-line comment",
                });
            }
        }
        let text = std::str::from_utf8(contents).map_err(|e| RuleError::InvalidText {
            offset: e.valid_up_to(),
            reason: "invalid UTF-8",
        })?;
        validate_text(ctx.classifier(), text, multiline, 0)
    }

    fn marker(&mut self, ctx: &mut Context, identifier: &[u8]) -> Result<(), RuleError> {
        let rule = ctx.current_rule();
        let Some(target) = rule.marked else {
            return Err(RuleError::violation(rule.name, Method::Marker, DataType::MARKER));
        };
        validate_identifier(ctx.classifier(), identifier, ctx.options().max_identifier_length)?;
        ctx.define_marker(identifier)?;
        ctx.open_container(Method::Marker, DataType::MARKER, target)
    }

    fn reference(&mut self, ctx: &mut Context, identifier: &[u8]) -> Result<(), RuleError> {
        validate_identifier(ctx.classifier(), identifier, ctx.options().max_identifier_length)?;
        ctx.reference_marker(identifier)?;
        ctx.complete_object(Method::LocalReference, DataType::LOCAL_REFERENCE)
    }

    fn record_type(&mut self, ctx: &mut Context, identifier: &[u8]) -> Result<(), RuleError> {
        validate_identifier(ctx.classifier(), identifier, ctx.options().max_identifier_length)?;
        if ctx.has_record_type(identifier) {
            return Err(RuleError::DuplicateRecordType(
                String::from_utf8_lossy(identifier).into_owned(),
            ));
        }
        // A definition is not the document's object: the slot stays open.
        if ctx.rule() == RuleId::Version {
            ctx.switch_rule(RuleId::TopLevel);
        }
        ctx.push_rule(RuleId::RecordTypeKey)?;
        ctx.set_identifier(identifier);
        Ok(())
    }

    fn record(&mut self, ctx: &mut Context, identifier: &[u8]) -> Result<(), RuleError> {
        validate_identifier(ctx.classifier(), identifier, ctx.options().max_identifier_length)?;
        let Some(keys) = ctx.record_type_keys(identifier) else {
            return Err(RuleError::UndefinedRecordType(
                String::from_utf8_lossy(identifier).into_owned(),
            ));
        };
        ctx.open_container(Method::Record, DataType::RECORD, RuleId::Record)?;
        ctx.set_identifier(identifier);
        ctx.expect_objects(keys);
        Ok(())
    }

    fn end_container(&mut self, ctx: &mut Context) -> Result<(), RuleError> {
        let frame = ctx.frame();
        match frame.rule() {
            RuleId::RecordTypeKey => {
                let identifier = frame.identifier().unwrap_or_default().to_vec();
                let keys = frame.objects();
                ctx.pop_rule()?;
                ctx.define_record_type(&identifier, keys)
            }
            RuleId::Record if frame.expected().is_some_and(|n| frame.objects() < n) => Err(
                RuleError::violation(RuleId::Record.name(), Method::EndContainer, DataType::empty()),
            ),
            _ => ctx.pop_rule().map(|_| ()),
        }
    }

    fn array(&mut self, ctx: &mut Context, event: &Event<'_>) -> Result<(), RuleError> {
        let max = ctx.options().max_array_size;
        let (data_len, limit_ok) = match event {
            Event::Array {
                array_type,
                element_count,
                data,
            } => {
                let actual = data.len() as u64;
                let expected = array_type.byte_length(*element_count);
                if expected != Some(actual) {
                    return Err(RuleError::ArrayLengthMismatch {
                        array_type: *array_type,
                        element_count: *element_count,
                        expected: expected.unwrap_or(u64::MAX),
                        actual,
                    });
                }
                if array_type.is_stringlike() {
                    let text = std::str::from_utf8(data).map_err(|e| RuleError::InvalidText {
                        offset: e.valid_up_to(),
                        reason: "invalid UTF-8",
                    })?;
                    validate_text(ctx.classifier(), text, true, 0)?;
                }
                (actual, actual <= max)
            }
            Event::StringlikeArray { data, .. } => {
                validate_text(ctx.classifier(), data, true, 0)?;
                let len = data.len() as u64;
                (len, len <= max)
            }
            Event::Media { media_type, data } => {
                if media_type.is_empty() {
                    return Err(RuleError::InvalidText {
                        offset: 0,
                        reason: "empty media type",
                    });
                }
                validate_text(ctx.classifier(), media_type, false, 0)?;
                let len = data.len() as u64;
                (len, len <= max)
            }
            _ => return Err(mismatch(ctx, event)),
        };
        if !limit_ok {
            return Err(RuleError::LimitExceeded {
                limit: "array size",
                max,
            });
        }
        trace!(bytes = data_len, "array payload");
        ctx.complete_object(event.method(), event.data_type())
    }

    fn end_document(&mut self, ctx: &mut Context) -> Result<(), RuleError> {
        if let Some(id) = ctx.unresolved_reference() {
            return Err(RuleError::UnresolvedReference(
                String::from_utf8_lossy(id).into_owned(),
            ));
        }
        ctx.switch_rule(RuleId::Terminal);
        Ok(())
    }
}

impl RuleHandler for StructureChecker {
    fn handle(&mut self, ctx: &mut Context, event: &Event<'_>) -> Result<(), RuleError> {
        match event {
            Event::Version(version) => self.version(ctx, *version),
            Event::Comment {
                multiline,
                contents,
            } => self.comment(ctx, *multiline, contents),
            Event::Marker(id) => self.marker(ctx, id),
            Event::LocalReference(id) => self.reference(ctx, id),
            Event::RecordType(id) => self.record_type(ctx, id),
            Event::Record(id) => self.record(ctx, id),
            Event::EndContainer => self.end_container(ctx),
            Event::Array { .. } | Event::StringlikeArray { .. } | Event::Media { .. } => {
                self.array(ctx, event)
            }
            Event::EndDocument => self.end_document(ctx),
            other => match Reaction::for_method(other.method()) {
                Some(reaction) => apply(ctx, reaction, other),
                None => Err(mismatch(ctx, other)),
            },
        }
    }
}
