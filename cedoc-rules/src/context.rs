//! Per-session validation context.
//!
//! The context is the stack of active rules plus the bookkeeping the
//! reactions need: object counts per frame, chunk progress for the array
//! being streamed, and the document-wide marker and record-type registries.
//!
//! The top frame is held outside the vector, so the stack can never be
//! empty: popping the last frame fails with [`RuleError::StackUnderflow`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::trace;

use crate::datatype::{ArrayType, DataType};
use crate::error::RuleError;
use crate::event::Method;
use crate::options::{over_limit, RuleOptions};
use crate::rule::{array_entry_rule, Next, RuleDef, RuleId};
use crate::unicode::{Classifier, TextStream, UnicodeClassifier};

/// Progress of the array currently being streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayProgress {
    pub array_type: ArrayType,
    /// Bytes still expected for the current chunk.
    pub remaining: u64,
    /// The current chunk announced that more chunks follow.
    pub more_chunks: bool,
    /// Bytes announced so far across all chunks.
    pub total: u64,
    text: Option<TextStream>,
}

impl ArrayProgress {
    fn new(array_type: ArrayType, text: Option<TextStream>) -> Self {
        Self {
            array_type,
            remaining: 0,
            more_chunks: true,
            total: 0,
            text,
        }
    }
}

/// One entry of the rule stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    rule: RuleId,
    objects: u64,
    expected: Option<u64>,
    array: Option<ArrayProgress>,
    identifier: Option<Box<[u8]>>,
}

impl Frame {
    fn new(rule: RuleId) -> Self {
        Self {
            rule,
            objects: 0,
            expected: None,
            array: None,
            identifier: None,
        }
    }

    pub fn rule(&self) -> RuleId {
        self.rule
    }

    /// Objects that have filled this frame's slots.
    pub fn objects(&self) -> u64 {
        self.objects
    }

    /// Exact number of objects this frame must receive, if bounded.
    pub fn expected(&self) -> Option<u64> {
        self.expected
    }

    pub fn array(&self) -> Option<&ArrayProgress> {
        self.array.as_ref()
    }

    /// Identifier of the record type this frame defines or instantiates.
    pub fn identifier(&self) -> Option<&[u8]> {
        self.identifier.as_deref()
    }
}

/// Mutable state of one validation session.
///
/// Owned by exactly one decode operation; never shared between sessions.
pub struct Context {
    current: Frame,
    parents: Vec<Frame>,
    /// Frames on the stack whose rule is a container rule.
    containers: usize,
    options: RuleOptions,
    classifier: Box<dyn Classifier + Send>,
    markers: HashSet<Box<[u8]>>,
    forward_references: BTreeSet<Box<[u8]>>,
    record_types: HashMap<Box<[u8]>, u64>,
    object_count: u64,
    reference_count: u64,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("current", &self.current)
            .field("parents", &self.parents)
            .field("options", &self.options)
            .field("markers", &self.markers.len())
            .field("record_types", &self.record_types.len())
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context awaiting `BeginDocument`, with default options.
    pub fn new() -> Self {
        Self::with_options(RuleOptions::default())
    }

    pub fn with_options(options: RuleOptions) -> Self {
        Self::with_classifier(options, UnicodeClassifier)
    }

    /// Create a context that classifies characters with `classifier`.
    pub fn with_classifier<C>(options: RuleOptions, classifier: C) -> Self
    where
        C: Classifier + Send + 'static,
    {
        Self {
            current: Frame::new(RuleId::BeginDocument),
            parents: Vec::with_capacity(16),
            containers: 0,
            options,
            classifier: Box::new(classifier),
            markers: HashSet::new(),
            forward_references: BTreeSet::new(),
            record_types: HashMap::new(),
            object_count: 0,
            reference_count: 0,
        }
    }

    pub fn options(&self) -> &RuleOptions {
        &self.options
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    // ========== Stack ==========

    /// The rule on top of the stack.
    #[inline]
    pub fn rule(&self) -> RuleId {
        self.current.rule
    }

    #[inline]
    pub fn current_rule(&self) -> &'static RuleDef {
        self.current.rule.def()
    }

    /// The top frame.
    pub fn frame(&self) -> &Frame {
        &self.current
    }

    /// Number of frames on the stack (always at least 1).
    pub fn depth(&self) -> usize {
        self.parents.len() + 1
    }

    /// Number of frames that belong to open containers.
    pub fn container_depth(&self) -> usize {
        self.containers
    }

    /// Frames from bottom to top.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.parents.iter().chain(std::iter::once(&self.current))
    }

    /// Rule names from bottom to top, for diagnostics.
    pub fn breadcrumbs(&self) -> Vec<&'static str> {
        self.frames().map(|f| f.rule.name()).collect()
    }

    /// Push a fresh frame for `rule`.
    pub fn push_rule(&mut self, rule: RuleId) -> Result<(), RuleError> {
        if rule.def().container {
            let max = self.options.max_container_depth;
            if self.containers >= max {
                return Err(RuleError::LimitExceeded {
                    limit: "container depth",
                    max: max as u64,
                });
            }
            self.containers += 1;
        }
        let parent = std::mem::replace(&mut self.current, Frame::new(rule));
        self.parents.push(parent);
        trace!(rule = rule.name(), depth = self.depth(), "push");
        Ok(())
    }

    /// Pop the top frame, resuming the parent's rule.
    pub fn pop_rule(&mut self) -> Result<RuleId, RuleError> {
        let parent = self.parents.pop().ok_or(RuleError::StackUnderflow {
            rule: self.current.rule.name(),
        })?;
        let popped = std::mem::replace(&mut self.current, parent);
        if popped.rule.def().container {
            self.containers -= 1;
        }
        trace!(
            popped = popped.rule.name(),
            rule = self.current.rule.name(),
            depth = self.depth(),
            "pop"
        );
        Ok(popped.rule)
    }

    /// Replace the top rule, keeping the frame's bookkeeping.
    pub fn switch_rule(&mut self, rule: RuleId) {
        trace!(from = self.current.rule.name(), to = rule.name(), "switch");
        match (self.current.rule.def().container, rule.def().container) {
            (false, true) => self.containers += 1,
            (true, false) => self.containers -= 1,
            _ => {}
        }
        self.current.rule = rule;
    }

    // ========== Objects ==========

    /// An object filled the current slot: apply the rule's `next`.
    ///
    /// `method` and `data_type` only feed the diagnostic when a bounded
    /// frame (a record) is already full.
    pub fn complete_object(&mut self, method: Method, data_type: DataType) -> Result<(), RuleError> {
        self.object_count += 1;
        if over_limit(self.object_count, self.options.max_object_count) {
            return Err(RuleError::LimitExceeded {
                limit: "object count",
                max: self.options.max_object_count,
            });
        }

        let rule = self.current_rule();
        match rule.next {
            Next::Stay => {
                if let Some(expected) = self.current.expected {
                    if self.current.objects >= expected {
                        return Err(RuleError::violation(rule.name, method, data_type));
                    }
                }
                self.current.objects += 1;
            }
            Next::Advance(next) => {
                self.current.objects += 1;
                self.switch_rule(next);
            }
            Next::Pop => {
                self.pop_rule()?;
            }
        }
        Ok(())
    }

    /// Complete the current slot with a container, then enter it.
    pub fn open_container(
        &mut self,
        method: Method,
        data_type: DataType,
        entry: RuleId,
    ) -> Result<(), RuleError> {
        self.complete_object(method, data_type)?;
        self.push_rule(entry)
    }

    /// Bound the top frame to exactly `count` objects.
    pub fn expect_objects(&mut self, count: u64) {
        self.current.expected = Some(count);
    }

    /// Tag the top frame with a record-type identifier.
    pub fn set_identifier(&mut self, identifier: &[u8]) {
        self.current.identifier = Some(identifier.into());
    }

    // ========== Arrays ==========

    /// Complete the current slot with an array and start streaming it.
    pub fn begin_array(&mut self, method: Method, array_type: ArrayType) -> Result<(), RuleError> {
        self.complete_object(method, array_type.data_type())?;
        let rule = array_entry_rule(array_type);
        self.push_rule(rule)?;
        let text = match rule {
            RuleId::MediaType => Some(TextStream::single_line()),
            _ if rule.is_text() => Some(TextStream::new()),
            _ => None,
        };
        self.current.array = Some(ArrayProgress::new(array_type, text));
        Ok(())
    }

    /// Chunk header: `length` elements, possibly followed by more chunks.
    pub fn begin_chunk(&mut self, length: u64, more_chunks_follow: bool) -> Result<(), RuleError> {
        let rule = self.current.rule;
        let max = self.options.max_array_size;
        let Some(progress) = self.current.array.as_mut() else {
            return Err(RuleError::violation(rule.name(), Method::ArrayChunk, DataType::empty()));
        };
        // Media types are text no matter what the payload is.
        let bytes = if rule.is_text() {
            Some(length)
        } else {
            progress.array_type.byte_length(length)
        };
        let total = bytes.and_then(|b| progress.total.checked_add(b));
        match total {
            Some(total) if total <= max => progress.total = total,
            _ => {
                return Err(RuleError::LimitExceeded {
                    limit: "array size",
                    max,
                })
            }
        }
        progress.remaining = bytes.unwrap_or(0);
        progress.more_chunks = more_chunks_follow;

        if progress.remaining == 0 {
            return self.finish_chunk();
        }
        if let Some(data_rule) = rule.chunk_data() {
            self.switch_rule(data_rule);
        }
        Ok(())
    }

    /// Payload bytes for the current chunk.
    pub fn consume_data(&mut self, data: &[u8]) -> Result<(), RuleError> {
        let rule = self.current.rule;
        let Some(progress) = self.current.array.as_mut() else {
            return Err(RuleError::violation(rule.name(), Method::ArrayData, DataType::empty()));
        };
        let received = data.len() as u64;
        if received > progress.remaining {
            return Err(RuleError::ChunkOverrun {
                remaining: progress.remaining,
                received,
            });
        }
        if let Some(text) = progress.text.as_mut() {
            text.feed(self.classifier.as_ref(), data)?;
        }
        progress.remaining -= received;
        if progress.remaining == 0 {
            self.finish_chunk()?;
        }
        Ok(())
    }

    /// Bytes still expected by the current chunk (0 outside arrays).
    pub fn chunk_remaining(&self) -> u64 {
        self.current.array.as_ref().map_or(0, |p| p.remaining)
    }

    fn finish_chunk(&mut self) -> Result<(), RuleError> {
        let rule = self.current.rule;
        let more = self.current.array.as_ref().map_or(false, |p| p.more_chunks);
        if more {
            if let Some(header) = rule.chunk_header() {
                self.switch_rule(header);
            }
            return Ok(());
        }

        if let Some(text) = self.current.array.as_mut().and_then(|p| p.text.as_mut()) {
            text.finish()?;
        }
        if matches!(rule, RuleId::MediaType | RuleId::MediaTypeChunk) {
            if self.current.array.as_ref().map_or(0, |p| p.total) == 0 {
                return Err(RuleError::InvalidText {
                    offset: 0,
                    reason: "empty media type",
                });
            }
            // Media type done; the payload follows as a binary array.
            self.current.array = Some(ArrayProgress::new(ArrayType::Media, None));
            self.switch_rule(RuleId::Array);
            return Ok(());
        }
        self.pop_rule()?;
        Ok(())
    }

    // ========== Markers and references ==========

    /// Register a marker identifier.
    pub fn define_marker(&mut self, identifier: &[u8]) -> Result<(), RuleError> {
        if !self.markers.insert(identifier.into()) {
            return Err(RuleError::DuplicateMarker(
                String::from_utf8_lossy(identifier).into_owned(),
            ));
        }
        let max = self.options.max_marker_count;
        if over_limit(self.markers.len() as u64, max) {
            return Err(RuleError::LimitExceeded {
                limit: "marker count",
                max,
            });
        }
        self.forward_references.remove(identifier);
        Ok(())
    }

    /// Record a reference. Unknown identifiers are kept as forward
    /// references until a matching marker appears.
    pub fn reference_marker(&mut self, identifier: &[u8]) -> Result<(), RuleError> {
        self.reference_count += 1;
        let max = self.options.max_reference_count;
        if over_limit(self.reference_count, max) {
            return Err(RuleError::LimitExceeded {
                limit: "reference count",
                max,
            });
        }
        if !self.markers.contains(identifier) {
            self.forward_references.insert(identifier.into());
        }
        Ok(())
    }

    pub fn has_marker(&self, identifier: &[u8]) -> bool {
        self.markers.contains(identifier)
    }

    /// First reference (in byte order) that no marker has resolved.
    pub fn unresolved_reference(&self) -> Option<&[u8]> {
        self.forward_references.iter().next().map(|id| &id[..])
    }

    // ========== Record types ==========

    pub fn define_record_type(&mut self, identifier: &[u8], key_count: u64) -> Result<(), RuleError> {
        if self.record_types.contains_key(identifier) {
            return Err(RuleError::DuplicateRecordType(
                String::from_utf8_lossy(identifier).into_owned(),
            ));
        }
        self.record_types.insert(identifier.into(), key_count);
        Ok(())
    }

    pub fn has_record_type(&self, identifier: &[u8]) -> bool {
        self.record_types.contains_key(identifier)
    }

    /// Key count of a defined record type.
    pub fn record_type_keys(&self, identifier: &[u8]) -> Option<u64> {
        self.record_types.get(identifier).copied()
    }

    /// Total objects completed in this session.
    pub fn object_count(&self) -> u64 {
        self.object_count
    }
}
