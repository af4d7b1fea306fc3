//! The rule table.
//!
//! A rule is one position in the document grammar. Each rule declares which
//! data types and structural methods are legal while it is on top of the
//! stack, which of those have a built-in reaction, and what happens to the
//! rule once an object fills its slot.
//!
//! ```text
//! BeginDocument ─begin─▶ Version ─version─▶ TopLevel ─object─▶ EndDocument ─end─▶ Terminal
//!                          │                   │
//!                          └──────object───────┴──record type──▶ (stays TopLevel)
//!
//! Map:    MapKey ─key─▶ MapValue ─value─▶ MapKey ... EndContainer
//! Edge:   EdgeSource ─▶ EdgeDescription ─▶ EdgeDestination ─▶ AwaitEnd
//! Node:   NodeValue ─▶ Node (children) ... EndContainer
//! Arrays: Array ─chunk─▶ ArrayChunk ─data*─▶ (Array | pop)
//! ```
//!
//! Opening a container completes the current slot first and then pushes
//! the container's entry rule, so `EndContainer` is a plain pop that lands
//! on whatever slot the parent designated next.

use std::fmt;

use crate::datatype::{ArrayType, DataType};
use crate::event::Method;

/// Identifier of a rule (a state of the pushdown automaton).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    BeginDocument,
    /// Optional version slot. Anything legal at top level is legal here too.
    Version,
    TopLevel,
    /// Top-level object seen, awaiting end of document.
    EndDocument,
    Terminal,
    List,
    MapKey,
    MapValue,
    RecordTypeKey,
    Record,
    /// Binary array awaiting a chunk header.
    Array,
    /// Binary array inside a chunk, awaiting data.
    ArrayChunk,
    String,
    StringChunk,
    MediaType,
    MediaTypeChunk,
    MarkedObjectKeyable,
    MarkedObjectAnyType,
    EdgeSource,
    EdgeDescription,
    EdgeDestination,
    AwaitEnd,
    NodeValue,
    Node,
}

impl RuleId {
    pub const ALL: [RuleId; 24] = [
        RuleId::BeginDocument,
        RuleId::Version,
        RuleId::TopLevel,
        RuleId::EndDocument,
        RuleId::Terminal,
        RuleId::List,
        RuleId::MapKey,
        RuleId::MapValue,
        RuleId::RecordTypeKey,
        RuleId::Record,
        RuleId::Array,
        RuleId::ArrayChunk,
        RuleId::String,
        RuleId::StringChunk,
        RuleId::MediaType,
        RuleId::MediaTypeChunk,
        RuleId::MarkedObjectKeyable,
        RuleId::MarkedObjectAnyType,
        RuleId::EdgeSource,
        RuleId::EdgeDescription,
        RuleId::EdgeDestination,
        RuleId::AwaitEnd,
        RuleId::NodeValue,
        RuleId::Node,
    ];

    /// The rule's static definition.
    #[inline]
    pub fn def(self) -> &'static RuleDef {
        &RULES[self as usize]
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.def().name
    }

    /// Header rule a chunked array returns to between chunks.
    pub fn chunk_header(self) -> Option<RuleId> {
        match self {
            RuleId::Array | RuleId::ArrayChunk => Some(RuleId::Array),
            RuleId::String | RuleId::StringChunk => Some(RuleId::String),
            RuleId::MediaType | RuleId::MediaTypeChunk => Some(RuleId::MediaType),
            _ => None,
        }
    }

    /// Data rule entered once a chunk header announces a non-empty chunk.
    pub fn chunk_data(self) -> Option<RuleId> {
        match self {
            RuleId::Array => Some(RuleId::ArrayChunk),
            RuleId::String => Some(RuleId::StringChunk),
            RuleId::MediaType => Some(RuleId::MediaTypeChunk),
            _ => None,
        }
    }

    /// Chunk data for this rule is UTF-8 text.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            RuleId::String | RuleId::StringChunk | RuleId::MediaType | RuleId::MediaTypeChunk
        )
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens to a rule once an object has filled its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// The rule accepts further objects (lists, node children, records).
    Stay,
    /// Replace the rule with the next slot's rule.
    Advance(RuleId),
    /// The rule held a single object and is done.
    Pop,
}

/// Built-in reaction applied without involving the rule handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Legal, no state change (padding).
    Nothing,
    /// Replace the current rule.
    Switch(RuleId),
    /// A complete value filled the current slot.
    Complete,
    /// Complete the current slot, then push a container's entry rule.
    Open(RuleId),
    /// Complete the current slot, then push the rule for the array type.
    OpenArray,
    /// Chunk header of a streamed array.
    Chunk,
    /// Payload bytes of a streamed array.
    Data,
    /// Pop back to the parent's next slot.
    Close,
}

impl Reaction {
    /// The reaction a method gets when a rule lists it as a default.
    /// Methods that always need rule-specific logic have none.
    pub fn for_method(method: Method) -> Option<Reaction> {
        let reaction = match method {
            Method::BeginDocument => Reaction::Switch(RuleId::Version),
            Method::Padding => Reaction::Nothing,
            Method::Null | Method::Keyable | Method::NonKeyable => Reaction::Complete,
            Method::List | Method::Map | Method::Edge | Method::Node => {
                Reaction::Open(entry_rule(method)?)
            }
            Method::ArrayBegin => Reaction::OpenArray,
            Method::ArrayChunk => Reaction::Chunk,
            Method::ArrayData => Reaction::Data,
            Method::EndContainer => Reaction::Close,
            _ => return None,
        };
        Some(reaction)
    }
}

/// Rule pushed when a container method opens a new container.
pub fn entry_rule(method: Method) -> Option<RuleId> {
    match method {
        Method::List => Some(RuleId::List),
        Method::Map => Some(RuleId::MapKey),
        Method::RecordType => Some(RuleId::RecordTypeKey),
        Method::Record => Some(RuleId::Record),
        Method::Edge => Some(RuleId::EdgeSource),
        Method::Node => Some(RuleId::NodeValue),
        _ => None,
    }
}

/// Rule pushed when a streamed array of `array_type` begins.
pub fn array_entry_rule(array_type: ArrayType) -> RuleId {
    if array_type.is_stringlike() {
        RuleId::String
    } else if array_type == ArrayType::Media {
        RuleId::MediaType
    } else {
        RuleId::Array
    }
}

/// Static definition of a rule.
#[derive(Debug)]
pub struct RuleDef {
    pub id: RuleId,
    /// Friendly name used in diagnostics.
    pub name: &'static str,
    pub allowed_types: DataType,
    /// Methods legal regardless of type bits.
    pub includes: &'static [Method],
    /// Methods illegal regardless of type bits. Wins over everything.
    pub excludes: &'static [Method],
    /// Legal methods with a built-in reaction. Everything else legal goes
    /// to the rule handler.
    pub defaults: &'static [Method],
    pub next: Next,
    /// Counts toward container depth.
    pub container: bool,
    /// Rule pushed when a marker appears in this rule's slot.
    pub marked: Option<RuleId>,
}

impl RuleDef {
    /// Method-level legality: `method` with all the types it can represent.
    pub fn allows(&self, method: Method) -> bool {
        self.allows_type(method, method.types())
    }

    /// Legality of `method` carrying `data_type`.
    ///
    /// 1. excluded methods are never legal
    /// 2. otherwise any overlap with the allowed types is legal
    /// 3. otherwise an included method is legal
    pub fn allows_type(&self, method: Method, data_type: DataType) -> bool {
        if self.excludes.contains(&method) {
            return false;
        }
        if self.allowed_types.intersects(data_type) {
            return true;
        }
        self.includes.contains(&method)
    }

    /// Built-in reaction for `method`, if this rule declares one.
    pub fn default_reaction(&self, method: Method) -> Option<Reaction> {
        if self.defaults.contains(&method) {
            Reaction::for_method(method)
        } else {
            None
        }
    }
}

/// `(rule, method) -> reaction` lookup over the default reactions.
pub fn transition(rule: RuleId, method: Method) -> Option<Reaction> {
    rule.def().default_reaction(method)
}

// =============================================================================
// Table
// =============================================================================

use Method as M;

const NONE: &[Method] = &[];
const END: &[Method] = &[M::EndContainer];

const VALUES: &[Method] = &[
    M::Padding,
    M::Null,
    M::Keyable,
    M::NonKeyable,
    M::List,
    M::Map,
    M::Edge,
    M::Node,
    M::ArrayBegin,
];

const VALUES_AND_END: &[Method] = &[
    M::Padding,
    M::Null,
    M::Keyable,
    M::NonKeyable,
    M::List,
    M::Map,
    M::Edge,
    M::Node,
    M::ArrayBegin,
    M::EndContainer,
];

const NON_NULL_VALUES: &[Method] = &[
    M::Padding,
    M::Keyable,
    M::NonKeyable,
    M::List,
    M::Map,
    M::Edge,
    M::Node,
    M::ArrayBegin,
];

const KEYS: &[Method] = &[M::Padding, M::Keyable, M::ArrayBegin];

const KEYS_AND_END: &[Method] = &[M::Padding, M::Keyable, M::ArrayBegin, M::EndContainer];

const INV: DataType = DataType::INVISIBLE;

/// Indexed by `RuleId as usize`.
pub static RULES: [RuleDef; 24] = [
    RuleDef {
        id: RuleId::BeginDocument,
        name: "begin document",
        allowed_types: DataType::empty(),
        includes: &[M::BeginDocument],
        excludes: NONE,
        defaults: &[M::BeginDocument],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::Version,
        name: "document start",
        allowed_types: DataType::ALLOW_TOP_LEVEL.union(INV),
        includes: &[M::Version],
        excludes: NONE,
        defaults: VALUES,
        next: Next::Advance(RuleId::EndDocument),
        container: false,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::TopLevel,
        name: "top level",
        allowed_types: DataType::ALLOW_TOP_LEVEL.union(INV),
        includes: NONE,
        excludes: NONE,
        defaults: VALUES,
        next: Next::Advance(RuleId::EndDocument),
        container: false,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::EndDocument,
        name: "end of document",
        allowed_types: INV,
        includes: &[M::EndDocument],
        excludes: NONE,
        defaults: &[M::Padding],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::Terminal,
        name: "terminal",
        allowed_types: DataType::empty(),
        includes: NONE,
        excludes: NONE,
        defaults: NONE,
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::List,
        name: "list",
        allowed_types: DataType::ALLOW_ANY.union(INV),
        includes: END,
        excludes: NONE,
        defaults: VALUES_AND_END,
        next: Next::Stay,
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::MapKey,
        name: "map key",
        allowed_types: DataType::ALLOW_KEYABLE.union(INV),
        includes: END,
        excludes: &[M::NonKeyable],
        defaults: KEYS_AND_END,
        next: Next::Advance(RuleId::MapValue),
        container: true,
        marked: Some(RuleId::MarkedObjectKeyable),
    },
    RuleDef {
        id: RuleId::MapValue,
        name: "map value",
        allowed_types: DataType::ALLOW_ANY.union(INV),
        includes: NONE,
        excludes: NONE,
        defaults: VALUES,
        next: Next::Advance(RuleId::MapKey),
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::RecordTypeKey,
        name: "record type key",
        allowed_types: DataType::ALLOW_KEYABLE.union(INV),
        includes: END,
        excludes: &[M::NonKeyable, M::Marker, M::LocalReference],
        defaults: KEYS,
        next: Next::Stay,
        container: true,
        marked: None,
    },
    RuleDef {
        id: RuleId::Record,
        name: "record",
        allowed_types: DataType::ALLOW_ANY.union(INV),
        includes: END,
        excludes: NONE,
        defaults: VALUES,
        next: Next::Stay,
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::Array,
        name: "array chunk header",
        allowed_types: DataType::empty(),
        includes: &[M::ArrayChunk],
        excludes: NONE,
        defaults: &[M::ArrayChunk],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::ArrayChunk,
        name: "array data",
        allowed_types: DataType::empty(),
        includes: &[M::ArrayData],
        excludes: NONE,
        defaults: &[M::ArrayData],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::String,
        name: "string chunk header",
        allowed_types: DataType::empty(),
        includes: &[M::ArrayChunk],
        excludes: NONE,
        defaults: &[M::ArrayChunk],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::StringChunk,
        name: "string data",
        allowed_types: DataType::empty(),
        includes: &[M::ArrayData],
        excludes: NONE,
        defaults: &[M::ArrayData],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::MediaType,
        name: "media type chunk header",
        allowed_types: DataType::empty(),
        includes: &[M::ArrayChunk],
        excludes: NONE,
        defaults: &[M::ArrayChunk],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::MediaTypeChunk,
        name: "media type data",
        allowed_types: DataType::empty(),
        includes: &[M::ArrayData],
        excludes: NONE,
        defaults: &[M::ArrayData],
        next: Next::Stay,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::MarkedObjectKeyable,
        name: "marked keyable object",
        allowed_types: DataType::ALLOW_KEYABLE
            .intersection(DataType::ALLOW_MARKABLE)
            .union(INV),
        includes: NONE,
        excludes: &[M::NonKeyable],
        defaults: KEYS,
        next: Next::Pop,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::MarkedObjectAnyType,
        name: "marked object",
        allowed_types: DataType::ALLOW_MARKABLE.union(INV),
        includes: NONE,
        excludes: NONE,
        defaults: NON_NULL_VALUES,
        next: Next::Pop,
        container: false,
        marked: None,
    },
    RuleDef {
        id: RuleId::EdgeSource,
        name: "edge source",
        allowed_types: DataType::ALLOW_NON_NULL.union(INV),
        includes: NONE,
        excludes: NONE,
        defaults: NON_NULL_VALUES,
        next: Next::Advance(RuleId::EdgeDescription),
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::EdgeDescription,
        name: "edge description",
        allowed_types: DataType::ALLOW_ANY.union(INV),
        includes: NONE,
        excludes: NONE,
        defaults: VALUES,
        next: Next::Advance(RuleId::EdgeDestination),
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::EdgeDestination,
        name: "edge destination",
        allowed_types: DataType::ALLOW_NON_NULL.union(INV),
        includes: NONE,
        excludes: NONE,
        defaults: NON_NULL_VALUES,
        next: Next::Advance(RuleId::AwaitEnd),
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::AwaitEnd,
        name: "edge end",
        allowed_types: INV,
        includes: END,
        excludes: NONE,
        defaults: &[M::Padding, M::EndContainer],
        next: Next::Stay,
        container: true,
        marked: None,
    },
    RuleDef {
        id: RuleId::NodeValue,
        name: "node value",
        allowed_types: DataType::ALLOW_ANY.union(INV),
        includes: NONE,
        excludes: NONE,
        defaults: VALUES,
        next: Next::Advance(RuleId::Node),
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
    RuleDef {
        id: RuleId::Node,
        name: "node children",
        allowed_types: DataType::ALLOW_ANY.union(INV),
        includes: END,
        excludes: NONE,
        defaults: VALUES_AND_END,
        next: Next::Stay,
        container: true,
        marked: Some(RuleId::MarkedObjectAnyType),
    },
];
