//! Document events - the input of the rules state machine.
//!
//! This is a SAX-style event model: an upstream decoder emits one event per
//! syntactic element, with no accumulation. Structure is represented by
//! begin/end pairs.
//!
//! For containers: List, value events..., EndContainer
//! For maps: Map, key, value, key, value..., EndContainer
//! For streamed arrays: ArrayBegin, (ArrayChunk, ArrayData...)...
//!
//! Every event resolves to a [`Method`], the event shape the rule table
//! reasons about.

use std::fmt;

use phf::phf_map;

use crate::datatype::{ArrayType, DataType};

/// Document events.
///
/// The lifetime `'a` refers to the decoder's buffer - identifiers and
/// payloads are zero-copy references into it.
///
/// ## Event Sequences
///
/// Map `{"a" = 1 "b" = [2 3]}` emits:
/// ```text
/// Map
/// StringlikeArray { String, "a" }
/// Int(1)
/// StringlikeArray { String, "b" }
/// List
/// Int(2)
/// Int(3)
/// EndContainer
/// EndContainer
/// ```
///
/// A string streamed in one 5-byte chunk emits:
/// ```text
/// ArrayBegin(String)
/// ArrayChunk { length: 5, more_chunks_follow: false }
/// ArrayData("hel")
/// ArrayData("lo")
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    // ========== Document Events ==========
    BeginDocument,

    /// Format version declared after the document begins.
    Version(u64),

    EndDocument,

    // ========== Invisible Events ==========
    Padding,

    Comment {
        multiline: bool,
        contents: &'a [u8],
    },

    // ========== Scalar Events ==========
    Null,

    Bool(bool),

    Int(i64),

    Float(f64),

    Uid([u8; 16]),

    Time {
        seconds: i64,
        nanos: u32,
    },

    // ========== Container Events ==========
    List,

    Map,

    /// Record type definition: `identifier` followed by its keys.
    RecordType(&'a [u8]),

    /// Record instance of a previously defined record type.
    Record(&'a [u8]),

    Edge,

    Node,

    EndContainer,

    // ========== Reference Events ==========
    /// Marks the next object so it can be referenced by `identifier`.
    Marker(&'a [u8]),

    LocalReference(&'a [u8]),

    // ========== Array Events ==========
    /// Complete array in one event.
    Array {
        array_type: ArrayType,
        element_count: u64,
        data: &'a [u8],
    },

    /// Complete string-like array in one event.
    StringlikeArray {
        array_type: ArrayType,
        data: &'a str,
    },

    /// Complete media object: a media type plus opaque payload.
    Media {
        media_type: &'a str,
        data: &'a [u8],
    },

    /// Start of a streamed array. Chunks follow.
    ArrayBegin(ArrayType),

    /// Chunk header. `length` counts elements, not bytes.
    ArrayChunk {
        length: u64,
        more_chunks_follow: bool,
    },

    /// Payload bytes for the current chunk.
    ArrayData(&'a [u8]),
}

impl<'a> Event<'a> {
    /// Convenience constructor for a complete string.
    pub fn string(data: &'a str) -> Self {
        Event::StringlikeArray {
            array_type: ArrayType::String,
            data,
        }
    }

    /// Convenience constructor for a complete resource identifier.
    pub fn resource_id(data: &'a str) -> Self {
        Event::StringlikeArray {
            array_type: ArrayType::ResourceId,
            data,
        }
    }

    /// Resolve the event to the method the rule table reasons about.
    pub fn method(&self) -> Method {
        match self {
            Event::BeginDocument => Method::BeginDocument,
            Event::Version(_) => Method::Version,
            Event::EndDocument => Method::EndDocument,
            Event::Padding => Method::Padding,
            Event::Comment { .. } => Method::Comment,
            Event::Null => Method::Null,
            Event::Float(value) if value.is_nan() => Method::NonKeyable,
            Event::Bool(_)
            | Event::Int(_)
            | Event::Float(_)
            | Event::Uid(_)
            | Event::Time { .. } => Method::Keyable,
            Event::List => Method::List,
            Event::Map => Method::Map,
            Event::RecordType(_) => Method::RecordType,
            Event::Record(_) => Method::Record,
            Event::Edge => Method::Edge,
            Event::Node => Method::Node,
            Event::EndContainer => Method::EndContainer,
            Event::Marker(_) => Method::Marker,
            Event::LocalReference(_) => Method::LocalReference,
            Event::Array { array_type, .. } if array_type.is_stringlike() => {
                Method::StringlikeArray
            }
            Event::Array { .. } | Event::Media { .. } => Method::Array,
            Event::StringlikeArray { .. } => Method::StringlikeArray,
            Event::ArrayBegin(_) => Method::ArrayBegin,
            Event::ArrayChunk { .. } => Method::ArrayChunk,
            Event::ArrayData(_) => Method::ArrayData,
        }
    }

    /// The concrete data type carried by this event.
    ///
    /// Typed events yield a single leaf. Structural events fall back to
    /// their method's associated types, which is empty for most of them.
    pub fn data_type(&self) -> DataType {
        match self {
            Event::Padding => DataType::PADDING,
            Event::Comment { .. } => DataType::COMMENT,
            Event::Null => DataType::NULL,
            Event::Bool(_) => DataType::BOOL,
            Event::Int(_) => DataType::INT,
            Event::Float(_) => DataType::FLOAT,
            Event::Uid(_) => DataType::UID,
            Event::Time { .. } => DataType::TIME,
            Event::List => DataType::LIST,
            Event::Map => DataType::MAP,
            Event::RecordType(_) => DataType::RECORD_TYPE,
            Event::Record(_) => DataType::RECORD,
            Event::Edge => DataType::EDGE,
            Event::Node => DataType::NODE,
            Event::Marker(_) => DataType::MARKER,
            Event::LocalReference(_) => DataType::LOCAL_REFERENCE,
            Event::Array { array_type, .. }
            | Event::StringlikeArray { array_type, .. }
            | Event::ArrayBegin(array_type) => array_type.data_type(),
            Event::Media { .. } => DataType::MEDIA,
            other => other.method().types(),
        }
    }

    /// Whether the array type carried by the event fits the event's shape.
    ///
    /// String-like events carry text types only. Media travels as
    /// [`Event::Media`] or as a streamed array, never as a plain `Array`.
    pub fn is_well_typed(&self) -> bool {
        match self {
            Event::Array {
                array_type: ArrayType::Media,
                ..
            } => false,
            _ => self.method().types().contains(self.data_type()),
        }
    }

    /// Check if this event carries a complete value (fills a slot by itself).
    pub fn is_scalar(&self) -> bool {
        self.method().category() == MethodCategory::Scalar
    }
}

/// Category used for legality lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodCategory {
    /// Structural events: document, containers, markup.
    Other,
    /// Complete values.
    Scalar,
    /// Array streaming events.
    Array,
}

/// Event descriptor: one event shape the dispatcher can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    BeginDocument,
    Version,
    Padding,
    Comment,
    Null,
    Keyable,
    NonKeyable,
    List,
    Map,
    RecordType,
    Record,
    Edge,
    Node,
    EndContainer,
    Marker,
    LocalReference,
    Array,
    StringlikeArray,
    ArrayBegin,
    ArrayChunk,
    ArrayData,
    EndDocument,
}

static METHODS_BY_NAME: phf::Map<&'static str, Method> = phf_map! {
    "begin_document" => Method::BeginDocument,
    "version" => Method::Version,
    "padding" => Method::Padding,
    "comment" => Method::Comment,
    "null" => Method::Null,
    "keyable" => Method::Keyable,
    "non_keyable" => Method::NonKeyable,
    "list" => Method::List,
    "map" => Method::Map,
    "record_type" => Method::RecordType,
    "record" => Method::Record,
    "edge" => Method::Edge,
    "node" => Method::Node,
    "end_container" => Method::EndContainer,
    "marker" => Method::Marker,
    "local_reference" => Method::LocalReference,
    "array" => Method::Array,
    "stringlike_array" => Method::StringlikeArray,
    "array_begin" => Method::ArrayBegin,
    "array_chunk" => Method::ArrayChunk,
    "array_data" => Method::ArrayData,
    "end_document" => Method::EndDocument,
};

impl Method {
    /// The global method catalogue.
    pub const ALL: [Method; 22] = [
        Method::BeginDocument,
        Method::Version,
        Method::Padding,
        Method::Comment,
        Method::Null,
        Method::Keyable,
        Method::NonKeyable,
        Method::List,
        Method::Map,
        Method::RecordType,
        Method::Record,
        Method::Edge,
        Method::Node,
        Method::EndContainer,
        Method::Marker,
        Method::LocalReference,
        Method::Array,
        Method::StringlikeArray,
        Method::ArrayBegin,
        Method::ArrayChunk,
        Method::ArrayData,
        Method::EndDocument,
    ];

    /// Snake-case name, as used in diagnostics and fixtures.
    pub fn name(self) -> &'static str {
        match self {
            Method::BeginDocument => "begin_document",
            Method::Version => "version",
            Method::Padding => "padding",
            Method::Comment => "comment",
            Method::Null => "null",
            Method::Keyable => "keyable",
            Method::NonKeyable => "non_keyable",
            Method::List => "list",
            Method::Map => "map",
            Method::RecordType => "record_type",
            Method::Record => "record",
            Method::Edge => "edge",
            Method::Node => "node",
            Method::EndContainer => "end_container",
            Method::Marker => "marker",
            Method::LocalReference => "local_reference",
            Method::Array => "array",
            Method::StringlikeArray => "stringlike_array",
            Method::ArrayBegin => "array_begin",
            Method::ArrayChunk => "array_chunk",
            Method::ArrayData => "array_data",
            Method::EndDocument => "end_document",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        METHODS_BY_NAME.get(name).copied()
    }

    pub fn category(self) -> MethodCategory {
        match self {
            Method::Null
            | Method::Keyable
            | Method::NonKeyable
            | Method::LocalReference
            | Method::Array
            | Method::StringlikeArray => MethodCategory::Scalar,
            Method::ArrayBegin | Method::ArrayChunk | Method::ArrayData => MethodCategory::Array,
            _ => MethodCategory::Other,
        }
    }

    /// Data types this method can represent. Empty for purely structural
    /// methods, which rules admit through their include-lists.
    pub fn types(self) -> DataType {
        match self {
            Method::BeginDocument
            | Method::Version
            | Method::EndContainer
            | Method::ArrayChunk
            | Method::ArrayData
            | Method::EndDocument => DataType::empty(),
            Method::Padding => DataType::PADDING,
            Method::Comment => DataType::COMMENT,
            Method::Null => DataType::NULL,
            Method::Keyable => DataType::BOOL
                .union(DataType::INT)
                .union(DataType::FLOAT)
                .union(DataType::UID)
                .union(DataType::TIME),
            Method::NonKeyable => DataType::FLOAT,
            Method::List => DataType::LIST,
            Method::Map => DataType::MAP,
            Method::RecordType => DataType::RECORD_TYPE,
            Method::Record => DataType::RECORD,
            Method::Edge => DataType::EDGE,
            Method::Node => DataType::NODE,
            Method::Marker => DataType::MARKER,
            Method::LocalReference => DataType::LOCAL_REFERENCE,
            Method::Array => DataType::BINARY.union(DataType::MEDIA),
            Method::StringlikeArray => DataType::STRINGLIKE,
            Method::ArrayBegin => DataType::ALL_ARRAYS,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
