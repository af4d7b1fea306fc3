//! Semantic data types.
//!
//! Every document value has exactly one leaf kind. Rules describe whole
//! categories of legal values with composite masks, which are unions of
//! leaf bits and never introduce a bit of their own.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Bit-flag classification of a document value's semantic kind.
    ///
    /// Only the leaf kinds are declared inside the macro, so `iter_names()`
    /// and `Display` always spell a mask out in leaves. Composite masks
    /// live in the inherent impl below.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct DataType: u64 {
        // =====================================================================
        // SCALARS
        // =====================================================================

        const NULL = 1 << 0;
        const BOOL = 1 << 1;
        const INT = 1 << 2;
        const FLOAT = 1 << 3;
        const UID = 1 << 4;
        const TIME = 1 << 5;

        // =====================================================================
        // CONTAINERS
        // =====================================================================

        const LIST = 1 << 6;
        const MAP = 1 << 7;
        const RECORD_TYPE = 1 << 8;
        const RECORD = 1 << 9;
        const EDGE = 1 << 10;
        const NODE = 1 << 11;

        // =====================================================================
        // ARRAYS
        // =====================================================================

        const STRING = 1 << 12;
        const MEDIA = 1 << 13;
        const ARRAY_BIT = 1 << 14;
        const ARRAY_UINT8 = 1 << 15;
        const ARRAY_UINT16 = 1 << 16;
        const ARRAY_UINT32 = 1 << 17;
        const ARRAY_UINT64 = 1 << 18;
        const ARRAY_INT8 = 1 << 19;
        const ARRAY_INT16 = 1 << 20;
        const ARRAY_INT32 = 1 << 21;
        const ARRAY_INT64 = 1 << 22;
        const ARRAY_FLOAT16 = 1 << 23;
        const ARRAY_FLOAT32 = 1 << 24;
        const ARRAY_FLOAT64 = 1 << 25;
        const ARRAY_UID = 1 << 26;
        const CUSTOM_TEXT = 1 << 27;
        const CUSTOM_BINARY = 1 << 28;

        // =====================================================================
        // REFERENCES AND MARKUP
        // =====================================================================

        const MARKER = 1 << 29;
        const LOCAL_REFERENCE = 1 << 30;
        const RESOURCE_ID = 1 << 31;
        const REMOTE_REFERENCE = 1 << 32;

        // =====================================================================
        // INVISIBLE
        // =====================================================================

        const COMMENT = 1 << 33;
        const PADDING = 1 << 34;
    }
}

impl DataType {
    /// Number of leaf kinds.
    pub const LEAF_COUNT: u32 = 35;

    /// Union of every leaf bit.
    pub const LEAVES: Self = Self::from_bits_retain((1 << Self::LEAF_COUNT) - 1);

    /// Typed numeric arrays.
    pub const NUMERIC_ARRAYS: Self = Self::from_bits_retain(
        Self::ARRAY_BIT.bits()
            | Self::ARRAY_UINT8.bits()
            | Self::ARRAY_UINT16.bits()
            | Self::ARRAY_UINT32.bits()
            | Self::ARRAY_UINT64.bits()
            | Self::ARRAY_INT8.bits()
            | Self::ARRAY_INT16.bits()
            | Self::ARRAY_INT32.bits()
            | Self::ARRAY_INT64.bits()
            | Self::ARRAY_FLOAT16.bits()
            | Self::ARRAY_FLOAT32.bits()
            | Self::ARRAY_FLOAT64.bits()
            | Self::ARRAY_UID.bits(),
    );

    /// Arrays whose payload is UTF-8 text.
    pub const STRINGLIKE: Self = Self::from_bits_retain(
        Self::STRING.bits()
            | Self::RESOURCE_ID.bits()
            | Self::REMOTE_REFERENCE.bits()
            | Self::CUSTOM_TEXT.bits(),
    );

    /// Arrays whose payload is opaque bytes.
    pub const BINARY: Self = Self::NUMERIC_ARRAYS.union(Self::CUSTOM_BINARY);

    pub const ALL_ARRAYS: Self = Self::STRINGLIKE.union(Self::BINARY).union(Self::MEDIA);

    pub const CONTAINER: Self = Self::from_bits_retain(
        Self::LIST.bits()
            | Self::MAP.bits()
            | Self::RECORD_TYPE.bits()
            | Self::RECORD.bits()
            | Self::EDGE.bits()
            | Self::NODE.bits(),
    );

    /// Comments and padding: legal wherever the grammar tolerates filler.
    pub const INVISIBLE: Self = Self::COMMENT.union(Self::PADDING);

    /// Any value that may occupy a slot. Record types are definitions,
    /// not values, so they are only admitted by [`Self::ALLOW_TOP_LEVEL`].
    pub const ALLOW_ANY: Self = Self::LEAVES
        .difference(Self::RECORD_TYPE)
        .difference(Self::INVISIBLE);

    pub const ALLOW_NON_NULL: Self = Self::ALLOW_ANY.difference(Self::NULL);

    pub const ALLOW_TOP_LEVEL: Self = Self::ALLOW_ANY.union(Self::RECORD_TYPE);

    pub const ALLOW_KEYABLE: Self = Self::from_bits_retain(
        Self::BOOL.bits()
            | Self::INT.bits()
            | Self::FLOAT.bits()
            | Self::UID.bits()
            | Self::TIME.bits()
            | Self::STRING.bits()
            | Self::RESOURCE_ID.bits()
            | Self::MARKER.bits()
            | Self::LOCAL_REFERENCE.bits(),
    );

    pub const ALLOW_MARKABLE: Self = Self::ALLOW_NON_NULL
        .difference(Self::MARKER)
        .difference(Self::LOCAL_REFERENCE)
        .difference(Self::REMOTE_REFERENCE);

    pub const ALLOW_STRING: Self = Self::STRING;

    pub const ALLOW_RESOURCE_ID: Self = Self::RESOURCE_ID;

    /// True if exactly one leaf bit is set.
    pub fn is_leaf(self) -> bool {
        self.bits().count_ones() == 1 && Self::LEAVES.contains(self)
    }

    /// Look up a named composite mask (`"any"`, `"keyable"`, ...).
    pub fn composite(name: &str) -> Option<Self> {
        let mask = match name {
            "any" => Self::ALLOW_ANY,
            "non_null" => Self::ALLOW_NON_NULL,
            "top_level" => Self::ALLOW_TOP_LEVEL,
            "keyable" => Self::ALLOW_KEYABLE,
            "markable" => Self::ALLOW_MARKABLE,
            "string" => Self::ALLOW_STRING,
            "resource_id" => Self::ALLOW_RESOURCE_ID,
            "container" => Self::CONTAINER,
            "stringlike" => Self::STRINGLIKE,
            "binary" => Self::BINARY,
            "all_arrays" => Self::ALL_ARRAYS,
            "invisible" => Self::INVISIBLE,
            _ => return None,
        };
        Some(mask)
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::empty()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(&name.to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// Element type of an array-shaped value.
///
/// Strings, resource identifiers and the like are arrays too: they arrive
/// through the same begin/chunk/data events as typed numeric arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayType {
    String,
    ResourceId,
    RemoteReference,
    CustomText,
    CustomBinary,
    Media,
    Bit,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
    Uid,
}

impl ArrayType {
    pub const ALL: [ArrayType; 19] = [
        Self::String,
        Self::ResourceId,
        Self::RemoteReference,
        Self::CustomText,
        Self::CustomBinary,
        Self::Media,
        Self::Bit,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::Uid,
    ];

    /// Look up an array type by its display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// The leaf data type this array produces.
    pub fn data_type(self) -> DataType {
        match self {
            Self::String => DataType::STRING,
            Self::ResourceId => DataType::RESOURCE_ID,
            Self::RemoteReference => DataType::REMOTE_REFERENCE,
            Self::CustomText => DataType::CUSTOM_TEXT,
            Self::CustomBinary => DataType::CUSTOM_BINARY,
            Self::Media => DataType::MEDIA,
            Self::Bit => DataType::ARRAY_BIT,
            Self::Uint8 => DataType::ARRAY_UINT8,
            Self::Uint16 => DataType::ARRAY_UINT16,
            Self::Uint32 => DataType::ARRAY_UINT32,
            Self::Uint64 => DataType::ARRAY_UINT64,
            Self::Int8 => DataType::ARRAY_INT8,
            Self::Int16 => DataType::ARRAY_INT16,
            Self::Int32 => DataType::ARRAY_INT32,
            Self::Int64 => DataType::ARRAY_INT64,
            Self::Float16 => DataType::ARRAY_FLOAT16,
            Self::Float32 => DataType::ARRAY_FLOAT32,
            Self::Float64 => DataType::ARRAY_FLOAT64,
            Self::Uid => DataType::ARRAY_UID,
        }
    }

    /// Payload is UTF-8 text.
    #[inline]
    pub fn is_stringlike(self) -> bool {
        DataType::STRINGLIKE.contains(self.data_type())
    }

    /// Width of one element in bits.
    pub fn element_bits(self) -> u64 {
        match self {
            Self::Bit => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 16,
            Self::Uint32 | Self::Int32 | Self::Float32 => 32,
            Self::Uint64 | Self::Int64 | Self::Float64 => 64,
            Self::Uid => 128,
            _ => 8,
        }
    }

    /// Number of payload bytes needed for `element_count` elements.
    ///
    /// Bit arrays round up to whole bytes. Returns `None` on overflow.
    pub fn byte_length(self, element_count: u64) -> Option<u64> {
        let bits = element_count.checked_mul(self.element_bits())?;
        Some(bits.div_ceil(8))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::ResourceId => "resource id",
            Self::RemoteReference => "remote reference",
            Self::CustomText => "custom text",
            Self::CustomBinary => "custom binary",
            Self::Media => "media",
            Self::Bit => "bit array",
            Self::Uint8 => "uint8 array",
            Self::Uint16 => "uint16 array",
            Self::Uint32 => "uint32 array",
            Self::Uint64 => "uint64 array",
            Self::Int8 => "int8 array",
            Self::Int16 => "int16 array",
            Self::Int32 => "int32 array",
            Self::Int64 => "int64 array",
            Self::Float16 => "float16 array",
            Self::Float32 => "float32 array",
            Self::Float64 => "float64 array",
            Self::Uid => "uid array",
        }
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
