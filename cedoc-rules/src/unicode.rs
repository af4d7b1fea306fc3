//! Character classification for identifier and text safety checks.
//!
//! The rules never build Unicode tables themselves. They consume a
//! [`Classifier`], and the default [`UnicodeClassifier`] derives its answers
//! from `unicode-xid` and the standard `char` properties.

use bitflags::bitflags;
use unicode_xid::UnicodeXID;

use crate::error::RuleError;

bitflags! {
    /// Properties of a single character.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        const ID_START = 1 << 0;
        const ID_CONTINUE = 1 << 1;
        const WHITESPACE = 1 << 2;
        const LINE_BREAK = 1 << 3;
        const CONTROL = 1 << 4;
        const NON_CHARACTER = 1 << 5;
        /// Never allowed in document text.
        const UNSAFE = 1 << 6;
    }
}

/// Source of character properties.
pub trait Classifier {
    fn classify(&self, c: char) -> PropertyFlags;
}

impl<F> Classifier for F
where
    F: Fn(char) -> PropertyFlags,
{
    fn classify(&self, c: char) -> PropertyFlags {
        self(c)
    }
}

/// Classifier backed by `unicode-xid` and `char` properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeClassifier;

impl Classifier for UnicodeClassifier {
    fn classify(&self, c: char) -> PropertyFlags {
        classify(c)
    }
}

/// Classify one character.
pub fn classify(c: char) -> PropertyFlags {
    let mut flags = PropertyFlags::empty();
    if c.is_xid_start() {
        flags |= PropertyFlags::ID_START;
    }
    if c.is_xid_continue() {
        flags |= PropertyFlags::ID_CONTINUE;
    }
    if c.is_whitespace() {
        flags |= PropertyFlags::WHITESPACE;
    }
    if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
        flags |= PropertyFlags::LINE_BREAK;
    }
    if c.is_control() {
        flags |= PropertyFlags::CONTROL;
        if !matches!(c, '\t' | '\n' | '\r') {
            flags |= PropertyFlags::UNSAFE;
        }
    }
    if is_non_character(c) {
        flags |= PropertyFlags::NON_CHARACTER | PropertyFlags::UNSAFE;
    }
    flags
}

fn is_non_character(c: char) -> bool {
    let cp = c as u32;
    (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE) == 0xFFFE
}

/// Validate a marker, reference or record-type identifier.
///
/// Identifiers are non-empty UTF-8, at most `max_len` bytes, made of
/// identifier-continue characters plus `-` and `.`.
pub fn validate_identifier<'a, C: Classifier + ?Sized>(
    classifier: &C,
    identifier: &'a [u8],
    max_len: usize,
) -> Result<&'a str, RuleError> {
    let invalid = |reason| RuleError::InvalidIdentifier {
        identifier: String::from_utf8_lossy(identifier).into_owned(),
        reason,
    };
    if identifier.is_empty() {
        return Err(invalid("identifier is empty"));
    }
    if identifier.len() > max_len {
        return Err(RuleError::LimitExceeded {
            limit: "identifier length",
            max: max_len as u64,
        });
    }
    let text = std::str::from_utf8(identifier).map_err(|_| invalid("not valid UTF-8"))?;
    for c in text.chars() {
        if matches!(c, '-' | '.') {
            continue;
        }
        if !classifier.classify(c).contains(PropertyFlags::ID_CONTINUE) {
            return Err(invalid("contains a character not allowed in identifiers"));
        }
    }
    Ok(text)
}

/// Check every character of `text` for safety.
///
/// `offset` is added to reported positions so callers streaming a larger
/// payload can report absolute byte offsets.
pub fn validate_text<C: Classifier + ?Sized>(
    classifier: &C,
    text: &str,
    allow_line_breaks: bool,
    offset: usize,
) -> Result<(), RuleError> {
    for (i, c) in text.char_indices() {
        let flags = classifier.classify(c);
        if flags.contains(PropertyFlags::UNSAFE) {
            return Err(RuleError::InvalidText {
                offset: offset + i,
                reason: "unsafe character",
            });
        }
        if !allow_line_breaks && flags.contains(PropertyFlags::LINE_BREAK) {
            return Err(RuleError::InvalidText {
                offset: offset + i,
                reason: "line break in single-line text",
            });
        }
    }
    Ok(())
}

/// Incremental UTF-8 validator for text arriving in arbitrary pieces.
///
/// A multi-byte character may straddle two pieces; the incomplete tail is
/// carried over (at most three bytes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStream {
    carry: Vec<u8>,
    offset: usize,
    single_line: bool,
}

impl TextStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream that also rejects line breaks.
    pub fn single_line() -> Self {
        Self {
            single_line: true,
            ..Self::default()
        }
    }

    /// Bytes validated so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Validate the next piece of text.
    pub fn feed<C: Classifier + ?Sized>(
        &mut self,
        classifier: &C,
        data: &[u8],
    ) -> Result<(), RuleError> {
        let joined;
        let bytes = if self.carry.is_empty() {
            data
        } else {
            let mut buf = std::mem::take(&mut self.carry);
            buf.extend_from_slice(data);
            joined = buf;
            &joined[..]
        };

        match std::str::from_utf8(bytes) {
            Ok(text) => {
                validate_text(classifier, text, !self.single_line, self.offset)?;
                self.offset += bytes.len();
                Ok(())
            }
            Err(err) => {
                let valid = err.valid_up_to();
                if let Ok(head) = std::str::from_utf8(&bytes[..valid]) {
                    validate_text(classifier, head, !self.single_line, self.offset)?;
                }
                if err.error_len().is_some() {
                    return Err(RuleError::InvalidText {
                        offset: self.offset + valid,
                        reason: "invalid UTF-8",
                    });
                }
                self.carry = bytes[valid..].to_vec();
                self.offset += valid;
                Ok(())
            }
        }
    }

    /// Finish the stream. Fails if a character was left incomplete.
    pub fn finish(&mut self) -> Result<(), RuleError> {
        if self.carry.is_empty() {
            return Ok(());
        }
        self.carry.clear();
        Err(RuleError::InvalidText {
            offset: self.offset,
            reason: "truncated UTF-8 sequence",
        })
    }
}
