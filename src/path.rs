//! CIP path segments: Class/Instance/Attribute addressing and the ANSI
//! Extended Symbol segments a symbolic tag path is built from.
//!
//! A path is just a byte string; the interesting decisions are (a)
//! whether a numeric segment needs an 8-bit or 16-bit encoding, (b)
//! padding the whole thing to an even byte length, and (c) reporting the
//! result in 16-bit words, since that's the unit the CIP request header
//! actually carries.

use crate::error::{Error, Result};

const SEG_CLASS_8: u8 = 0x20;
const SEG_CLASS_16: u8 = 0x21;
const SEG_INSTANCE_8: u8 = 0x24;
const SEG_INSTANCE_16: u8 = 0x25;
const SEG_ATTRIBUTE_8: u8 = 0x30;
const SEG_ATTRIBUTE_16: u8 = 0x31;
const SEG_ELEMENT_8: u8 = 0x28;
const SEG_ELEMENT_16: u8 = 0x29;
const SEG_SYMBOL: u8 = 0x91;

const MAX_PATH_WORDS: usize = 255;

/// A built CIP path: the raw bytes (already padded to an even length)
/// and the word count the request header wants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipPath {
    bytes: Vec<u8>,
}

impl CipPath {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `path_size_words` as the wire format defines it: byte length / 2.
    pub fn size_words(&self) -> Result<u8> {
        let words = self.bytes.len() / 2;
        u8::try_from(words)
            .ok()
            .filter(|_| words <= MAX_PATH_WORDS)
            .ok_or_else(|| Error::invalid_argument(format!("CIP path of {words} words exceeds the 255-word limit")))
    }

    fn push_numeric(bytes: &mut Vec<u8>, byte_code: u8, word_code: u8, value: u32) {
        if let Ok(v) = u8::try_from(value) {
            bytes.push(byte_code);
            bytes.push(v);
        } else {
            bytes.push(word_code);
            bytes.push(0); // pad byte required before a 16-bit segment's value
            bytes.extend_from_slice(&(value as u16).to_le_bytes());
        }
    }

    fn pad_to_even(bytes: &mut Vec<u8>) {
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }
    }

    /// Builds a Class/Instance[/Attribute] path. `attribute` is omitted
    /// when `None`, matching the distilled contract that Get/Set
    /// Attribute All requests carry no attribute segment.
    pub fn class_instance_attribute(class: u32, instance: u32, attribute: Option<u32>) -> CipPath {
        let mut bytes = Vec::with_capacity(8);
        Self::push_numeric(&mut bytes, SEG_CLASS_8, SEG_CLASS_16, class);
        Self::push_numeric(&mut bytes, SEG_INSTANCE_8, SEG_INSTANCE_16, instance);
        if let Some(attr) = attribute {
            Self::push_numeric(&mut bytes, SEG_ATTRIBUTE_8, SEG_ATTRIBUTE_16, attr);
        }
        Self::pad_to_even(&mut bytes);
        CipPath { bytes }
    }

    /// Builds a symbolic tag path from parsed [`TagSegment`]s.
    pub fn symbolic(segments: &[TagSegment]) -> Result<CipPath> {
        let mut bytes = Vec::new();
        for seg in segments {
            match seg {
                TagSegment::Name(name) => {
                    if name.is_empty() || name.len() > 255 {
                        return Err(Error::invalid_argument(format!(
                            "tag name component {name:?} must be 1..=255 bytes"
                        )));
                    }
                    bytes.push(SEG_SYMBOL);
                    bytes.push(name.len() as u8);
                    bytes.extend_from_slice(name.as_bytes());
                    Self::pad_to_even(&mut bytes);
                }
                TagSegment::Element(index) => {
                    Self::push_numeric(&mut bytes, SEG_ELEMENT_8, SEG_ELEMENT_16, *index);
                }
            }
        }
        Self::pad_to_even(&mut bytes);
        let path = CipPath { bytes };
        path.size_words()?; // validates the 255-word ceiling eagerly
        Ok(path)
    }
}

/// One component of a parsed tag path: either a dotted name or a
/// bracketed element index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagSegment {
    Name(String),
    Element(u32),
}

/// Parses a dotted/bracketed tag name like `Program.Counter[3]` into its
/// segment list. Case-sensitive, as the distilled contract requires — no
/// normalization happens here.
pub fn parse_tag_path(tag: &str) -> Result<Vec<TagSegment>> {
    if tag.is_empty() {
        return Err(Error::invalid_argument("tag name must not be empty"));
    }
    let mut segments = Vec::new();
    for dotted in tag.split('.') {
        if dotted.is_empty() {
            return Err(Error::invalid_argument(format!(
                "tag path {tag:?} has an empty component"
            )));
        }
        // Pull off the bare name, then any number of trailing [n] indices.
        let name_end = dotted.find('[').unwrap_or(dotted.len());
        let (name, mut bracketed) = dotted.split_at(name_end);
        if name.is_empty() {
            return Err(Error::invalid_argument(format!(
                "tag path {tag:?} has a component that starts with '['"
            )));
        }
        segments.push(TagSegment::Name(name.to_string()));
        while !bracketed.is_empty() {
            if !bracketed.starts_with('[') {
                return Err(Error::invalid_argument(format!(
                    "malformed index in tag path {tag:?}"
                )));
            }
            let close = bracketed.find(']').ok_or_else(|| {
                Error::invalid_argument(format!("unterminated '[' in tag path {tag:?}"))
            })?;
            let digits = &bracketed[1..close];
            let index: u32 = digits
                .parse()
                .map_err(|_| Error::invalid_argument(format!("non-numeric index {digits:?} in tag path {tag:?}")))?;
            segments.push(TagSegment::Element(index));
            bracketed = &bracketed[close + 1..];
        }
    }
    Ok(segments)
}
