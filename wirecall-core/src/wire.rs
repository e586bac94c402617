//! # Record Wire Format
//!
//! A record (document) carries exactly one event: a tag name followed by a
//! structured value. Two encodings are supported:
//!
//! | kind | layout | value encoding |
//! |------|--------|----------------|
//! | [`WireKind::Text`] | `name: value` | JSON |
//! | [`WireKind::Binary`] | `len:u8 name value` | MessagePack, named fields |
//!
//! Both layouts put the name first so it can be read as a borrowed `&str`
//! without touching the value. The value is then read through a [`ValueIn`],
//! either into a fresh instance ([`ValueIn::object`]) or in place into an
//! existing one ([`ValueIn::marshallable`]).

use crate::{diagnostic, error::WireError, marshal::ReadMarshallable};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, DeserializeOwned, MapAccess, SeqAccess, Visitor},
};
use serde_json::{Map, Value};
use std::{borrow::Cow, fmt};

/// Longest name the binary header can carry.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// The encoding of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    /// Readable `name: <json>` form.
    Text,
    /// Compact length-prefixed name followed by MessagePack.
    Binary,
}

/// Check that a message name can be written to and read back from the wire.
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return Err("name is longer than 255 bytes");
    }
    if name.contains(':') {
        return Err("name contains ':'");
    }
    if name.chars().any(char::is_whitespace) {
        return Err("name contains whitespace");
    }
    Ok(())
}

/// Encode one record into `out`.
pub fn write_document<T>(
    kind: WireKind,
    name: &str,
    value: &T,
    out: &mut Vec<u8>,
) -> Result<(), WireError>
where
    T: Serialize + ?Sized,
{
    validate_name(name).map_err(|reason| WireError::InvalidName(format!("{name:?}: {reason}")))?;

    match kind {
        WireKind::Text => {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            serde_json::to_writer(&mut *out, value)?;
        }
        WireKind::Binary => {
            let encoded = rmp_serde::to_vec_named(value)?;
            out.push(name.len() as u8);
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&encoded);
        }
    }
    Ok(())
}

/// A read cursor over one encoded record.
#[derive(Debug, Clone)]
pub struct Wire<'a> {
    kind: WireKind,
    bytes: &'a [u8],
    read_position: usize,
}

impl<'a> Wire<'a> {
    /// Create a cursor at the start of `bytes`.
    pub fn new(kind: WireKind, bytes: &'a [u8]) -> Self {
        Self {
            kind,
            bytes,
            read_position: 0,
        }
    }

    /// Create a cursor over a text record.
    pub fn text(bytes: &'a [u8]) -> Self {
        Self::new(WireKind::Text, bytes)
    }

    /// Create a cursor over a binary record.
    pub fn binary(bytes: &'a [u8]) -> Self {
        Self::new(WireKind::Binary, bytes)
    }

    /// The record's encoding.
    pub fn kind(&self) -> WireKind {
        self.kind
    }

    /// Current read offset from the start of the record.
    pub fn read_position(&self) -> usize {
        self.read_position
    }

    /// Move the read offset. Positions past the end are clamped.
    pub fn set_read_position(&mut self, position: usize) {
        self.read_position = position.min(self.bytes.len());
    }

    /// Number of unread bytes.
    pub fn read_remaining(&self) -> usize {
        self.bytes.len() - self.read_position
    }

    /// The unread bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.read_position..]
    }

    fn skip_to_end(&mut self) {
        self.read_position = self.bytes.len();
    }

    /// Read the record's tag name, leaving the cursor at the start of the value.
    pub fn read_event_name(&mut self) -> Result<&'a str, WireError> {
        let rest = self.remaining();
        let (name, consumed) = match self.kind {
            WireKind::Text => {
                let end = rest
                    .iter()
                    .position(|&b| b == b':')
                    .ok_or_else(|| WireError::InvalidName("missing ':' after name".into()))?;
                let mut consumed = end + 1;
                if rest.get(consumed) == Some(&b' ') {
                    consumed += 1;
                }
                (rest[..end].trim_ascii(), consumed)
            }
            WireKind::Binary => {
                let (&len, tail) = rest.split_first().ok_or(WireError::Truncated {
                    needed: 1,
                    remaining: 0,
                })?;
                let len = usize::from(len);
                if tail.len() < len {
                    return Err(WireError::Truncated {
                        needed: len,
                        remaining: tail.len(),
                    });
                }
                (&tail[..len], len + 1)
            }
        };

        if name.is_empty() {
            return Err(WireError::InvalidName("empty name".into()));
        }
        let name =
            std::str::from_utf8(name).map_err(|e| WireError::InvalidName(e.to_string()))?;
        self.read_position += consumed;
        Ok(name)
    }

    /// Borrow the cursor as a value reader.
    pub fn value_in(&mut self) -> ValueIn<'_, 'a> {
        ValueIn { wire: self }
    }

    /// Append the unread part of the record to `out` in readable text form.
    ///
    /// Consumes the unread bytes; callers that must not disturb the cursor
    /// save and restore [`read_position`](Self::read_position) around the call.
    pub fn copy_to_text(&mut self, out: &mut Vec<u8>) -> Result<(), WireError> {
        let rest = self.remaining();
        match self.kind {
            WireKind::Text => out.extend_from_slice(rest),
            WireKind::Binary => {
                let Readable(value) = rmp_serde::from_slice(rest)?;
                serde_json::to_writer(&mut *out, &value)?;
            }
        }
        self.skip_to_end();
        Ok(())
    }
}

/// Any decoded value as JSON. Map keys that are not strings (MessagePack
/// allows integers, booleans and even maps) become their JSON text.
struct Readable(Value);

impl<'de> Deserialize<'de> for Readable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ReadableVisitor).map(Readable)
    }
}

struct ReadableVisitor;

impl<'de> Visitor<'de> for ReadableVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::from(v.to_vec()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Readable::deserialize(deserializer).map(|Readable(v)| v)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Value, D::Error> {
        Readable::deserialize(deserializer).map(|Readable(v)| v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Readable(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = Map::new();
        while let Some((Readable(key), Readable(value))) = map.next_entry()? {
            let key = match key {
                Value::String(key) => key,
                other => other.to_string(),
            };
            entries.insert(key, value);
        }
        Ok(Value::Object(entries))
    }
}

/// Reader for the value part of a record.
pub struct ValueIn<'w, 'a> {
    wire: &'w mut Wire<'a>,
}

impl<'w, 'a> ValueIn<'w, 'a> {
    /// The record's encoding.
    pub fn kind(&self) -> WireKind {
        self.wire.kind
    }

    /// The underlying cursor.
    pub fn wire(&mut self) -> &mut Wire<'a> {
        &mut *self.wire
    }

    /// Decode a brand-new value.
    pub fn object<T: DeserializeOwned>(&mut self) -> Result<T, WireError> {
        let rest = self.wire.remaining();
        let value = match self.wire.kind {
            WireKind::Text => {
                let mut de = serde_json::Deserializer::from_slice(rest);
                let value = T::deserialize(&mut de)?;
                de.end()?;
                value
            }
            WireKind::Binary => rmp_serde::from_slice(rest)?,
        };
        self.wire.skip_to_end();
        Ok(value)
    }

    /// Decode into an existing instance, reusing its storage.
    ///
    /// The target is [`reset`](ReadMarshallable::reset) first, so fields
    /// absent from this record never carry values from an earlier one.
    pub fn marshallable<T: ReadMarshallable>(&mut self, target: &mut T) -> Result<(), WireError> {
        target.reset();
        let rest = self.wire.remaining();
        match self.wire.kind {
            WireKind::Text => {
                let mut de = serde_json::Deserializer::from_slice(rest);
                T::deserialize_in_place(&mut de, target)?;
                de.end()?;
            }
            WireKind::Binary => {
                let mut de = rmp_serde::Deserializer::from_read_ref(rest);
                T::deserialize_in_place(&mut de, target)?;
            }
        }
        self.wire.skip_to_end();
        Ok(())
    }

    /// Render the value as readable text without consuming it.
    pub fn render(&mut self) -> Cow<'a, str> {
        diagnostic::render(&mut *self.wire)
    }

    /// Consume the value, returning it as readable text.
    pub fn text(&mut self) -> Cow<'a, str> {
        let rendered = self.render();
        self.wire.skip_to_end();
        rendered
    }

    /// Consume the value without decoding it.
    pub fn skip(&mut self) {
        self.wire.skip_to_end();
    }
}
