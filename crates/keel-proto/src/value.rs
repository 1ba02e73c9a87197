// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Self-describing tagged binary codec for JSON-shaped values.
//!
//! One type byte per value; length prefixes are `u16` little-endian, numbers
//! are little-endian at their tagged width. Unsigned integers encode at the
//! minimal width that holds them (and non-negative signed values canonicalise
//! to unsigned), so a value always has exactly one byte representation —
//! which is what lets encoded inputs be compared and hashed by bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_U8: u8 = 0x03;
const TAG_U16: u8 = 0x04;
const TAG_U32: u8 = 0x05;
const TAG_I32: u8 = 0x06;
const TAG_F64: u8 = 0x07;
const TAG_STR: u8 = 0x08;
const TAG_ARRAY: u8 = 0x09;
const TAG_OBJECT: u8 = 0x0A;

/// Maximum element count / byte length in one length prefix.
const MAX_LEN: usize = u16::MAX as usize;

/// Errors from strict decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ended inside a value.
    #[error("value truncated")]
    Truncated,
    /// A string was not valid UTF-8.
    #[error("invalid utf-8 in string")]
    BadUtf8,
    /// Nesting exceeded the codec's fixed depth bound.
    #[error("value nesting too deep")]
    TooDeep,
    /// The message type byte is not part of the protocol.
    #[error("unknown message type 0x{0:02x}")]
    UnknownMessage(u8),
}

/// A JSON-shaped value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Unsigned integer (encoded at minimal width).
    Uint(u32),
    /// Negative signed integer (non-negative values canonicalise to
    /// [`Value::Uint`]).
    Int(i32),
    /// Binary64 float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered array.
    Array(Vec<Value>),
    /// String-keyed object; insertion order is preserved on the wire.
    Object(Vec<(String, Value)>),
}

const MAX_DEPTH: u32 = 32;

impl Value {
    /// Convenience constructor for an object.
    #[must_use]
    pub fn object(pairs: Vec<(&str, Value)>) -> Self {
        Self::Object(pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }

    /// Member lookup on an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The boolean behind this value, when it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The unsigned integer behind this value, when it is one.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Int(v) if *v >= 0 => Some(*v as u32),
            _ => None,
        }
    }

    /// Encodes into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Appends the encoded value to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Self::Null => buf.put_u8(TAG_NULL),
            Self::Bool(false) => buf.put_u8(TAG_FALSE),
            Self::Bool(true) => buf.put_u8(TAG_TRUE),
            Self::Uint(v) => encode_uint(buf, *v),
            Self::Int(v) => {
                if *v >= 0 {
                    encode_uint(buf, *v as u32);
                } else {
                    buf.put_u8(TAG_I32);
                    buf.put_i32_le(*v);
                }
            }
            Self::Float(v) => {
                buf.put_u8(TAG_F64);
                buf.put_f64_le(*v);
            }
            Self::Str(s) => {
                buf.put_u8(TAG_STR);
                put_str(buf, s);
            }
            Self::Array(items) => {
                buf.put_u8(TAG_ARRAY);
                buf.put_u16_le(items.len().min(MAX_LEN) as u16);
                for item in items.iter().take(MAX_LEN) {
                    item.encode(buf);
                }
            }
            Self::Object(pairs) => {
                buf.put_u8(TAG_OBJECT);
                buf.put_u16_le(pairs.len().min(MAX_LEN) as u16);
                for (key, value) in pairs.iter().take(MAX_LEN) {
                    put_str(buf, key);
                    value.encode(buf);
                }
            }
        }
    }

    /// Decodes one value from the front of `bytes`, returning the remainder.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let mut cursor = bytes;
        let value = decode_value(&mut cursor, 0)?;
        Ok((value, cursor))
    }
}

fn encode_uint(buf: &mut BytesMut, v: u32) {
    if v <= u32::from(u8::MAX) {
        buf.put_u8(TAG_U8);
        buf.put_u8(v as u8);
    } else if v <= u32::from(u16::MAX) {
        buf.put_u8(TAG_U16);
        buf.put_u16_le(v as u16);
    } else {
        buf.put_u8(TAG_U32);
        buf.put_u32_le(v);
    }
}

fn put_str(buf: &mut BytesMut, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(MAX_LEN);
    buf.put_u16_le(len as u16);
    buf.put_slice(&bytes[..len]);
}

fn take<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if cursor.len() < n {
        return Err(DecodeError::Truncated);
    }
    let (head, tail) = cursor.split_at(n);
    *cursor = tail;
    Ok(head)
}

fn take_str(cursor: &mut &[u8]) -> Result<String, DecodeError> {
    let mut len_bytes = take(cursor, 2)?;
    let len = len_bytes.get_u16_le() as usize;
    let raw = take(cursor, len)?;
    core::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| DecodeError::BadUtf8)
}

fn decode_value(cursor: &mut &[u8], depth: u32) -> Result<Value, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::TooDeep);
    }
    let tag = take(cursor, 1)?[0];
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_FALSE => Ok(Value::Bool(false)),
        TAG_TRUE => Ok(Value::Bool(true)),
        TAG_U8 => Ok(Value::Uint(u32::from(take(cursor, 1)?[0]))),
        TAG_U16 => {
            let mut raw = take(cursor, 2)?;
            Ok(Value::Uint(u32::from(raw.get_u16_le())))
        }
        TAG_U32 => {
            let mut raw = take(cursor, 4)?;
            Ok(Value::Uint(raw.get_u32_le()))
        }
        TAG_I32 => {
            let mut raw = take(cursor, 4)?;
            Ok(Value::Int(raw.get_i32_le()))
        }
        TAG_F64 => {
            let mut raw = take(cursor, 8)?;
            Ok(Value::Float(raw.get_f64_le()))
        }
        TAG_STR => Ok(Value::Str(take_str(cursor)?)),
        TAG_ARRAY => {
            let mut raw = take(cursor, 2)?;
            let len = raw.get_u16_le() as usize;
            let mut items = Vec::with_capacity(len.min(256));
            for _ in 0..len {
                items.push(decode_value(cursor, depth + 1)?);
            }
            Ok(Value::Array(items))
        }
        TAG_OBJECT => {
            let mut raw = take(cursor, 2)?;
            let len = raw.get_u16_le() as usize;
            let mut pairs = Vec::with_capacity(len.min(256));
            for _ in 0..len {
                let key = take_str(cursor)?;
                pairs.push((key, decode_value(cursor, depth + 1)?));
            }
            Ok(Value::Object(pairs))
        }
        // Strict decode: an unknown tag yields null. The byte is consumed
        // and the caller's framing decides how much trailing data to skip.
        _ => Ok(Value::Null),
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        if v >= 0 {
            Self::Uint(v as u32)
        } else {
            Self::Int(v)
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}
