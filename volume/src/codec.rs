// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A positional, big-endian [`serde`] deserializer for the fixed-layout structures of a backup
//! volume.
//!
//! Nothing in a volume header is self-describing: fields follow one another at fixed offsets, so a
//! struct is decoded as a tuple of its fields in declaration order. ND machines are big-endian,
//! and so is every multi-byte integer on the wire.

use std::fmt;

use serde::{de, Deserialize};

/// Decodes a `T` from `bytes`, starting at `offset`.
pub fn decode<'de, T>(bytes: &'de [u8], offset: usize) -> Result<T, DeserializeError>
where
    T: Deserialize<'de>,
{
    let input = bytes.get(offset..).ok_or(DeserializeError::ExpectedU8)?;

    T::deserialize(&mut Deserializer::from_bytes(input))
}

#[derive(Debug)]
pub enum DeserializeError {
    Message(String),
    ExpectedU8,
    ExpectedU16,
    ExpectedU32,
    ExpectedU64,
}

impl de::Error for DeserializeError {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::Message(msg.to_string())
    }
}

impl de::StdError for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => f.write_str(msg),
            Self::ExpectedU8 => f.write_str("expected a byte, found end of input"),
            Self::ExpectedU16 => f.write_str("expected a 16-bit integer, found end of input"),
            Self::ExpectedU32 => f.write_str("expected a 32-bit integer, found end of input"),
            Self::ExpectedU64 => f.write_str("expected a 64-bit integer, found end of input"),
        }
    }
}

impl<'de> Deserializer<'de> {
    pub fn from_bytes(input: &'de [u8]) -> Self {
        Self { input }
    }
}

#[derive(Debug)]
pub struct Deserializer<'de> {
    input: &'de [u8],
}

impl<'de> Deserializer<'de> {
    /// The number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    pub fn take(&mut self, len: usize) -> Option<&'de [u8]> {
        if len > self.input.len() {
            return None;
        }
        let (head, rest) = self.input.split_at(len);
        self.input = rest;

        Some(head)
    }
}

/// Decodes one big-endian integer of type `$ty`, reporting `$short` if the input runs out.
macro_rules! be_int {
    ($($fn:ident, $visit:ident: $ty:ty, $short:ident;)*) => {
        $(
            fn $fn<V>(self, visitor: V) -> Result<V::Value, DeserializeError>
            where
                V: de::Visitor<'de>,
            {
                const LEN: usize = std::mem::size_of::<$ty>();

                let raw: [u8; LEN] = self
                    .take(LEN)
                    .and_then(|it| it.try_into().ok())
                    .ok_or(DeserializeError::$short)?;

                visitor.$visit(<$ty>::from_be_bytes(raw))
            }
        )*
    };
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = DeserializeError;

    // Volume headers only hold integers, byte arrays and fixed records. Anything self-describing
    // has no encoding here.
    fn deserialize_any<V>(self, _: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        Err(DeserializeError::Message(
            "volume headers only encode fixed-width integers and records".into(),
        ))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i64 i128 u128 f32 f64 char str string bytes byte_buf option unit unit_struct
        newtype_struct seq tuple_struct map enum identifier ignored_any
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let byte = self.take(1).ok_or(DeserializeError::ExpectedU8)?[0];

        visitor.visit_u8(byte)
    }

    be_int! {
        deserialize_u16, visit_u16: u16, ExpectedU16;
        deserialize_u32, visit_u32: u32, ExpectedU32;
        // Page numbers are signed so that -1 can mark an empty slot.
        deserialize_i32, visit_i32: i32, ExpectedU32;
        deserialize_u64, visit_u64: u64, ExpectedU64;
    }

    /// Fields follow one another with no names or lengths on the wire.
    fn deserialize_struct<V>(
        self,
        _: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_seq(Record { de: self, left: fields.len() })
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_seq(Record { de: self, left: len })
    }
}

/// The elements of a fixed-length record, decoded back to back.
struct Record<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    left: usize,
}

impl<'de> de::SeqAccess<'de> for Record<'_, 'de> {
    type Error = DeserializeError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, DeserializeError>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.left == 0 {
            return Ok(None);
        }
        self.left -= 1;

        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.left)
    }
}

/// A fixed-width text field, stored exactly as it appears on the wire.
#[derive(Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct TextField<const SIZE: usize> {
    #[serde(with = "serde_arrays")]
    inner: [u8; SIZE],
}

impl<const SIZE: usize> TextField<SIZE> {
    pub fn new(inner: [u8; SIZE]) -> Self {
        Self { inner }
    }

    /// Decodes the field as 7-bit ASCII terminated by an apostrophe.
    ///
    /// The high bit of every byte is masked off. If no apostrophe occurs within the field, the
    /// whole field is the text.
    pub fn to_apostrophe_terminated(&self) -> String {
        self.inner
            .iter()
            .map(|byte| byte & 0x7f)
            .take_while(|byte| *byte != b'\'')
            .map(char::from)
            .collect()
    }

    /// The field up to its first NUL, with invalid UTF-8 replaced.
    pub fn to_lossy(&self) -> String {
        let end = self
            .inner
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(SIZE);

        String::from_utf8_lossy(&self.inner[..end]).into_owned()
    }
}

impl<const SIZE: usize> fmt::Debug for TextField<SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_lossy())
    }
}
