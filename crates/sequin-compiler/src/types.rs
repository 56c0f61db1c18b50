//! Primitive type system
//!
//! The closed set of value types a sequence can manipulate, the
//! classification predicates used by operator validation, and the canonical
//! big-endian byte encoding for literal values of each type.

use crate::bytecode::encoder::{BytecodeReader, DecodeError};
use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive value types.
///
/// Discriminants are part of the wire protocol: every type fits in a 4-bit
/// nibble so instruction type streams can pack two types per byte. Zero is
/// reserved.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    /// Signed 8-bit integer
    I8 = 1,
    /// Unsigned 8-bit integer
    U8 = 2,
    /// Signed 16-bit integer
    I16 = 3,
    /// Unsigned 16-bit integer
    U16 = 4,
    /// Signed 32-bit integer
    I32 = 5,
    /// Unsigned 32-bit integer
    U32 = 6,
    /// Signed 64-bit integer
    I64 = 7,
    /// Unsigned 64-bit integer
    U64 = 8,
    /// 32-bit IEEE-754 float
    F32 = 9,
    /// 64-bit IEEE-754 float
    F64 = 10,
    /// Boolean
    Bool = 11,
    /// Length-prefixed UTF-8 text, stored in constant data
    String = 12,
    /// Raw byte payload, passed through unmodified
    Bytes = 13,
}

impl Type {
    /// Wire-protocol nibble for this type.
    pub fn nibble(self) -> u8 {
        self as u8
    }

    /// Signed fixed-width integer types.
    pub fn is_signed(self) -> bool {
        matches!(self, Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    /// Unsigned fixed-width integer types.
    pub fn is_unsigned(self) -> bool {
        matches!(self, Type::U8 | Type::U16 | Type::U32 | Type::U64)
    }

    /// Floating-point types.
    pub fn is_floating(self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// Integral types: signed, unsigned, or floating.
    ///
    /// These may always be combined in comparison and arithmetic operators,
    /// provided both operands share one type.
    pub fn is_integral(self) -> bool {
        self.is_signed() || self.is_unsigned() || self.is_floating()
    }

    /// Types whose values embed directly into a `LoadImmediate` payload.
    pub fn is_immediate(self) -> bool {
        self.is_integral() || self == Type::Bool
    }

    /// Byte width of the encoded value, where fixed.
    ///
    /// `String` and `Bytes` are variable-length and return `None`.
    pub fn width(self) -> Option<usize> {
        match self {
            Type::I8 | Type::U8 | Type::Bool => Some(1),
            Type::I16 | Type::U16 => Some(2),
            Type::I32 | Type::U32 | Type::F32 => Some(4),
            Type::I64 | Type::U64 | Type::F64 => Some(8),
            Type::String | Type::Bytes => None,
        }
    }

    /// Encode a literal value of this type into its canonical byte form.
    ///
    /// Numeric types use their native width, big-endian, two's complement
    /// for signed values. `Bool` is a single 0/1 byte. `String` is a 4-byte
    /// big-endian length prefix followed by the UTF-8 bytes. `Bytes` passes
    /// through unmodified.
    ///
    /// A value whose runtime kind disagrees with this type, or an integer
    /// outside the type's range, signals a bug in an earlier validation
    /// step and fails with an internal-invariant error.
    pub fn serialize(self, value: &ConstValue) -> Result<Vec<u8>, CompileError> {
        match (self, value) {
            (Type::I8, ConstValue::Int(v)) => Ok(int_bytes::<1>(self, *v, i8::MIN as i64, i8::MAX as i64)?),
            (Type::U8, ConstValue::Int(v)) => Ok(int_bytes::<1>(self, *v, 0, u8::MAX as i64)?),
            (Type::I16, ConstValue::Int(v)) => Ok(int_bytes::<2>(self, *v, i16::MIN as i64, i16::MAX as i64)?),
            (Type::U16, ConstValue::Int(v)) => Ok(int_bytes::<2>(self, *v, 0, u16::MAX as i64)?),
            (Type::I32, ConstValue::Int(v)) => Ok(int_bytes::<4>(self, *v, i32::MIN as i64, i32::MAX as i64)?),
            (Type::U32, ConstValue::Int(v)) => Ok(int_bytes::<4>(self, *v, 0, u32::MAX as i64)?),
            (Type::I64, ConstValue::Int(v)) => Ok(v.to_be_bytes().to_vec()),
            (Type::U64, ConstValue::Int(v)) => {
                let v = u64::try_from(*v).map_err(|_| CompileError::ImmediateOutOfRange {
                    ty: self,
                    value: *v,
                })?;
                Ok(v.to_be_bytes().to_vec())
            }
            (Type::F32, ConstValue::Float(v)) => Ok((*v as f32).to_be_bytes().to_vec()),
            (Type::F64, ConstValue::Float(v)) => Ok(v.to_be_bytes().to_vec()),
            (Type::Bool, ConstValue::Bool(v)) => Ok(vec![u8::from(*v)]),
            (Type::String, ConstValue::Str(s)) => {
                let mut out = Vec::with_capacity(4 + s.len());
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
                Ok(out)
            }
            (Type::Bytes, ConstValue::Bytes(b)) => Ok(b.clone()),
            (_, v) => Err(CompileError::ValueTypeMismatch {
                ty: self,
                found: v.kind(),
            }),
        }
    }

    /// Decode a value previously produced by [`Type::serialize`].
    ///
    /// `Bytes` consumes the remaining input.
    pub fn deserialize(self, reader: &mut BytecodeReader<'_>) -> Result<ConstValue, DecodeError> {
        match self {
            Type::I8 => Ok(ConstValue::Int(reader.read_i8()? as i64)),
            Type::U8 => Ok(ConstValue::Int(reader.read_u8()? as i64)),
            Type::I16 => Ok(ConstValue::Int(reader.read_i16()? as i64)),
            Type::U16 => Ok(ConstValue::Int(reader.read_u16()? as i64)),
            Type::I32 => Ok(ConstValue::Int(reader.read_i32()? as i64)),
            Type::U32 => Ok(ConstValue::Int(reader.read_u32()? as i64)),
            Type::I64 => Ok(ConstValue::Int(reader.read_i64()?)),
            Type::U64 => {
                let v = reader.read_u64()?;
                let v = i64::try_from(v)
                    .map_err(|_| DecodeError::InvalidValue(format!("u64 value {v} overflows")))?;
                Ok(ConstValue::Int(v))
            }
            Type::F32 => Ok(ConstValue::Float(reader.read_f32()? as f64)),
            Type::F64 => Ok(ConstValue::Float(reader.read_f64()?)),
            Type::Bool => match reader.read_u8()? {
                0 => Ok(ConstValue::Bool(false)),
                1 => Ok(ConstValue::Bool(true)),
                b => Err(DecodeError::InvalidValue(format!("bool byte {b:#x}"))),
            },
            Type::String => {
                let len = reader.read_u32()? as usize;
                let bytes = reader.read_bytes(len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| DecodeError::InvalidValue(format!("string is not UTF-8: {e}")))?;
                Ok(ConstValue::Str(s.to_string()))
            }
            Type::Bytes => Ok(ConstValue::Bytes(reader.read_remaining().to_vec())),
        }
    }
}

fn int_bytes<const N: usize>(
    ty: Type,
    value: i64,
    min: i64,
    max: i64,
) -> Result<Vec<u8>, CompileError> {
    if value < min || value > max {
        return Err(CompileError::ImmediateOutOfRange { ty, value });
    }
    // Two's complement truncation to the low N bytes, big-endian.
    Ok(value.to_be_bytes()[8 - N..].to_vec())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::I8 => "i8",
            Type::U8 => "u8",
            Type::I16 => "i16",
            Type::U16 => "u16",
            Type::I32 => "i32",
            Type::U32 => "u32",
            Type::I64 => "i64",
            Type::U64 => "u64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Bool => "bool",
            Type::String => "string",
            Type::Bytes => "bytes",
        };
        write!(f, "{name}")
    }
}

/// A literal value carried by a constant before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// Integer literal (covers every integer type)
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// Text literal
    Str(String),
    /// Raw byte payload
    Bytes(Vec<u8>),
}

impl ConstValue {
    /// Short name of the value kind, for invariant-failure messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ConstValue::Int(_) => "int",
            ConstValue::Float(_) => "float",
            ConstValue::Bool(_) => "bool",
            ConstValue::Str(_) => "string",
            ConstValue::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v}"),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
            ConstValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}
