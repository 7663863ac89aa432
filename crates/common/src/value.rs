//! 属性值类型
//!
//! 值注入时，表达式解析出的字符串按照 [`ValueType`] 转换为 [`PropertyValue`]，
//! 再由构造函数或注入点通过 [`FromPropertyValue`] 取回具体的 Rust 类型。

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// 可注入的值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Date,
    Time,
    DateTime,
    Duration,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "String",
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Date => "NaiveDate",
            Self::Time => "NaiveTime",
            Self::DateTime => "NaiveDateTime",
            Self::Duration => "Duration",
        };
        f.write_str(name)
    }
}

/// 转换后的属性值
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Duration(Duration),
}

impl PropertyValue {
    /// 值的类型
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Bool(_) => ValueType::Bool,
            Self::I8(_) => ValueType::I8,
            Self::I16(_) => ValueType::I16,
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::U8(_) => ValueType::U8,
            Self::U16(_) => ValueType::U16,
            Self::U32(_) => ValueType::U32,
            Self::U64(_) => ValueType::U64,
            Self::Usize(_) => ValueType::Usize,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::Date(_) => ValueType::Date,
            Self::Time(_) => ValueType::Time,
            Self::DateTime(_) => ValueType::DateTime,
            Self::Duration(_) => ValueType::Duration,
        }
    }
}

/// 能从 [`PropertyValue`] 取回的 Rust 类型
pub trait FromPropertyValue: Sized {
    /// 对应的值类型
    const VALUE_TYPE: ValueType;

    /// 取回值，类型不符时返回 `None`
    fn from_property(value: PropertyValue) -> Option<Self>;
}

macro_rules! impl_from_property_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromPropertyValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$variant;

                fn from_property(value: PropertyValue) -> Option<Self> {
                    match value {
                        PropertyValue::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_property_value! {
    String => String,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    Duration => Duration,
}
