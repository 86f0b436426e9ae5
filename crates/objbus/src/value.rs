//! Loosely-typed bus values and the slots the marshaller decodes into.

use std::fmt;

use thiserror::Error;

use crate::path::ObjectPath;

/// A decoded bus value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `b`
    Bool(bool),
    /// `y`
    Byte(u8),
    /// `n`
    Int16(i16),
    /// `q`
    Uint16(u16),
    /// `i`
    Int32(i32),
    /// `u`
    Uint32(u32),
    /// `x`
    Int64(i64),
    /// `t`
    Uint64(u64),
    /// `d`
    Double(f64),
    /// `s`
    Str(String),
    /// `o`
    ObjectPath(ObjectPath),
    /// `g`
    Signature(String),
    /// `a<element>`; the element kind is kept so empty arrays stay typed.
    Array {
        /// Declared element kind.
        element: ValueKind,
        /// Items, each of kind `element`.
        items: Vec<Value>,
    },
    /// `a{<key><value>}`
    Dict {
        /// Declared key kind.
        key: ValueKind,
        /// Declared value kind.
        value: ValueKind,
        /// Entries in wire order.
        entries: Vec<(Value, Value)>,
    },
    /// `(...)`
    Struct(Vec<Value>),
    /// `v`
    Variant(Box<Value>),
}

/// Type descriptor of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `b`
    Bool,
    /// `y`
    Byte,
    /// `n`
    Int16,
    /// `q`
    Uint16,
    /// `i`
    Int32,
    /// `u`
    Uint32,
    /// `x`
    Int64,
    /// `t`
    Uint64,
    /// `d`
    Double,
    /// `s`
    Str,
    /// `o`
    ObjectPath,
    /// `g`
    Signature,
    /// `a<element>`
    Array(Box<ValueKind>),
    /// `a{<key><value>}`
    Dict(Box<ValueKind>, Box<ValueKind>),
    /// `(...)`
    Struct(Vec<ValueKind>),
    /// `v`
    Variant,
}

impl ValueKind {
    /// Builds an array kind.
    #[must_use]
    pub fn array_of(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    /// Builds a dictionary kind.
    #[must_use]
    pub fn dict_of(key: Self, value: Self) -> Self {
        Self::Dict(Box::new(key), Box::new(value))
    }

    /// The zero value of this kind: `false`, `0`, empty string, empty
    /// container, and a variant wrapping the empty string.
    #[must_use]
    pub fn zero(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Byte => Value::Byte(0),
            Self::Int16 => Value::Int16(0),
            Self::Uint16 => Value::Uint16(0),
            Self::Int32 => Value::Int32(0),
            Self::Uint32 => Value::Uint32(0),
            Self::Int64 => Value::Int64(0),
            Self::Uint64 => Value::Uint64(0),
            Self::Double => Value::Double(0.0),
            Self::Str => Value::Str(String::new()),
            Self::ObjectPath => Value::ObjectPath(ObjectPath::root()),
            Self::Signature => Value::Signature(String::new()),
            Self::Array(element) => Value::Array {
                element: (**element).clone(),
                items: Vec::new(),
            },
            Self::Dict(key, value) => Value::Dict {
                key: (**key).clone(),
                value: (**value).clone(),
                entries: Vec::new(),
            },
            Self::Struct(fields) => Value::Struct(fields.iter().map(Self::zero).collect()),
            Self::Variant => Value::Variant(Box::new(Value::Str(String::new()))),
        }
    }

    /// Returns `true` when `value` has exactly this kind.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        value.kind() == *self
    }
}

/// Renders the kind as a bus type signature, e.g. `a{sv}`.
impl fmt::Display for ValueKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => formatter.write_str("b"),
            Self::Byte => formatter.write_str("y"),
            Self::Int16 => formatter.write_str("n"),
            Self::Uint16 => formatter.write_str("q"),
            Self::Int32 => formatter.write_str("i"),
            Self::Uint32 => formatter.write_str("u"),
            Self::Int64 => formatter.write_str("x"),
            Self::Uint64 => formatter.write_str("t"),
            Self::Double => formatter.write_str("d"),
            Self::Str => formatter.write_str("s"),
            Self::ObjectPath => formatter.write_str("o"),
            Self::Signature => formatter.write_str("g"),
            Self::Array(element) => write!(formatter, "a{element}"),
            Self::Dict(key, value) => write!(formatter, "a{{{key}{value}}}"),
            Self::Struct(fields) => {
                formatter.write_str("(")?;
                for field in fields {
                    write!(formatter, "{field}")?;
                }
                formatter.write_str(")")
            }
            Self::Variant => formatter.write_str("v"),
        }
    }
}

impl Value {
    /// Kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Byte(_) => ValueKind::Byte,
            Self::Int16(_) => ValueKind::Int16,
            Self::Uint16(_) => ValueKind::Uint16,
            Self::Int32(_) => ValueKind::Int32,
            Self::Uint32(_) => ValueKind::Uint32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Uint64(_) => ValueKind::Uint64,
            Self::Double(_) => ValueKind::Double,
            Self::Str(_) => ValueKind::Str,
            Self::ObjectPath(_) => ValueKind::ObjectPath,
            Self::Signature(_) => ValueKind::Signature,
            Self::Array { element, .. } => ValueKind::array_of(element.clone()),
            Self::Dict { key, value, .. } => ValueKind::dict_of(key.clone(), value.clone()),
            Self::Struct(fields) => ValueKind::Struct(fields.iter().map(Self::kind).collect()),
            Self::Variant(_) => ValueKind::Variant,
        }
    }

    /// Borrows the text of a `Str` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Wraps the value in a variant.
    #[must_use]
    pub fn into_variant(self) -> Self {
        Self::Variant(Box::new(self))
    }
}

/// Raised when a [`Value`] is converted into a Rust type of another kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected a value of type '{expected}', found '{found}'")]
pub struct ValueTypeError {
    /// Kind the conversion needed.
    pub expected: ValueKind,
    /// Kind that was supplied.
    pub found: ValueKind,
}

macro_rules! scalar_conversions {
    ($($rust:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$rust> for Value {
                fn from(value: $rust) -> Self {
                    Self::$variant(value)
                }
            }

            impl TryFrom<Value> for $rust {
                type Error = ValueTypeError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(ValueTypeError {
                            expected: ValueKind::$variant,
                            found: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => Bool,
    u8 => Byte,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f64 => Double,
    String => Str,
    ObjectPath => ObjectPath,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

/// Settable container the transport decodes one argument into.
///
/// The marshaller creates one slot per declared parameter (usually seeded
/// with [`ValueKind::zero`]), overwrites it while decoding, and hands the
/// slots to the dispatcher. A slot that was never set reaches the bridge as
/// empty and is rejected there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgSlot(Option<Value>);

impl ArgSlot {
    /// A slot nothing was decoded into.
    #[must_use]
    pub fn empty() -> Self {
        Self(None)
    }

    /// A slot seeded with the zero value of `kind`.
    #[must_use]
    pub fn zeroed(kind: &ValueKind) -> Self {
        Self(Some(kind.zero()))
    }

    /// A slot holding `value`.
    #[must_use]
    pub fn filled(value: impl Into<Value>) -> Self {
        Self(Some(value.into()))
    }

    /// Stores a decoded value, replacing any previous one.
    pub fn set(&mut self, value: impl Into<Value>) {
        self.0 = Some(value.into());
    }

    /// Borrows the held value.
    #[must_use]
    pub fn get(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    /// Returns `true` when a value has been stored.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.0.is_some()
    }

    /// Unwraps the slot by one level.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        self.0
    }
}

impl From<Value> for ArgSlot {
    fn from(value: Value) -> Self {
        Self(Some(value))
    }
}
