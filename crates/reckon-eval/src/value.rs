//! Value stores: the client-chosen representation of constants, substitutions
//! and results.
//!
//! A store holds at most one scalar at a time, or null. Evaluation never looks
//! inside a store directly: it reads a borrowed [`Operand`] view, computes an
//! owned [`Scalar`], and asks the target store to [`admit`](Store::admit) it.
//! A store that cannot represent the result makes the operation fail with an
//! incompatible-types error, so one operation list is safe across stores with
//! different type sets.

use std::fmt;

/// Label of the null marker.
pub const NULL: &str = "null";

/// Borrowed view of a stored value for pattern matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'a str),
}

impl Operand<'_> {
    /// Label of the active alternative.
    pub fn type_name(&self) -> &'static str {
        match self {
            Operand::Null => NULL,
            Operand::Bool(_) => <bool as ScalarType>::NAME,
            Operand::Int(_) => <i64 as ScalarType>::NAME,
            Operand::Float(_) => <f64 as ScalarType>::NAME,
            Operand::Text(_) => <String as ScalarType>::NAME,
        }
    }

    /// Owned copy of the value, `None` for null.
    pub fn to_scalar(&self) -> Option<Scalar> {
        match *self {
            Operand::Null => None,
            Operand::Bool(b) => Some(Scalar::Bool(b)),
            Operand::Int(n) => Some(Scalar::Int(n)),
            Operand::Float(x) => Some(Scalar::Float(x)),
            Operand::Text(s) => Some(Scalar::Text(s.to_string())),
        }
    }
}

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Null => f.write_str(NULL),
            Operand::Bool(b) => write!(f, "{b}"),
            Operand::Int(n) => write!(f, "{n}"),
            Operand::Float(x) => write!(f, "{x}"),
            Operand::Text(s) => f.write_str(s),
        }
    }
}

/// Owned non-null value produced by an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_operand(&self) -> Operand<'_> {
        match self {
            Scalar::Bool(b) => Operand::Bool(*b),
            Scalar::Int(n) => Operand::Int(*n),
            Scalar::Float(x) => Operand::Float(*x),
            Scalar::Text(s) => Operand::Text(s),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.as_operand().type_name()
    }
}

/// Storage for constants, substitutions and results.
pub trait Store: Clone + fmt::Debug + fmt::Display + Sized {
    /// The null value.
    fn null() -> Self;

    /// Wrap `value` if this store can represent it.
    fn admit(value: Scalar) -> Option<Self>;

    /// Borrowed view of the stored value.
    fn operand(&self) -> Operand<'_>;

    /// Labels of the scalar kinds this store can hold.
    fn kinds() -> &'static [&'static str];

    fn is_non_null(&self) -> bool {
        !matches!(self.operand(), Operand::Null)
    }

    /// Label of the active alternative, `"null"` for null.
    fn type_name(&self) -> &'static str {
        self.operand().type_name()
    }

    /// Convert from another store, `None` if the value is not admissible.
    fn convert<U: Store>(other: &U) -> Option<Self> {
        match other.operand().to_scalar() {
            None => Some(Self::null()),
            Some(scalar) => Self::admit(scalar),
        }
    }
}

/// A built-in scalar type that can sit inside a store.
pub trait ScalarType: Clone + fmt::Debug + PartialEq + Sized {
    /// Label used in diagnostics and typed literals.
    const NAME: &'static str;

    /// `[NAME]`, for single-type stores.
    const KINDS: &'static [&'static str];

    /// Take the value out of `scalar` if it has this type, otherwise hand the
    /// scalar back.
    fn take(scalar: Scalar) -> Result<Self, Scalar>;

    fn view(&self) -> Operand<'_>;
}

impl ScalarType for bool {
    const NAME: &'static str = "bool";
    const KINDS: &'static [&'static str] = &["bool"];

    fn take(scalar: Scalar) -> Result<Self, Scalar> {
        match scalar {
            Scalar::Bool(b) => Ok(b),
            other => Err(other),
        }
    }

    fn view(&self) -> Operand<'_> {
        Operand::Bool(*self)
    }
}

impl ScalarType for i64 {
    const NAME: &'static str = "int";
    const KINDS: &'static [&'static str] = &["int"];

    fn take(scalar: Scalar) -> Result<Self, Scalar> {
        match scalar {
            Scalar::Int(n) => Ok(n),
            other => Err(other),
        }
    }

    fn view(&self) -> Operand<'_> {
        Operand::Int(*self)
    }
}

impl ScalarType for f64 {
    const NAME: &'static str = "double";
    const KINDS: &'static [&'static str] = &["double"];

    fn take(scalar: Scalar) -> Result<Self, Scalar> {
        match scalar {
            Scalar::Float(x) => Ok(x),
            other => Err(other),
        }
    }

    fn view(&self) -> Operand<'_> {
        Operand::Float(*self)
    }
}

impl ScalarType for String {
    const NAME: &'static str = "text";
    const KINDS: &'static [&'static str] = &["text"];

    fn take(scalar: Scalar) -> Result<Self, Scalar> {
        match scalar {
            Scalar::Text(s) => Ok(s),
            other => Err(other),
        }
    }

    fn view(&self) -> Operand<'_> {
        Operand::Text(self)
    }
}

/// Nullable store of exactly one scalar type.
#[derive(Debug, Clone, PartialEq)]
pub struct Single<T>(pub Option<T>);

impl<T: ScalarType> Single<T> {
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }
}

impl<T: ScalarType> Store for Single<T> {
    fn null() -> Self {
        Single(None)
    }

    fn admit(value: Scalar) -> Option<Self> {
        T::take(value).ok().map(|v| Single(Some(v)))
    }

    fn operand(&self) -> Operand<'_> {
        self.0.as_ref().map_or(Operand::Null, ScalarType::view)
    }

    fn kinds() -> &'static [&'static str] {
        T::KINDS
    }
}

impl<T: ScalarType> From<T> for Single<T> {
    fn from(value: T) -> Self {
        Single(Some(value))
    }
}

impl<T: ScalarType> fmt::Display for Single<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.operand(), f)
    }
}

/// Declare a nullable tagged-union store over a subset of the built-in
/// scalar types.
///
/// ```
/// reckon_eval::variant_store! {
///     /// Integers and booleans.
///     #[derive(PartialEq)]
///     pub enum IntBool { Int(i64), Bool(bool) }
/// }
/// ```
///
/// The generated enum gets an extra `Null` alternative, a [`Store`]
/// implementation, `Display`, and `From<T>` for each alternative.
#[macro_export]
macro_rules! variant_store {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident($ty:ty)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis enum $name {
            Null,
            $($variant($ty),)+
        }

        impl $crate::value::Store for $name {
            fn null() -> Self {
                $name::Null
            }

            fn admit(value: $crate::value::Scalar) -> Option<Self> {
                let value = value;
                $(
                    let value = match <$ty as $crate::value::ScalarType>::take(value) {
                        Ok(v) => return Some($name::$variant(v)),
                        Err(back) => back,
                    };
                )+
                let _ = value;
                None
            }

            fn operand(&self) -> $crate::value::Operand<'_> {
                match self {
                    $name::Null => $crate::value::Operand::Null,
                    $($name::$variant(v) => <$ty as $crate::value::ScalarType>::view(v),)+
                }
            }

            fn kinds() -> &'static [&'static str] {
                &[$(<$ty as $crate::value::ScalarType>::NAME),+]
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(value: $ty) -> Self {
                    $name::$variant(value)
                }
            }
        )+

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&$crate::value::Store::operand(self), f)
            }
        }
    };
}

variant_store! {
    /// Store that holds any built-in scalar.
    #[derive(PartialEq)]
    pub enum Value {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(n) => Value::Int(n),
            Scalar::Float(x) => Value::Float(x),
            Scalar::Text(s) => Value::Text(s),
        }
    }
}
