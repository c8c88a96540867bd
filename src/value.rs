//! FlexConf value representation.

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::fmt;

/// A FlexConf value.
///
/// Maps preserve insertion order; that order is not semantically
/// significant, and map equality ignores it. Integers that fit an `i64`
/// are `Int`; integers outside that range widen to `BigInt`, so a parsed
/// document never holds a `BigInt` that would fit in `Int`.
#[derive(Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer within `i64` range.
    Int(i64),
    /// Integer outside `i64` range, widened to arbitrary precision.
    BigInt(BigInt),
    /// 64-bit floating-point number. `+inf`, `-inf`, and `nan` are
    /// preserved as distinct values.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered sequence of values.
    Seq(Vec<Value>),
    /// Ordered key-value mapping.
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Returns `true` if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns a reference to the big integer if this is a `BigInt`.
    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Value::BigInt(n) => Some(n),
            _ => None,
        }
    }

    /// Returns this value as a float, converting integers. Big integers
    /// convert with the usual loss of precision.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::BigInt(n) => n.to_f64(),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a reference to the sequence if this is a `Seq`.
    pub fn as_seq(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Returns a reference to the map if this is a `Map`.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a key if this is a `Map`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Float(n) => {
                if n.is_nan() {
                    write!(f, "nan")
                } else if n.is_infinite() {
                    if *n > 0.0 {
                        write!(f, "+inf")
                    } else {
                        write!(f, "-inf")
                    }
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Seq(items) => f.debug_list().entries(items).finish(),
            Value::Map(entries) => f.debug_map().entries(entries).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Int(7).as_f64(), Some(7.0));
        assert_eq!(Value::Str("hi".into()).as_str(), Some("hi"));
        assert_eq!(Value::Int(7).as_str(), None);
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let mut a = IndexMap::new();
        a.insert("x".to_string(), Value::Int(1));
        a.insert("y".to_string(), Value::Int(2));
        let mut b = IndexMap::new();
        b.insert("y".to_string(), Value::Int(2));
        b.insert("x".to_string(), Value::Int(1));
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn test_debug_floats() {
        assert_eq!(format!("{:?}", Value::Float(f64::NAN)), "nan");
        assert_eq!(format!("{:?}", Value::Float(f64::INFINITY)), "+inf");
        assert_eq!(format!("{:?}", Value::Float(f64::NEG_INFINITY)), "-inf");
    }
}
