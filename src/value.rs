use crate::ast::FunctionLiteral;
use crate::builtins::Builtin;
use crate::environment::Environment;
use crate::error::RuntimeError;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Runtime values. Containers share their contents, so cloning a value is
/// cheap and two clones of one array are the same object.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Boolean(bool),
    String(String),
    Array(Rc<Vec<Value>>),
    Hash(Rc<BTreeMap<HashKey, HashPair>>),
    Function(Rc<Function>),
    Builtin(Builtin),
}

/// A closure: the literal it was created from plus the environment that
/// was active at that point.
pub struct Function {
    pub literal: Rc<FunctionLiteral>,
    pub env: Environment,
}

impl fmt::Debug for Function {
    // the captured environment may hold this very function
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.literal.parameters.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashKeyType {
    Integer,
    Boolean,
    String,
}

/// Identity of a value inside a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    pub key_type: HashKeyType,
    pub value: i64,
}

/// The key value is kept next to the value so the hash can be inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
        }
    }

    /// `null` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            _ => true,
        }
    }

    /// Derive the hash key of an integer, boolean or string.
    ///
    /// Strings key on the byte sum of their SHA-1 digest, so distinct strings
    /// can collide.
    pub fn hash_key(&self) -> Result<HashKey, RuntimeError> {
        match self {
            Value::Integer(n) => Ok(HashKey {
                key_type: HashKeyType::Integer,
                value: *n,
            }),
            Value::Boolean(b) => Ok(HashKey {
                key_type: HashKeyType::Boolean,
                value: i64::from(*b),
            }),
            Value::String(s) => {
                let digest = Sha1::digest(s.as_bytes());
                Ok(HashKey {
                    key_type: HashKeyType::String,
                    value: digest.iter().map(|b| i64::from(*b)).sum(),
                })
            }
            _ => Err(RuntimeError::new(format!(
                "unusable as hash key: {}",
                self.type_name()
            ))),
        }
    }

    /// Equality as the `==` operator sees it: integers, booleans and null by
    /// value, containers and functions by identity. The operator rejects two
    /// strings before getting here; the `String` arm serves callers such as
    /// `PartialEq` that compare strings by value.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(l), Value::Integer(r)) => l == r,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Array(l), Value::Array(r)) => Rc::ptr_eq(l, r),
            (Value::Hash(l), Value::Hash(r)) => Rc::ptr_eq(l, r),
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            (Value::Builtin(l), Value::Builtin(r)) => l.name == r.name,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(l), Value::Array(r)) => l == r,
            (Value::Hash(l), Value::Hash(r)) => l == r,
            _ => self.is_identical(other),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(elements))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, pair) in pairs.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
            Value::Function(function) => {
                write!(f, "fn(")?;
                for (i, parameter) in function.literal.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, ") {{\n{}\n}}", function.literal.body)
            }
            Value::Builtin(_) => write!(f, "builtin function"),
        }
    }
}
