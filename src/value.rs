//! Dynamic runtime values.
//!
//! Type expressions are evaluated against [`Value`]s. The model mirrors a
//! loosely typed host language: there is a distinguished *absent* value
//! ([`Value::Undefined`]) next to an explicit `null`, objects keep their
//! insertion order, and functions are opaque, reference-counted callables.
//!
//! ```text
//! Value ──kind()──▶ Kinds (exactly one bit)
//!   │
//!   └─ coerce_to_string() ── the host's `String(value)` form, used by the
//!                            `numeric` predicate
//! ```

use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::rc::Rc;

bitflags::bitflags! {
    /// Atomic kinds of [`Value`]s.
    ///
    /// A single value always has exactly one kind; unions of kinds are used to
    /// define predicates such as "string or number" without going through the
    /// expression compiler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Kinds: u16 {
        const UNDEFINED = 1 << 0;
        const NULL      = 1 << 1;
        const BOOLEAN   = 1 << 2;
        const NUMBER    = 1 << 3;
        const STRING    = 1 << 4;
        const REGEXP    = 1 << 5;
        const ARRAY     = 1 << 6;
        const OBJECT    = 1 << 7;
        const FUNCTION  = 1 << 8;
    }
}

impl Kinds {
    /// Names of the built-in atomic predicates and the kind each one accepts.
    pub const ATOMS: [(&'static str, Kinds); 9] = [
        ("string", Kinds::STRING),
        ("number", Kinds::NUMBER),
        ("boolean", Kinds::BOOLEAN),
        ("regexp", Kinds::REGEXP),
        ("object", Kinds::OBJECT),
        ("array", Kinds::ARRAY),
        ("function", Kinds::FUNCTION),
        ("null", Kinds::NULL),
        ("undefined", Kinds::UNDEFINED),
    ];
}

/// Body of a [`Function`] value.
pub type NativeFn = dyn Fn(&[Value]) -> Value;

/// A named callable carried inside a [`Value`].
///
/// Cloning shares the body; two functions are equal only if they share it.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl Function {
    pub fn new(name: &str, body: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Function { name: Rc::from(name), body: Rc::new(body) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).field("body", &"<function>").finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

/// A dynamically typed value, the subject of every type expression.
///
/// The default is [`Value::Undefined`].
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absence marker: "no value supplied".
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Regex(Regex),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Function(Function),
}

impl Value {
    /// Build an object value, keeping the iteration order of `fields`.
    pub fn object<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn array<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn function(name: &str, body: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Value::Function(Function::new(name, body))
    }

    pub fn kind(&self) -> Kinds {
        match self {
            Value::Undefined => Kinds::UNDEFINED,
            Value::Null => Kinds::NULL,
            Value::Bool(_) => Kinds::BOOLEAN,
            Value::Number(_) => Kinds::NUMBER,
            Value::String(_) => Kinds::STRING,
            Value::Regex(_) => Kinds::REGEXP,
            Value::Array(_) => Kinds::ARRAY,
            Value::Object(_) => Kinds::OBJECT,
            Value::Function(_) => Kinds::FUNCTION,
        }
    }

    /// Name of the built-in atomic type this value belongs to (`"string"`,
    /// `"array"`, `"null"`, ...).
    pub fn type_name(&self) -> &'static str {
        let kind = self.kind();
        Kinds::ATOMS.iter().find(|(_, atom)| *atom == kind).map_or("", |(name, _)| *name)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for `undefined` and `null`.
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Field lookup on objects. Anything else has no fields.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// The host language's string conversion (`String(value)`).
    ///
    /// Arrays join their elements with `,`, rendering `null`/`undefined`
    /// elements as empty strings; objects become `[object Object]`.
    pub(crate) fn coerce_to_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Regex(re) => format!("/{}/", re.as_str()),
            Value::Array(items) => items
                .iter()
                .map(|item| if item.is_unset() { String::new() } else { item.coerce_to_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(func) => format!("function {}() {{ [native code] }}", func.name()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

/// Readable literal form: strings quoted, containers expanded.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Regex(re) => write!(f, "/{}/", re.as_str()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Function(func) => write!(f, "function {}", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Regex> for Value {
    fn from(re: Regex) -> Self {
        Value::Regex(re)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Value::Object(fields)
    }
}

/// `None` is the absent value, not `null`.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Undefined, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
