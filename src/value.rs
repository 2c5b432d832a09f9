use regex::Regex;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use thiserror::Error;

/// A runtime value in the host REPL's namespace. Completion never mutates
/// values, it only enumerates their members and resolves them one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Func(String),
    Type(String),
    Module(Module),
}

/// An export mapped to `None` still shows up in the member listing, but
/// resolving its value fails (the lazy-export case).
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub exports: BTreeMap<String, Option<Value>>,
}

// Members shared by every value. All of them are dunders, so completing on a
// bare value reduces to the "__" prefix.
const COMMON_DUNDERS: &[&str] = &[
    "__class__", "__doc__", "__eq__", "__ge__", "__gt__", "__hash__", "__le__", "__lt__",
    "__ne__", "__repr__", "__str__",
];
const NUMBER_DUNDERS: &[&str] = &["__abs__", "__add__", "__mul__", "__neg__", "__sub__"];
const STR_METHODS: &[&str] = &[
    "capitalize",
    "endswith",
    "find",
    "join",
    "lower",
    "replace",
    "split",
    "startswith",
    "strip",
    "upper",
];
const LIST_METHODS: &[&str] = &[
    "append", "count", "extend", "index", "insert", "pop", "remove", "reverse", "sort",
];
const MAP_METHODS: &[&str] = &["get", "items", "keys", "values"];

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Func(_) => "function",
            Value::Type(_) => "type",
            Value::Module(_) => "module",
        }
    }

    /// Introspectable member names, sorted (dunders first by ASCII).
    pub fn member_names(&self) -> Vec<String> {
        fn extend(names: &mut Vec<String>, extra: &[&str]) {
            names.extend(extra.iter().map(|s| s.to_string()));
        }
        let mut names: Vec<String> = COMMON_DUNDERS.iter().map(|s| s.to_string()).collect();
        match self {
            Value::None => {}
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => extend(&mut names, NUMBER_DUNDERS),
            Value::Str(_) => extend(&mut names, STR_METHODS),
            Value::List(_) => extend(&mut names, LIST_METHODS),
            Value::Map(fields) => {
                extend(&mut names, MAP_METHODS);
                names.extend(fields.keys().cloned());
            }
            Value::Func(_) => extend(&mut names, &["__call__", "__name__"]),
            Value::Type(_) => extend(&mut names, &["__name__", "mro"]),
            Value::Module(module) => {
                extend(&mut names, &["__builtins__", "__name__"]);
                names.extend(module.exports.keys().cloned());
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// Resolve one member's value. `None` covers both unknown names and
    /// members that enumerate but cannot be resolved.
    pub fn member(&self, name: &str) -> Option<Value> {
        match name {
            "__class__" => return Some(Value::Type(self.type_name().to_string())),
            "__doc__" => return Some(Value::None),
            _ => {}
        }
        if COMMON_DUNDERS.contains(&name) {
            return Some(Value::Func(name.to_string()));
        }
        match self {
            Value::None => None,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => {
                if NUMBER_DUNDERS.contains(&name) {
                    Some(Value::Func(name.to_string()))
                } else {
                    None
                }
            }
            Value::Str(_) => {
                if STR_METHODS.contains(&name) {
                    Some(Value::Func(name.to_string()))
                } else {
                    None
                }
            }
            Value::List(_) => {
                if LIST_METHODS.contains(&name) {
                    Some(Value::Func(name.to_string()))
                } else {
                    None
                }
            }
            Value::Map(fields) => fields.get(name).cloned().or_else(|| {
                if MAP_METHODS.contains(&name) {
                    Some(Value::Func(name.to_string()))
                } else {
                    None
                }
            }),
            Value::Func(func) => match name {
                "__call__" => Some(Value::Func(func.clone())),
                "__name__" => Some(Value::Str(func.clone())),
                _ => None,
            },
            Value::Type(ty) => match name {
                "__name__" => Some(Value::Str(ty.clone())),
                "mro" => Some(Value::Func("mro".to_string())),
                _ => None,
            },
            Value::Module(module) => match name {
                "__name__" => Some(Value::Str(module.name.clone())),
                // reserved, enumerable but never resolved
                "__builtins__" => None,
                _ => module.exports.get(name).cloned().flatten(),
            },
        }
    }

    pub fn index(&self, i: i64) -> Option<Value> {
        match self {
            Value::List(items) => {
                let i = if i < 0 { items.len() as i64 + i } else { i };
                if i < 0 {
                    return None;
                }
                items.get(i as usize).cloned()
            }
            _ => None,
        }
    }

    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Value::None => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => Json::String(s.clone()).to_string(),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Map(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", Json::String(k.clone()), v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Func(name) => format!("<function {}>", name),
            Value::Type(name) => format!("<type {}>", name),
            Value::Module(module) => format!("<module {}>", module.name),
        }
    }
}

/// The host session's variable bindings. The completer only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    vars: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Namespace::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<S: Into<String>> std::iter::FromIterator<(S, Value)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Namespace {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("name '{0}' is not defined")]
    Undefined(String),
    #[error("{0} value has no member '{1}'")]
    NoMember(&'static str, String),
    #[error("index {1} out of range for {0}")]
    BadIndex(&'static str, i64),
    #[error("cannot evaluate '{0}'")]
    Syntax(String),
}

/// Evaluates base expressions of the form `ident ('.' ident | '[' int ']')*`
/// against a namespace. Deliberately nothing more: completion must never run
/// a call as a side effect.
pub struct Evaluator {
    ident_re: Regex,
    index_re: Regex,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            ident_re: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("identifier regex"),
            index_re: Regex::new(r"^\[(-?[0-9]+)\]").expect("index regex"),
        }
    }

    pub fn eval(&self, namespace: &Namespace, expr: &str) -> Result<Value, EvalError> {
        let expr = expr.trim();
        let root = self
            .ident_re
            .find(expr)
            .ok_or_else(|| EvalError::Syntax(expr.to_string()))?;
        let mut value = namespace
            .get(root.as_str())
            .cloned()
            .ok_or_else(|| EvalError::Undefined(root.as_str().to_string()))?;
        let mut rest = &expr[root.end()..];
        while !rest.is_empty() {
            if let Some(after_dot) = rest.strip_prefix('.') {
                let attr = self
                    .ident_re
                    .find(after_dot)
                    .ok_or_else(|| EvalError::Syntax(expr.to_string()))?;
                let kind = value.type_name();
                value = value
                    .member(attr.as_str())
                    .ok_or_else(|| EvalError::NoMember(kind, attr.as_str().to_string()))?;
                rest = &after_dot[attr.end()..];
            } else if let Some(caps) = self.index_re.captures(rest) {
                let i: i64 = caps[1]
                    .parse()
                    .map_err(|_| EvalError::Syntax(expr.to_string()))?;
                let kind = value.type_name();
                value = value.index(i).ok_or(EvalError::BadIndex(kind, i))?;
                rest = &rest[caps.get(0).expect("whole match").end()..];
            } else {
                return Err(EvalError::Syntax(expr.to_string()));
            }
        }
        Ok(value)
    }
}

/// Seed namespace for the demo REPL host.
pub fn builtins() -> Namespace {
    let mut ns = Namespace::new();
    let funcs = ["abs", "len", "max", "min", "print"];
    let types = ["float", "int", "list", "str"];
    for f in &funcs {
        ns.insert(*f, Value::Func(f.to_string()));
    }
    for t in &types {
        ns.insert(*t, Value::Type(t.to_string()));
    }
    let mut exports = BTreeMap::new();
    for f in &funcs {
        exports.insert(f.to_string(), Some(Value::Func(f.to_string())));
    }
    for t in &types {
        exports.insert(t.to_string(), Some(Value::Type(t.to_string())));
    }
    ns.insert(
        "__builtins__",
        Value::Module(Module {
            name: "builtins".to_string(),
            exports,
        }),
    );
    ns.insert("math", Value::Module(find_module("math").expect("math is registered")));
    ns
}

/// Importable modules for the demo REPL host.
pub fn find_module(name: &str) -> Option<Module> {
    let mut exports = BTreeMap::new();
    match name {
        "math" => {
            exports.insert("e".to_string(), Some(Value::Float(std::f64::consts::E)));
            exports.insert("inf".to_string(), Some(Value::Float(f64::INFINITY)));
            exports.insert("pi".to_string(), Some(Value::Float(std::f64::consts::PI)));
            for f in &["ceil", "floor", "pow", "sqrt"] {
                exports.insert(f.to_string(), Some(Value::Func(f.to_string())));
            }
        }
        "string" => {
            exports.insert(
                "ascii_lowercase".to_string(),
                Some(Value::Str("abcdefghijklmnopqrstuvwxyz".to_string())),
            );
            exports.insert(
                "ascii_uppercase".to_string(),
                Some(Value::Str("ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string())),
            );
            exports.insert("digits".to_string(), Some(Value::Str("0123456789".to_string())));
            exports.insert("capwords".to_string(), Some(Value::Func("capwords".to_string())));
        }
        _ => return None,
    }
    Some(Module {
        name: name.to_string(),
        exports,
    })
}
