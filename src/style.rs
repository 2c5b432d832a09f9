use crate::value::Value;
use std::collections::BTreeMap;

/// ANSI SGR codes by conventional terminal color name.
pub mod codes {
    pub const BLACK: &str = "30";
    pub const DARKRED: &str = "31";
    pub const DARKGREEN: &str = "32";
    pub const BROWN: &str = "33";
    pub const DARKBLUE: &str = "34";
    pub const PURPLE: &str = "35";
    pub const TEAL: &str = "36";
    pub const LIGHTGRAY: &str = "37";
    pub const DARKGRAY: &str = "30;01";
    pub const RED: &str = "31;01";
    pub const GREEN: &str = "32;01";
    pub const YELLOW: &str = "33;01";
    pub const BLUE: &str = "34;01";
    pub const FUCHSIA: &str = "35;01";
    pub const TURQUOISE: &str = "36;01";
    pub const WHITE: &str = "37;01";
    pub const PLAIN: &str = "00";
}

pub fn set_color(s: &str, code: &str) -> String {
    format!("\x1b[{}m{}\x1b[00m", code, s)
}

/// A fixed-width fake escape sequence encoding the candidate's position, so
/// that a lexical sort downstream keeps the enumeration order.
pub fn index_prefix(i: usize) -> String {
    format!("\x1b[{:03};00m", i)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeClass {
    Callable,
    Type,
    Module,
    NoneValue,
    Text,
    Number,
    Other,
}

impl TypeClass {
    pub fn classify(value: &Value) -> TypeClass {
        match value {
            Value::Func(_) => TypeClass::Callable,
            Value::Type(_) => TypeClass::Type,
            Value::Module(_) => TypeClass::Module,
            Value::None => TypeClass::NoneValue,
            Value::Str(_) => TypeClass::Text,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => TypeClass::Number,
            Value::List(_) | Value::Map(_) => TypeClass::Other,
        }
    }

    fn from_key(key: &str) -> Option<TypeClass> {
        match key {
            "callable" => Some(TypeClass::Callable),
            "type" => Some(TypeClass::Type),
            "module" => Some(TypeClass::Module),
            "none" => Some(TypeClass::NoneValue),
            "text" => Some(TypeClass::Text),
            "number" => Some(TypeClass::Number),
            "other" => Some(TypeClass::Other),
            _ => None,
        }
    }
}

/// Color policy: which code each classification gets. Immutable once the
/// session is up.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    by_class: BTreeMap<TypeClass, String>,
}

impl Default for Palette {
    fn default() -> Self {
        let mut by_class = BTreeMap::new();
        by_class.insert(TypeClass::Callable, codes::BLUE.to_string());
        by_class.insert(TypeClass::Type, codes::FUCHSIA.to_string());
        by_class.insert(TypeClass::Module, codes::TEAL.to_string());
        by_class.insert(TypeClass::NoneValue, codes::LIGHTGRAY.to_string());
        by_class.insert(TypeClass::Text, codes::GREEN.to_string());
        by_class.insert(TypeClass::Number, codes::YELLOW.to_string());
        Palette { by_class }
    }
}

impl Palette {
    pub fn code_for(&self, class: TypeClass) -> &str {
        self.by_class
            .get(&class)
            .map(|s| s.as_str())
            .unwrap_or(codes::PLAIN)
    }

    pub fn set(&mut self, class: TypeClass, code: String) {
        self.by_class.insert(class, code);
    }

    /// Apply rc-file color overrides keyed by class name. Unknown names are
    /// skipped with a diagnostic.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, code) in overrides {
            match TypeClass::from_key(key) {
                Some(class) => self.set(class, code.clone()),
                None => log::warn!("unknown color class '{}' in rc file", key),
            }
        }
    }
}
