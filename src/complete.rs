//! The completion core: split the input into a base expression and a partial
//! name, enumerate matching candidates from the live namespace, reduce common
//! prefixes, and format the result list for the line editor.

use crate::{
    config::Settings,
    style::{codes, index_prefix, set_color, TypeClass},
    value::{Evaluator, Namespace, Value},
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

/// Reserved words of the host language. They complete in global mode but
/// carry no value.
pub const KEYWORDS: &[&str] = &[
    "and", "break", "class", "continue", "def", "del", "elif", "else", "false", "for", "if",
    "import", "in", "is", "lambda", "none", "not", "null", "or", "pass", "return", "true",
    "while",
];

/// Internal member never offered in attribute mode.
pub const RESERVED_MEMBER: &str = "__builtins__";

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    /// `None` when the value could not be resolved (keywords, failed member
    /// lookups). Such candidates are excluded from type-based coloring.
    pub value: Option<Value>,
}

/// Structured result of a single completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum Matches {
    Empty,
    /// All candidates shared a prefix longer than the typed text; the line
    /// editor should insert this instead of opening a menu.
    Reduced(String),
    Listing {
        base: Option<String>,
        candidates: Vec<Candidate>,
    },
}

#[derive(Debug, PartialEq)]
enum Split<'a> {
    Global(&'a str),
    Attr { base: &'a str, partial: &'a str },
    NotCompletable,
}

fn split_input(text: &str) -> Split {
    match text.rfind('.') {
        None => Split::Global(text),
        Some(dot) => {
            let (base, partial) = (&text[..dot], &text[dot + 1..]);
            // never evaluate calls as a side effect of completion
            if base.contains('(') || base.contains(')') {
                Split::NotCompletable
            } else {
                Split::Attr { base, partial }
            }
        }
    }
}

/// Return the longest common prefix of `names` that starts with `base`.
pub fn common_prefix<S: AsRef<str>>(names: &[S], base: &str) -> String {
    let mut names = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| base.is_empty() || name.starts_with(base));
    let mut prefix = match names.next() {
        Some(first) => first.to_string(),
        None => return String::new(),
    };
    for name in names {
        while !name.starts_with(&prefix) {
            prefix.pop();
        }
    }
    prefix
}

pub(crate) fn qualify(base: Option<&str>, name: &str) -> String {
    match base {
        Some(base) => format!("{}.{}", base, name),
        None => name.to_string(),
    }
}

pub struct Completer {
    settings: Rc<Settings>,
    evaluator: Evaluator,
}

impl Completer {
    pub fn new(settings: Rc<Settings>) -> Self {
        Completer {
            settings,
            evaluator: Evaluator::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// One request, full structured answer.
    pub fn matches(&self, namespace: &Namespace, text: &str) -> Matches {
        match split_input(text) {
            Split::NotCompletable => Matches::Empty,
            Split::Global(partial) => self.global_matches(namespace, partial),
            Split::Attr { base, partial } => self.attr_matches(namespace, base, partial),
        }
    }

    /// The readline-shaped list: a reduced prefix or single match comes back
    /// qualified and undecorated; a listing comes back formatted, with one
    /// trailing spacer when colors are on so the editor does not try to
    /// complete the shared escape bytes.
    pub fn complete(&self, namespace: &Namespace, text: &str) -> Vec<String> {
        if text.is_empty() {
            // a TAB on a blank line should indent, not complete
            return vec!["\t".to_string()];
        }
        match self.matches(namespace, text) {
            Matches::Empty => Vec::new(),
            Matches::Reduced(prefix) => vec![prefix],
            Matches::Listing { base, candidates } => {
                if candidates.len() == 1 {
                    return vec![qualify(base.as_deref(), &candidates[0].name)];
                }
                let mut out: Vec<String> = if self.settings.use_colors {
                    candidates
                        .iter()
                        .enumerate()
                        .map(|(i, candidate)| self.decorate(i, candidate))
                        .collect()
                } else {
                    candidates.into_iter().map(|c| c.name).collect()
                };
                if self.settings.use_colors {
                    out.push(" ".to_string());
                }
                out
            }
        }
    }

    /// Names visible at top level: namespace bindings plus keywords, sorted.
    fn global_matches(&self, namespace: &Namespace, partial: &str) -> Matches {
        let mut visible: BTreeMap<&str, Option<&Value>> = BTreeMap::new();
        for &keyword in KEYWORDS {
            visible.insert(keyword, None);
        }
        for (name, value) in namespace.iter() {
            visible.insert(name, Some(value));
        }
        let candidates: Vec<Candidate> = visible
            .into_iter()
            .filter(|(name, _)| name.starts_with(partial))
            .map(|(name, value)| Candidate {
                name: name.to_string(),
                value: value.cloned(),
            })
            .collect();
        self.reduce(None, candidates, partial)
    }

    /// Members of the evaluated base expression. Evaluation failures yield an
    /// empty result rather than propagating.
    fn attr_matches(&self, namespace: &Namespace, base: &str, partial: &str) -> Matches {
        let object = match self.evaluator.eval(namespace, base) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("completion of '{}' skipped: {}", base, err);
                return Matches::Empty;
            }
        };
        let candidates: Vec<Candidate> = object
            .member_names()
            .into_iter()
            .filter(|name| name.starts_with(partial) && name != RESERVED_MEMBER)
            .map(|name| {
                let value = object.member(&name);
                Candidate { name, value }
            })
            .collect();
        self.reduce(Some(base), candidates, partial)
    }

    fn reduce(&self, base: Option<&str>, candidates: Vec<Candidate>, partial: &str) -> Matches {
        if candidates.is_empty() {
            return Matches::Empty;
        }
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        let prefix = common_prefix(&names, partial);
        if prefix.len() > partial.len() {
            return Matches::Reduced(qualify(base, &prefix));
        }
        Matches::Listing {
            base: base.map(str::to_string),
            candidates,
        }
    }

    /// Colorized display form: position-index escape, then the name wrapped
    /// in the class color.
    pub fn decorate(&self, i: usize, candidate: &Candidate) -> String {
        let code = match &candidate.value {
            Some(value) => self.settings.palette.code_for(TypeClass::classify(value)),
            None => codes::PLAIN,
        };
        format!("{}{}", index_prefix(i), set_color(&candidate.name, code))
    }
}

/// Adapter to the repeated-polling completion contract some line-editing
/// backends expect: state 0 computes the list, later states index into it,
/// out of range means done.
pub struct PollingCompleter {
    completer: Completer,
    namespace: Rc<RefCell<Namespace>>,
    cached: RefCell<(String, Vec<String>)>,
}

impl PollingCompleter {
    pub fn new(completer: Completer, namespace: Rc<RefCell<Namespace>>) -> Self {
        PollingCompleter {
            completer,
            namespace,
            cached: RefCell::new((String::new(), Vec::new())),
        }
    }

    pub fn complete(&self, text: &str, state: usize) -> Option<String> {
        let mut cached = self.cached.borrow_mut();
        if state == 0 || cached.0 != text {
            let matches = self.completer.complete(&self.namespace.borrow(), text);
            *cached = (text.to_string(), matches);
        }
        cached.1.get(state).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::style::Palette;
    use crate::testing::{arb_namespace, arb_value};
    use crate::value::Module;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn completer(use_colors: bool) -> Completer {
        Completer::new(Rc::new(Settings {
            use_colors,
            consider_getitems: true,
            palette: Palette::default(),
        }))
    }

    fn ns(pairs: Vec<(&str, Value)>) -> Namespace {
        pairs.into_iter().collect()
    }

    fn strings(items: Vec<&str>) -> Vec<String> {
        items.into_iter().map(str::to_string).collect()
    }

    #[test]
    fn commonprefix() {
        assert_eq!(common_prefix(&["isalpha", "isdigit", "foo"], ""), "");
        assert_eq!(common_prefix(&["isalpha", "isdigit"], ""), "is");
        assert_eq!(common_prefix(&["isalpha", "isdigit", "foo"], "i"), "is");
        assert_eq!(common_prefix(&[] as &[&str], ""), "");
        assert_eq!(common_prefix(&["aaa", "bbb"], "x"), "");
    }

    #[test]
    fn complete_attribute() {
        let compl = completer(false);
        let namespace = ns(vec![("a", Value::None)]);
        assert_eq!(compl.complete(&namespace, "a."), strings(vec!["a.__"]));
        let matches = compl.complete(&namespace, "a.__");
        assert!(!matches.contains(&"a.__class__".to_string()));
        assert!(matches.contains(&"__class__".to_string()));
        assert_eq!(
            compl.complete(&namespace, "a.__class"),
            strings(vec!["a.__class__"])
        );
    }

    #[test]
    fn complete_attribute_colored() {
        let compl = completer(true);
        let namespace = ns(vec![("a", Value::Int(42))]);
        let matches = compl.complete(&namespace, "a.__");
        assert!(matches.len() > 2);
        // __class__ resolves to a type object, so it gets the type color
        let expected = set_color("__class__", codes::FUCHSIA);
        assert!(matches.iter().any(|m| m.contains(&expected)));
        assert_eq!(matches.last(), Some(&" ".to_string()));
    }

    #[test]
    fn complete_global() {
        let compl = completer(false);
        let namespace = ns(vec![("foobar", Value::Int(1)), ("foobazzz", Value::Int(2))]);
        assert_eq!(compl.complete(&namespace, "foo"), strings(vec!["fooba"]));
        let matches = compl.complete(&namespace, "fooba");
        assert_eq!(matches, strings(vec!["foobar", "foobazzz"]));
        assert_eq!(
            compl.complete(&namespace, "foobaz"),
            strings(vec!["foobazzz"])
        );
    }

    #[test]
    fn complete_global_colored_appends_spacer() {
        let compl = completer(true);
        let namespace = ns(vec![("foobar", Value::Int(1)), ("foobazzz", Value::Int(2))]);
        let matches = compl.complete(&namespace, "fooba");
        assert_eq!(matches.len(), 3);
        assert_eq!(matches.last(), Some(&" ".to_string()));
        let expected = set_color("foobar", codes::YELLOW);
        assert!(matches[0].contains(&expected));
        assert!(matches[0].starts_with(&index_prefix(0)));
    }

    #[test]
    fn complete_with_indexer() {
        let compl = completer(false);
        let namespace = ns(vec![(
            "lst",
            Value::List(vec![Value::None, Value::Int(2), Value::Int(3)]),
        )]);
        assert_eq!(
            compl.complete(&namespace, "lst[0]."),
            strings(vec!["lst[0].__"])
        );
        let matches = compl.complete(&namespace, "lst[0].__");
        assert!(!matches.contains(&"lst[0].__class__".to_string()));
        assert!(matches.contains(&"__class__".to_string()));
        assert_eq!(
            compl.complete(&namespace, "lst[0].__class"),
            strings(vec!["lst[0].__class__"])
        );
    }

    #[test]
    fn complete_exception_yields_empty() {
        let compl = completer(false);
        assert_eq!(compl.complete(&Namespace::new(), "xxx."), Vec::<String>::new());
    }

    #[test]
    fn complete_invalid_attr_yields_empty() {
        let compl = completer(false);
        let namespace = ns(vec![("str", Value::Type("str".to_string()))]);
        assert_eq!(compl.complete(&namespace, "str.xx"), Vec::<String>::new());
    }

    #[test]
    fn complete_function_call_skipped() {
        let compl = completer(false);
        let namespace = ns(vec![("str", Value::Type("str".to_string()))]);
        assert_eq!(
            compl.complete(&namespace, "str.split()."),
            Vec::<String>::new()
        );
    }

    #[test]
    fn single_match_comes_back_qualified_and_undecorated() {
        let mut fields = BTreeMap::new();
        fields.insert("msgs".to_string(), Value::List(vec![]));
        let compl = completer(true);
        let namespace = ns(vec![("obj", Value::Map(fields))]);
        assert_eq!(compl.complete(&namespace, "obj.msgs"), strings(vec!["obj.msgs"]));
    }

    #[test]
    fn reserved_member_is_excluded() {
        let mut exports = BTreeMap::new();
        exports.insert("pi".to_string(), Some(Value::Float(3.14)));
        let compl = completer(false);
        let namespace = ns(vec![(
            "m",
            Value::Module(Module {
                name: "m".to_string(),
                exports,
            }),
        )]);
        let matches = compl.complete(&namespace, "m.__");
        assert!(!matches.is_empty());
        assert!(!matches.contains(&RESERVED_MEMBER.to_string()));
    }

    #[test]
    fn reserved_member_still_completes_as_a_global() {
        let compl = completer(false);
        let namespace = crate::value::builtins();
        assert_eq!(
            compl.complete(&namespace, "__bui"),
            strings(vec!["__builtins__"])
        );
    }

    #[test]
    fn unresolved_member_gets_the_neutral_color() {
        let mut exports = BTreeMap::new();
        exports.insert("broken".to_string(), None);
        exports.insert("answer".to_string(), Some(Value::Int(42)));
        let compl = completer(true);
        let namespace = ns(vec![(
            "m",
            Value::Module(Module {
                name: "m".to_string(),
                exports,
            }),
        )]);
        let matches = compl.complete(&namespace, "m.");
        assert!(matches
            .iter()
            .any(|m| m.contains(&set_color("broken", codes::PLAIN))));
        assert!(matches
            .iter()
            .any(|m| m.contains(&set_color("answer", codes::YELLOW))));
    }

    #[test]
    fn keywords_complete_in_global_mode() {
        let compl = completer(false);
        assert_eq!(compl.complete(&Namespace::new(), "whil"), strings(vec!["while"]));
        let matches = compl.complete(&Namespace::new(), "i");
        assert_eq!(matches, strings(vec!["if", "import", "in", "is"]));
    }

    #[test]
    fn empty_text_is_a_tab() {
        let compl = completer(false);
        assert_eq!(compl.complete(&Namespace::new(), ""), strings(vec!["\t"]));
    }

    #[test]
    fn polling_walks_the_cached_list() {
        let namespace = Rc::new(RefCell::new(ns(vec![
            ("foobar", Value::Int(1)),
            ("foobazzz", Value::Int(2)),
        ])));
        let poller = PollingCompleter::new(completer(false), namespace);
        assert_eq!(poller.complete("fooba", 0), Some("foobar".to_string()));
        assert_eq!(poller.complete("fooba", 1), Some("foobazzz".to_string()));
        assert_eq!(poller.complete("fooba", 2), None);
        assert_eq!(poller.complete("", 0), Some("\t".to_string()));
        assert_eq!(poller.complete("", 1), None);
    }

    proptest! {
        #[test]
        fn prop_matches_start_with_partial(
            namespace in arb_namespace(),
            partial in "[a-z_]{1,2}",
        ) {
            let compl = completer(false);
            for m in compl.complete(&namespace, &partial) {
                prop_assert!(m.starts_with(&partial), "{:?} does not start with {:?}", m, partial);
            }
        }

        #[test]
        fn prop_identical_requests_agree(
            namespace in arb_namespace(),
            value in arb_value(),
            partial in "[a-z_]{1,2}",
        ) {
            let mut namespace = namespace;
            namespace.insert("probe", value);
            let compl = completer(false);
            let first = compl.complete(&namespace, &partial);
            let second = compl.complete(&namespace, &partial);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_shared_prefix_reduces(
            prefix in "[qvx][a-z]{2,3}",
            suffixes in proptest::collection::btree_set("[a-z]{1,4}", 2..5),
        ) {
            let names: Vec<String> = suffixes
                .iter()
                .map(|suffix| format!("{}{}", prefix, suffix))
                .collect();
            let namespace: Namespace = names
                .iter()
                .map(|name| (name.clone(), Value::Int(1)))
                .collect();
            let compl = completer(false);
            let typed = &prefix[..1];
            let result = compl.complete(&namespace, typed);
            prop_assert_eq!(result, vec![common_prefix(&names, "")]);
        }

        #[test]
        fn prop_colored_listings_end_with_the_spacer(
            namespace in arb_namespace(),
            partial in "[a-z_]{1,2}",
        ) {
            let compl = completer(true);
            let result = compl.complete(&namespace, &partial);
            if result.len() >= 2 {
                prop_assert_eq!(result.last(), Some(&" ".to_string()));
            }
        }
    }
}
