use rustyline::{
    completion::{Completer, Pair},
    highlight::Highlighter,
    hint::Hinter,
    validate::Validator,
    Cmd, CompletionType, Context, Editor, Helper as HelperTrait, KeyPress, Result,
};
use std::{cell::RefCell, rc::Rc};

use crate::{
    complete::{self, Matches},
    config::{self, Settings},
    value::Namespace,
};

pub struct Helper {
    completer: complete::Completer,
    namespace: Rc<RefCell<Namespace>>,
    settings: Rc<Settings>,
}

impl Helper {
    pub fn new(settings: Rc<Settings>, namespace: Rc<RefCell<Namespace>>) -> Self {
        Helper {
            completer: complete::Completer::new(settings.clone()),
            namespace,
            settings,
        }
    }
}

/// Word characters for the completion word: identifiers and dots, plus
/// indexing brackets when `consider_getitems` is set.
fn word_start(line: &str, pos: usize, consider_getitems: bool) -> usize {
    let is_word = |c: char| {
        c.is_alphanumeric() || c == '_' || c == '.' || (consider_getitems && (c == '[' || c == ']'))
    };
    line[..pos]
        .char_indices()
        .rev()
        .find(|(_, c)| !is_word(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0)
}

impl Completer for Helper {
    type Candidate = Pair;
    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos, self.settings.consider_getitems);
        let word = &line[start..pos];
        if word.is_empty() {
            // blank-line TAB inserts indentation
            let tab = "\t".to_string();
            return Ok((
                start,
                vec![Pair {
                    display: tab.clone(),
                    replacement: tab,
                }],
            ));
        }
        let namespace = self.namespace.borrow();
        let pairs = match self.completer.matches(&namespace, word) {
            Matches::Empty => Vec::new(),
            Matches::Reduced(prefix) => vec![Pair {
                display: prefix.clone(),
                replacement: prefix,
            }],
            Matches::Listing { base, candidates } => candidates
                .iter()
                .enumerate()
                .map(|(i, candidate)| {
                    let display = if self.settings.use_colors {
                        self.completer.decorate(i, candidate)
                    } else {
                        candidate.name.clone()
                    };
                    Pair {
                        display,
                        replacement: complete::qualify(base.as_deref(), &candidate.name),
                    }
                })
                .collect(),
        };
        Ok((start, pairs))
    }
}
impl Highlighter for Helper {}
impl Hinter for Helper {}
impl Validator for Helper {}
impl HelperTrait for Helper {}

/// Build the line editor with the completer installed, TAB bound to
/// completion, and history loaded.
pub fn setup(settings: Rc<Settings>, namespace: Rc<RefCell<Namespace>>) -> Editor<Helper> {
    let editor_config = rustyline::Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(true)
        .build();
    let mut editor: Editor<Helper> = Editor::with_config(editor_config);
    editor.set_helper(Some(Helper::new(settings, namespace)));
    bind_complete(&mut editor);
    if let Some(path) = config::history_path() {
        // no history yet is fine
        let _ = editor.load_history(&path);
    }
    editor
}

#[cfg(not(target_os = "macos"))]
fn bind_complete(editor: &mut Editor<Helper>) {
    editor.bind_sequence(KeyPress::Tab, Cmd::Complete);
}

// libedit-style backends deliver TAB as ^I
#[cfg(target_os = "macos")]
fn bind_complete(editor: &mut Editor<Helper>) {
    editor.bind_sequence(KeyPress::Ctrl('I'), Cmd::Complete);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_start_stops_at_delimiters() {
        assert_eq!(word_start("print lst[0].ap", 15, true), 6);
        assert_eq!(word_start("print lst[0].ap", 15, false), 12);
        assert_eq!(word_start("a.b", 3, true), 0);
        assert_eq!(word_start("", 0, true), 0);
        assert_eq!(word_start("x = foo", 7, true), 4);
    }
}
