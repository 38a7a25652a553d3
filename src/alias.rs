//! Alias storage and leading-word alias expansion.

use crate::error::ShellError;
use crate::lexer::{self, Token};
use log::debug;

/// Number of nested substitutions allowed before expansion is aborted.
pub const ALIAS_DEPTH_LIMIT: usize = 10;

/// A single `name -> value` substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub value: String,
}

/// Aliases known to the shell, in definition order.
///
/// Names are unique; redefining a name overwrites its value in place.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<Alias>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine an alias. Empty names or values are ignored.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if name.is_empty() || value.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Alias { name, value }),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip one matching pair of surrounding `'` or `"` from an alias value.
pub fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Replace a leading alias word by its value until no alias applies.
///
/// The replacement is re-tokenized together with the rest of the line, so an
/// alias value may itself contain operators. Cyclic definitions fail with
/// [`ShellError::AliasRecursionExceeded`] on the substitution that would go
/// past [`ALIAS_DEPTH_LIMIT`].
pub fn expand(tokens: Vec<Token>, aliases: &AliasTable) -> Result<Vec<Token>, ShellError> {
    expand_at(tokens, aliases, 0)
}

fn expand_at(
    tokens: Vec<Token>,
    aliases: &AliasTable,
    depth: usize,
) -> Result<Vec<Token>, ShellError> {
    let Some(Token::Word(name)) = tokens.first() else {
        return Ok(tokens);
    };
    let value = match aliases.lookup(name) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(tokens),
    };
    if depth >= ALIAS_DEPTH_LIMIT {
        return Err(ShellError::AliasRecursionExceeded {
            name: name.clone(),
            limit: ALIAS_DEPTH_LIMIT,
        });
    }

    let rest = lexer::join_tokens(&tokens[1..]);
    let line = if rest.is_empty() {
        value.to_string()
    } else {
        format!("{value} {rest}")
    };
    debug!("alias {name} -> {line:?} (depth {depth})");
    expand_at(lexer::split_into_tokens(&line), aliases, depth + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Operator, split_into_tokens};

    fn words(ws: &[&str]) -> Vec<Token> {
        ws.iter().map(|w| Token::word(*w)).collect()
    }

    #[test]
    fn redefinition_overwrites() {
        let mut table = AliasTable::new();
        table.add("ll", "ls -l");
        table.add("ll", "ls -la");
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("ll"), Some("ls -la"));
    }

    #[test]
    fn empty_definitions_are_ignored() {
        let mut table = AliasTable::new();
        table.add("", "ls");
        table.add("x", "");
        assert!(table.is_empty());
    }

    #[test]
    fn definition_order_is_kept() {
        let mut table = AliasTable::new();
        table.add("b", "1");
        table.add("a", "2");
        table.add("b", "3");
        let names: Vec<_> = table.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn unquote_strips_one_matching_pair() {
        assert_eq!(unquote("'ls -l'"), "ls -l");
        assert_eq!(unquote("\"ls -l\""), "ls -l");
        assert_eq!(unquote("'ls -l\""), "'ls -l\"");
        assert_eq!(unquote("''x''"), "'x'");
        assert_eq!(unquote("'"), "'");
    }

    #[test]
    fn leading_alias_is_replaced() {
        let mut table = AliasTable::new();
        table.add("ll", "ls -l");
        let out = expand(words(&["ll", "-a"]), &table).unwrap();
        assert_eq!(out, words(&["ls", "-l", "-a"]));
    }

    #[test]
    fn only_the_leading_word_is_expanded() {
        let mut table = AliasTable::new();
        table.add("ll", "ls -l");
        let out = expand(words(&["echo", "ll"]), &table).unwrap();
        assert_eq!(out, words(&["echo", "ll"]));
    }

    #[test]
    fn operators_survive_expansion() {
        let mut table = AliasTable::new();
        table.add("ll", "ls -l");
        let out = expand(split_into_tokens("ll >> log"), &table).unwrap();
        assert_eq!(
            out,
            vec![
                Token::word("ls"),
                Token::word("-l"),
                Token::Operator(Operator::RedirectAppend),
                Token::word("log"),
            ]
        );
    }

    #[test]
    fn alias_value_may_contain_a_pipe() {
        let mut table = AliasTable::new();
        table.add("count", "ls | wc -l");
        let out = expand(words(&["count"]), &table).unwrap();
        assert!(out.contains(&Token::Operator(Operator::Pipe)));
    }

    #[test]
    fn chained_aliases_expand() {
        let mut table = AliasTable::new();
        table.add("l", "ll");
        table.add("ll", "ls -l");
        assert_eq!(expand(words(&["l"]), &table).unwrap(), words(&["ls", "-l"]));
    }

    #[test]
    fn self_reference_fails() {
        let mut table = AliasTable::new();
        table.add("x", "x");
        let err = expand(words(&["x"]), &table).unwrap_err();
        assert!(matches!(
            err,
            ShellError::AliasRecursionExceeded { ref name, limit: ALIAS_DEPTH_LIMIT } if name == "x"
        ));
    }

    #[test]
    fn mutual_reference_fails() {
        let mut table = AliasTable::new();
        table.add("a", "b");
        table.add("b", "a -v");
        assert!(matches!(
            expand(words(&["a"]), &table),
            Err(ShellError::AliasRecursionExceeded { .. })
        ));
    }

    fn chain(len: usize) -> AliasTable {
        let mut table = AliasTable::new();
        for i in 0..len {
            table.add(format!("a{i}"), format!("a{}", i + 1));
        }
        table
    }

    #[test]
    fn depth_limit_allows_exactly_ten_substitutions() {
        let out = expand(words(&["a0"]), &chain(ALIAS_DEPTH_LIMIT)).unwrap();
        assert_eq!(out, words(&["a10"]));
    }

    #[test]
    fn eleventh_substitution_is_rejected() {
        let err = expand(words(&["a0"]), &chain(ALIAS_DEPTH_LIMIT + 1)).unwrap_err();
        assert!(matches!(err, ShellError::AliasRecursionExceeded { ref name, .. } if name == "a10"));
    }

    #[test]
    fn failure_does_not_poison_later_expansions() {
        let mut table = AliasTable::new();
        table.add("x", "x");
        table.add("ll", "ls -l");
        assert!(expand(words(&["x"]), &table).is_err());
        assert_eq!(expand(words(&["ll"]), &table).unwrap(), words(&["ls", "-l"]));
    }

    #[test]
    fn empty_input_is_untouched() {
        let table = AliasTable::new();
        assert!(expand(Vec::new(), &table).unwrap().is_empty());
    }
}
