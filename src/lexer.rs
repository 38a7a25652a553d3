//! Lexical analysis of a command line into words and redirection/pipe operators.
//!
//! Whitespace separates tokens, and the only characters with a meaning of their
//! own are `|`, `<` and `>` (doubled as `>>`).
//! There is no quoting, escaping or globbing.

use std::fmt;

/// Shell operator recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `|`: connect stdout of the left command to stdin of the right one
    Pipe,
    /// `<`: read stdin from a file
    RedirectIn,
    /// `>`: write stdout to a file, truncating it
    RedirectOut,
    /// `>>`: append stdout to a file
    RedirectAppend,
}

impl Operator {
    /// The operator's shell syntax.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Pipe => "|",
            Operator::RedirectIn => "<",
            Operator::RedirectOut => ">",
            Operator::RedirectAppend => ">>",
        }
    }

    /// Whether this operator takes a file name operand.
    pub fn is_redirection(&self) -> bool {
        !matches!(self, Operator::Pipe)
    }
}

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A maximal run of non-whitespace, non-operator characters.
    Word(String),
    /// One of the operators in [`Operator`].
    Operator(Operator),
}

impl Token {
    /// Convenience constructor for word tokens.
    pub fn word(text: impl Into<String>) -> Self {
        Token::Word(text.into())
    }

    /// The text of a word token, `None` for operators.
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            Token::Operator(_) => None,
        }
    }
}

impl fmt::Display for Token {
    /// Renders the token back to the source text it was lexed from.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => f.write_str(w),
            Token::Operator(op) => f.write_str(op.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    fn make_tokens(&mut self) -> Vec<Token> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
            }
        }
        self.finish_word(&mut out);

        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            c if is_separator(c) => {}
            '|' | '<' | '>' => out.push(Token::Operator(self.read_operator(ch))),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            c if is_separator(c) => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '|' | '<' | '>' => {
                self.finish_word(out);
                out.push(Token::Operator(self.read_operator(ch)));
                self.state = LexingState::Start;
            }
            c => self.buffer.push(c),
        }
    }

    /// `ch` has already been consumed; a second `>` is folded into `>>`.
    fn read_operator(&mut self, ch: char) -> Operator {
        match ch {
            '|' => Operator::Pipe,
            '<' => Operator::RedirectIn,
            '>' if self.peek_char() == Some('>') => {
                self.read_char();
                Operator::RedirectAppend
            }
            '>' => Operator::RedirectOut,
            _ => unreachable!("not an operator character: {ch:?}"),
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if !self.buffer.is_empty() {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
        }
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

/// Split a line into tokens.
///
/// An empty or all-whitespace line yields an empty vector, which callers treat
/// as a no-op.
pub fn split_into_tokens(line: &str) -> Vec<Token> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_tokens()
}

/// Render tokens back into a single space-separated line.
pub fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
