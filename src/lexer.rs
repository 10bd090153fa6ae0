//! Tokenization for esh
//!
//! A character-at-a-time state machine over four states: unquoted,
//! single-quoted, double-quoted and escape-pending. Variable expansion
//! happens while scanning, so the tokens that come out are already
//! expanded argument text plus a few structural markers.

use crate::state::ExpansionContext;
use std::ops::Range;
use thiserror::Error;

/// Longest variable name read after `$`; further characters are plain text
pub const MAX_VAR_NAME: usize = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A literal argument
    Word(String),
    /// An argument holding one unresolved `*`, split around it
    Wildcard { prefix: String, suffix: String },
    /// `|`
    Pipe,
    /// `>`; two in a row mean append
    Redirect,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unterminated quoted string.")]
    UnterminatedQuote,
}

/// Word separator rule shared with tab completion
pub fn is_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Byte ranges of the separator-delimited words in `line`.
///
/// Quoting is deliberately ignored here; this is the coarse split that tab
/// completion works on.
pub fn word_spans(line: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if is_separator(c) {
            if let Some(s) = start.take() {
                spans.push(s..i);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push(s..line.len());
    }
    spans
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    ctx: &'a ExpansionContext,
    tokens: Vec<Token>,
    current: String,
    /// Byte offset of the wildcard marker inside `current`
    star: Option<usize>,
    quote: Option<char>,
    escaped: bool,
}

impl<'a> Lexer<'a> {
    fn new(input: &str, ctx: &'a ExpansionContext) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            ctx,
            tokens: Vec::new(),
            current: String::new(),
            star: None,
            quote: None,
            escaped: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];

            if self.escaped {
                self.escaped = false;
                match self.quote {
                    None if c == '\n' => break,
                    None => self.current.push(c),
                    Some(_) => {
                        if !matches!(c, '\\' | '"' | '$') {
                            self.current.push('\\');
                        }
                        self.current.push(c);
                    }
                }
                self.pos += 1;
                continue;
            }

            match self.quote {
                Some('\'') => {
                    if c == '\'' {
                        self.quote = None;
                    } else {
                        self.current.push(c);
                    }
                }
                Some(_) => match c {
                    '"' => self.quote = None,
                    '\\' => self.escaped = true,
                    '$' => {
                        self.expand_variable();
                        continue;
                    }
                    _ => self.current.push(c),
                },
                None => match c {
                    '\\' => self.escaped = true,
                    '\'' | '"' => self.quote = Some(c),
                    '$' => {
                        self.expand_variable();
                        continue;
                    }
                    // only one wildcard per argument
                    '*' if self.star.is_none() => self.star = Some(self.current.len()),
                    '\n' => break,
                    '|' => {
                        self.finish_word();
                        self.tokens.push(Token::Pipe);
                    }
                    '>' => {
                        self.finish_word();
                        self.tokens.push(Token::Redirect);
                    }
                    '#' if self.current.is_empty() && self.star.is_none() => break,
                    c if is_separator(c) => self.finish_word(),
                    _ => self.current.push(c),
                },
            }
            self.pos += 1;
        }

        if self.quote.is_some() {
            return Err(LexError::UnterminatedQuote);
        }
        self.finish_word();
        Ok(self.tokens)
    }

    /// Expand `$NAME` / `${NAME}` starting at the `$` under `pos`, leaving
    /// `pos` just past the reference.
    fn expand_variable(&mut self) {
        let mut i = self.pos + 1;
        let mut name = String::new();

        match self.chars.get(i) {
            Some('{') => {
                i += 1;
                while i < self.chars.len() && self.chars[i] != '}' && name.len() < MAX_VAR_NAME {
                    name.push(self.chars[i]);
                    i += 1;
                }
                if self.chars.get(i) == Some(&'}') {
                    i += 1;
                }
            }
            Some(&c) if c.is_ascii_digit() || c == '?' => {
                name.push(c);
                i += 1;
            }
            _ => {
                while i < self.chars.len() && is_name_char(self.chars[i]) && name.len() < MAX_VAR_NAME {
                    name.push(self.chars[i]);
                    i += 1;
                }
                if name.is_empty() {
                    self.current.push('$');
                    self.pos = i;
                    return;
                }
            }
        }

        let value = self.ctx.resolve(&name);
        self.current.push_str(&value);
        self.pos = i;
    }

    fn finish_word(&mut self) {
        let text = std::mem::take(&mut self.current);
        match self.star.take() {
            Some(at) => self.tokens.push(Token::Wildcard {
                prefix: text[..at].to_string(),
                suffix: text[at..].to_string(),
            }),
            None if !text.is_empty() => self.tokens.push(Token::Word(text)),
            None => {}
        }
    }
}

/// Tokenize one logical line, expanding variables against `ctx`.
///
/// Returns [`LexError::UnterminatedQuote`] when the input ends inside a
/// quote; the caller is expected to append a continuation line and retry.
pub fn lex(input: &str, ctx: &ExpansionContext) -> Result<Vec<Token>, LexError> {
    Lexer::new(input, ctx).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx() -> ExpansionContext {
        let mut vars = HashMap::new();
        vars.insert("HOME".to_string(), "/home/kay".to_string());
        vars.insert("GLOB".to_string(), "a*b".to_string());
        ExpansionContext::with_env(vars)
    }

    fn words(input: &str) -> Vec<String> {
        lex(input, &ctx())
            .unwrap()
            .into_iter()
            .map(|t| match t {
                Token::Word(w) => w,
                other => panic!("unexpected token {:?}", other),
            })
            .collect()
    }

    #[test]
    fn tokenize_double_quotes() {
        assert_eq!(words("echo \"a b\" c"), vec!["echo", "a b", "c"]);
    }

    #[test]
    fn tokenize_single_quotes_no_expansion() {
        assert_eq!(words("echo 'a $HOME b'"), vec!["echo", "a $HOME b"]);
        assert_eq!(words(r"echo 'back\slash'"), vec!["echo", r"back\slash"]);
    }

    #[test]
    fn tokenize_exit_status() {
        let mut ctx = ctx();
        ctx.last_status = 3;
        let tokens = lex("echo $?", &ctx).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Word("echo".into()), Token::Word("3".into())]
        );
    }

    #[test]
    fn tokenize_variables() {
        assert_eq!(words("echo $HOME ${HOME}/x"), vec!["echo", "/home/kay", "/home/kay/x"]);
        assert_eq!(words("echo \"$HOME\""), vec!["echo", "/home/kay"]);
        assert_eq!(words("echo pre$UNSET"), vec!["echo", "pre"]);
    }

    #[test]
    fn tokenize_single_digit_positional() {
        let mut ctx = ctx();
        ctx.set_positional(vec!["s".into(), "one".into()]);
        let tokens = lex("echo $12", &ctx).unwrap();
        assert_eq!(tokens[1], Token::Word("one2".into()));
    }

    #[test]
    fn tokenize_lone_dollar_is_literal() {
        assert_eq!(words("echo $ a$"), vec!["echo", "$", "a$"]);
    }

    #[test]
    fn expansion_is_not_rescanned() {
        // the value holds a '*' but it must stay literal
        assert_eq!(words("echo $GLOB"), vec!["echo", "a*b"]);
    }

    #[test]
    fn tokenize_escapes() {
        assert_eq!(words(r"echo a\ b \$HOME \|"), vec!["echo", "a b", "$HOME", "|"]);
        assert_eq!(words(r#"echo "q\"x" "a\nb""#), vec!["echo", "q\"x", r"a\nb"]);
    }

    #[test]
    fn tokenize_pipe_and_redirect() {
        let tokens = lex("ls|wc -l > out", &ctx()).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("ls".into()),
                Token::Pipe,
                Token::Word("wc".into()),
                Token::Word("-l".into()),
                Token::Redirect,
                Token::Word("out".into()),
            ]
        );
    }

    #[test]
    fn tokenize_double_redirect() {
        let tokens = lex("echo hi >> out", &ctx()).unwrap();
        assert_eq!(tokens[2], Token::Redirect);
        assert_eq!(tokens[3], Token::Redirect);
    }

    #[test]
    fn tokenize_wildcard() {
        let tokens = lex("ls *.txt a*b*c", &ctx()).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("ls".into()),
                Token::Wildcard { prefix: "".into(), suffix: ".txt".into() },
                Token::Wildcard { prefix: "a".into(), suffix: "b*c".into() },
            ]
        );
    }

    #[test]
    fn quoted_or_escaped_star_is_literal() {
        assert_eq!(words(r#"echo "*" '*' \*"#), vec!["echo", "*", "*", "*"]);
    }

    #[test]
    fn tokenize_comment() {
        assert_eq!(words("echo hi # the rest"), vec!["echo", "hi"]);
        assert_eq!(words("echo a#b"), vec!["echo", "a#b"]);
        assert!(lex("# only a comment", &ctx()).unwrap().is_empty());
    }

    #[test]
    fn newline_ends_line_outside_quotes() {
        assert_eq!(words("echo a\necho b"), vec!["echo", "a"]);
        assert_eq!(words("echo 'a\nb'"), vec!["echo", "a\nb"]);
    }

    #[test]
    fn unterminated_quote() {
        assert_eq!(lex("\"unterminated", &ctx()), Err(LexError::UnterminatedQuote));
        assert_eq!(lex("echo 'abc", &ctx()), Err(LexError::UnterminatedQuote));
    }

    #[test]
    fn empty_quotes_produce_no_argument() {
        assert_eq!(words("echo \"\""), vec!["echo"]);
    }

    #[test]
    fn rejoin_round_trip() {
        let line = "  ls   -la  /tmp foo-bar  ";
        let joined = words(line).join(" ");
        let collapsed: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(joined, collapsed.join(" "));
    }

    #[test]
    fn variable_name_limit() {
        let long = "A".repeat(MAX_VAR_NAME + 3);
        let tokens = lex(&format!("echo ${}", long), &ctx()).unwrap();
        assert_eq!(tokens[1], Token::Word("AAA".into()));
    }

    #[test]
    fn spans_ignore_quotes() {
        let line = "cat \"a b\"  c";
        let spans: Vec<&str> = word_spans(line).into_iter().map(|r| &line[r]).collect();
        assert_eq!(spans, vec!["cat", "\"a", "b\"", "c"]);
    }
}
