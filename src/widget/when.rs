//! Context-key expressions that gate editor commands (`!suggestWidgetVisible`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Named booleans the widget maintains about its own UI state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContextKeys {
    keys: BTreeMap<String, bool>,
}

impl ContextKeys {
    pub fn set(&mut self, key: impl Into<String>, value: bool) {
        self.keys.insert(key.into(), value);
    }

    /// Unset keys read as false.
    pub fn get(&self, key: &str) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid when clause `{input}`: {reason}")]
pub struct WhenParseError {
    pub input: String,
    pub reason: String,
}

/// A parsed `when` expression: keys combined with `!`, `&&` and `||`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhenClause {
    Key(String),
    Not(Box<WhenClause>),
    And(Box<WhenClause>, Box<WhenClause>),
    Or(Box<WhenClause>, Box<WhenClause>),
}

impl WhenClause {
    pub fn evaluate(&self, keys: &ContextKeys) -> bool {
        match self {
            Self::Key(key) => keys.get(key),
            Self::Not(inner) => !inner.evaluate(keys),
            Self::And(a, b) => a.evaluate(keys) && b.evaluate(keys),
            Self::Or(a, b) => a.evaluate(keys) || b.evaluate(keys),
        }
    }
}

impl fmt::Display for WhenClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::And(a, b) => write!(f, "({a} && {b})"),
            Self::Or(a, b) => write!(f, "({a} || {b})"),
        }
    }
}

impl FromStr for WhenClause {
    type Err = WhenParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| WhenParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let tokens = tokenize(input).map_err(|reason| fail(&reason))?;
        if tokens.is_empty() {
            return Err(fail("empty expression"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let clause = parser.or().map_err(|reason| fail(&reason))?;
        if parser.pos != parser.tokens.len() {
            return Err(fail("unexpected trailing input"));
        }
        Ok(clause)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Key(String),
    Not,
    And,
    Or,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '!' => tokens.push(Token::Not),
            '&' | '|' => {
                if chars.next_if(|&(_, next)| next == c).is_none() {
                    return Err(format!("lone `{c}` at {i}"));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if is_key_char(c) => {
                let mut key = String::from(c);
                while let Some((_, next)) = chars.next_if(|&(_, next)| is_key_char(next)) {
                    key.push(next);
                }
                tokens.push(Token::Key(key));
            }
            other => return Err(format!("unexpected `{other}` at {i}")),
        }
    }
    Ok(tokens)
}

const fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn or(&mut self) -> Result<WhenClause, String> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            let right = self.and()?;
            left = WhenClause::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<WhenClause, String> {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            let right = self.unary()?;
            left = WhenClause::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<WhenClause, String> {
        if self.eat(&Token::Not) {
            return Ok(WhenClause::Not(Box::new(self.unary()?)));
        }
        match self.tokens.get(self.pos) {
            Some(Token::Key(key)) => {
                let key = key.clone();
                self.pos += 1;
                Ok(WhenClause::Key(key))
            }
            Some(other) => Err(format!("expected a key, found {other:?}")),
            None => Err("expected a key, found end of input".to_string()),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}
