//! Lexer and recursive descent parser for filter expressions.

use thiserror::Error;

use super::{CompareOp, Filter, FilterValue, MAX_FILTER_DEPTH, MAX_FILTER_LENGTH};

/// Why a filter string was rejected. Offsets are in bytes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterParseError {
    #[error("filter is {length} bytes long; the limit is {}", MAX_FILTER_LENGTH)]
    TooLong { length: usize },

    #[error("parentheses nest deeper than {} levels at offset {offset}", MAX_FILTER_DEPTH)]
    TooDeep { offset: usize },

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("quoted value opened at offset {offset} is never closed")]
    UnterminatedString { offset: usize },

    #[error("unsupported escape in quoted value at offset {offset}")]
    BadEscape { offset: usize },

    #[error("'{text}' is not a number (offset {offset})")]
    BadNumber { text: String, offset: usize },

    #[error("'{op}' is not a comparison operator (offset {offset})")]
    UnknownOperator { op: String, offset: usize },

    #[error("expected {expected}, found {found} at offset {offset}")]
    Expected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
}

impl FilterParseError {
    pub fn offset(&self) -> usize {
        match self {
            FilterParseError::TooLong { .. } => 0,
            FilterParseError::TooDeep { offset }
            | FilterParseError::UnexpectedChar { offset, .. }
            | FilterParseError::UnterminatedString { offset }
            | FilterParseError::BadEscape { offset }
            | FilterParseError::BadNumber { offset, .. }
            | FilterParseError::UnknownOperator { offset, .. }
            | FilterParseError::Expected { offset, .. } => *offset,
        }
    }
}

/// Parses a filter expression into its syntax tree.
pub fn parse_filter(input: &str) -> Result<Filter, FilterParseError> {
    if input.len() > MAX_FILTER_LENGTH {
        return Err(FilterParseError::TooLong {
            length: input.len(),
        });
    }

    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        next: 0,
        depth: 0,
    };
    let filter = parser.expr()?;
    parser.expect_end()?;
    Ok(filter)
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Word(String),
    Quoted(String),
    Number(f64),
    Open,
    Close,
    End,
}

impl Kind {
    fn describe(&self) -> String {
        match self {
            Kind::Word(word) => format!("'{word}'"),
            Kind::Quoted(_) => "a quoted value".to_string(),
            Kind::Number(n) => format!("number {n}"),
            Kind::Open => "'('".to_string(),
            Kind::Close => "')'".to_string(),
            Kind::End => "end of input".to_string(),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Kind::Word(word) if word.eq_ignore_ascii_case(keyword))
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    offset: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let kind = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => {
                chars.next();
                Kind::Open
            }
            ')' => {
                chars.next();
                Kind::Close
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err(FilterParseError::UnterminatedString { offset }),
                        Some((_, '"')) => break,
                        Some((at, '\\')) => match chars.next() {
                            Some((_, '"')) => value.push('"'),
                            Some((_, '\\')) => value.push('\\'),
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, 'r')) => value.push('\r'),
                            _ => return Err(FilterParseError::BadEscape { offset: at }),
                        },
                        Some((_, c)) => value.push(c),
                    }
                }
                Kind::Quoted(value)
            }
            c if c.is_ascii_alphabetic() => {
                let mut end = offset;
                while let Some(&(at, c)) = chars.peek() {
                    if !(c.is_ascii_alphanumeric() || c == '_') {
                        break;
                    }
                    end = at + c.len_utf8();
                    chars.next();
                }
                Kind::Word(input[offset..end].to_string())
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let mut end = offset + c.len_utf8();
                chars.next();
                while let Some(&(at, c)) = chars.peek() {
                    if !(c.is_ascii_digit() || c == '.') {
                        break;
                    }
                    end = at + 1;
                    chars.next();
                }
                let text = &input[offset..end];
                let number = text.parse().map_err(|_| FilterParseError::BadNumber {
                    text: text.to_string(),
                    offset,
                })?;
                Kind::Number(number)
            }
            ch => return Err(FilterParseError::UnexpectedChar { ch, offset }),
        };
        tokens.push(Token { kind, offset });
    }

    tokens.push(Token {
        kind: Kind::End,
        offset: input.len(),
    });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    next: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // the End token is never consumed
        &self.tokens[self.next.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != Kind::End {
            self.next += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().kind.is_keyword(keyword) {
            self.bump();
            return true;
        }
        false
    }

    fn unexpected(&self, expected: &'static str) -> FilterParseError {
        let token = self.peek();
        FilterParseError::Expected {
            expected,
            found: token.kind.describe(),
            offset: token.offset,
        }
    }

    fn expect_end(&self) -> Result<(), FilterParseError> {
        match self.peek().kind {
            Kind::End => Ok(()),
            _ => Err(self.unexpected("'and', 'or' or end of input")),
        }
    }

    fn expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.disjunct()?;
        while self.eat_keyword("or") {
            let right = self.disjunct()?;
            left = Filter::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn disjunct(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.term()?;
        while self.eat_keyword("and") {
            let right = self.term()?;
            left = Filter::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Filter, FilterParseError> {
        if self.eat_keyword("not") {
            if self.peek().kind != Kind::Open {
                return Err(self.unexpected("'(' after 'not'"));
            }
            return Ok(Filter::Not(Box::new(self.group()?)));
        }
        if self.peek().kind == Kind::Open {
            return self.group();
        }
        self.comparison()
    }

    fn group(&mut self) -> Result<Filter, FilterParseError> {
        let open = self.bump();
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(FilterParseError::TooDeep {
                offset: open.offset,
            });
        }

        let inner = self.expr()?;
        if self.peek().kind != Kind::Close {
            return Err(self.unexpected("')'"));
        }
        self.bump();
        self.depth -= 1;
        Ok(inner)
    }

    fn comparison(&mut self) -> Result<Filter, FilterParseError> {
        let Kind::Word(attr) = self.peek().kind.clone() else {
            return Err(self.unexpected("an attribute name"));
        };
        self.bump();

        let op = match self.bump() {
            Token {
                kind: Kind::Word(word),
                ..
            } if word.eq_ignore_ascii_case("pr") => return Ok(Filter::Present { attr }),
            Token {
                kind: Kind::Word(word),
                offset,
            } => CompareOp::from_keyword(&word)
                .ok_or(FilterParseError::UnknownOperator { op: word, offset })?,
            Token { kind, offset } => {
                return Err(FilterParseError::Expected {
                    expected: "an operator",
                    found: kind.describe(),
                    offset,
                })
            }
        };

        let value = match self.peek().kind.clone() {
            Kind::Quoted(s) => FilterValue::String(s),
            Kind::Number(n) => FilterValue::Number(n),
            kind if kind.is_keyword("true") => FilterValue::Bool(true),
            kind if kind.is_keyword("false") => FilterValue::Bool(false),
            kind if kind.is_keyword("null") => FilterValue::Null,
            _ => return Err(self.unexpected("a quoted value, number, boolean or null")),
        };
        self.bump();

        Ok(Filter::Compare { attr, op, value })
    }
}
