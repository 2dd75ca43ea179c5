//! Type-expression parser.
//!
//! Accepts the same surface syntax the formatter renders, so that every
//! rendered name parses back to the same interned type:
//!
//! ```text
//! Integer                      Suit::Spades            T.untyped
//! T.nilable(String)            T.any(Integer, Float)   T.all(Comparable, Numeric)
//! T::Array[Integer]            T::Hash[Symbol, T.untyped]
//! T::Boolean                   T.class_of(Foo)         T::Class[Foo]
//! T.proc.params(x: Integer).returns(String)            T.proc.bind(Foo).void
//! T.type_parameter(:U)         T.type_member(:out)     T.type_member(fixed: Integer)
//! ```
//!
//! Class names are resolved through the database's class table. A path whose
//! prefix is an enum class and whose last segment is a member label resolves to
//! the member's singleton type.

use crate::TypeDatabase;
use crate::coerce::class_type;
use crate::types::{ContainerKind, TypeId, Variance};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("expected {expected} at offset {offset}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
    #[error("unresolved constant `{0}`")]
    UnknownConstant(String),
    #[error("unknown type constructor `{0}`")]
    UnknownConstructor(String),
    #[error("`{name}` takes {expected} type argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("`T.proc` needs a `.returns(...)` or `.void`")]
    ProcWithoutReturn,
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    /// `:name`
    Symbol(String),
    Dot,
    ColonColon,
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("`{s}`"),
            Token::Symbol(s) => format!("`:{s}`"),
            Token::Dot => "`.`".into(),
            Token::ColonColon => "`::`".into(),
            Token::Colon => "`:`".into(),
            Token::Comma => "`,`".into(),
            Token::LParen => "`(`".into(),
            Token::RParen => "`)`".into(),
            Token::LBracket => "`[`".into(),
            Token::RBracket => "`]`".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '?' || c == '!'
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens: Vec<(Token, usize)> = Vec::new();
    let mut i = 0;
    let ident_at = |start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_continue(chars[end].1) {
            end += 1;
        }
        (chars[start..end].iter().map(|(_, c)| c).collect(), end)
    };
    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);
        match c {
            c if c.is_whitespace() => i += 1,
            '.' => {
                tokens.push((Token::Dot, offset));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, offset));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, offset));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, offset));
                i += 1;
            }
            '[' => {
                tokens.push((Token::LBracket, offset));
                i += 1;
            }
            ']' => {
                tokens.push((Token::RBracket, offset));
                i += 1;
            }
            ':' if next == Some(':') => {
                tokens.push((Token::ColonColon, offset));
                i += 2;
            }
            // `:sym`, unless it is the colon of `name: Type` written without
            // a space.
            ':' if next.is_some_and(is_ident_start)
                && !matches!(tokens.last(), Some((Token::Ident(_), _))) =>
            {
                let (name, end) = ident_at(i + 1);
                tokens.push((Token::Symbol(name), offset));
                i = end;
            }
            ':' => {
                tokens.push((Token::Colon, offset));
                i += 1;
            }
            c if is_ident_start(c) => {
                let (name, end) = ident_at(i);
                tokens.push((Token::Ident(name), offset));
                i = end;
            }
            ch => return Err(ParseError::UnexpectedChar { ch, offset }),
        }
    }
    tokens.push((Token::Eof, src.len()));
    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    db: &'a dyn TypeDatabase,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, o)| *o).unwrap_or(0)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self.peek().describe(),
            offset: self.offset(),
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ParseError> {
        if *self.peek() == token {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.bump();
            true
        } else {
            false
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, ParseError> {
        if matches!(self.peek(), Token::Ident(_)) {
            if let Token::Ident(name) = self.bump() {
                return Ok(name);
            }
        }
        Err(self.unexpected(expected))
    }

    fn parse_type(&mut self) -> Result<TypeId, ParseError> {
        let head = self.ident("a type")?;
        if head == "T" {
            if self.eat(&Token::Dot) {
                return self.parse_t_method();
            }
            if self.eat(&Token::ColonColon) {
                return self.parse_t_constant();
            }
        }
        self.parse_path(head)
    }

    /// `Foo::Bar` or an enum member `Suit::Spades`.
    fn parse_path(&mut self, head: String) -> Result<TypeId, ParseError> {
        let mut segments = vec![head];
        while self.eat(&Token::ColonColon) {
            segments.push(self.ident("a constant name")?);
        }
        let full = segments.join("::");
        let classes = self.db.classes();
        if let Some(class) = classes.lookup(&full) {
            return Ok(class_type(self.db, class));
        }
        if let Some((label, prefix)) = segments.split_last() {
            if !prefix.is_empty() {
                if let Some(object) = classes
                    .lookup(&prefix.join("::"))
                    .and_then(|owner| classes.enum_value_by_label(owner, label))
                {
                    return Ok(self.db.singleton(&object));
                }
            }
        }
        Err(ParseError::UnknownConstant(full))
    }

    /// Everything after `T::`.
    fn parse_t_constant(&mut self) -> Result<TypeId, ParseError> {
        let name = self.ident("a generic name")?;
        if name == "Boolean" {
            return Ok(TypeId::BOOLEAN);
        }
        let qualified = format!("T::{name}");
        self.expect(Token::LBracket, "`[`")?;
        let args = self.parse_list(Token::RBracket)?;
        let arity = |expected: usize| -> Result<(), ParseError> {
            if args.len() == expected {
                Ok(())
            } else {
                Err(ParseError::Arity {
                    name: qualified.clone(),
                    expected,
                    found: args.len(),
                })
            }
        };
        if let Some(kind) = ContainerKind::from_generic_name(&qualified) {
            arity(1)?;
            return Ok(self.db.container(kind, args[0]));
        }
        match name.as_str() {
            "Hash" => {
                arity(2)?;
                Ok(self.db.hash(args[0], args[1]))
            }
            "Class" => {
                arity(1)?;
                Ok(self.db.typed_class(args[0]))
            }
            "Module" => {
                arity(1)?;
                Ok(self.db.typed_module(args[0]))
            }
            _ => Err(ParseError::UnknownConstructor(qualified.clone())),
        }
    }

    /// Everything after `T.`.
    fn parse_t_method(&mut self) -> Result<TypeId, ParseError> {
        let name = self.ident("a type constructor")?;
        match name.as_str() {
            "untyped" => Ok(TypeId::UNTYPED),
            "anything" => Ok(TypeId::UNKNOWN),
            "noreturn" => Ok(TypeId::NORETURN),
            "nilable" => {
                let args = self.parse_call_args()?;
                self.exactly(&name, &args, 1)?;
                Ok(self.db.nilable(args[0]))
            }
            "any" => {
                let args = self.parse_call_args()?;
                Ok(self.db.union(args))
            }
            "all" => {
                let args = self.parse_call_args()?;
                Ok(self.db.intersection(args))
            }
            "class_of" => {
                self.expect(Token::LParen, "`(`")?;
                let head = self.ident("a class name")?;
                let mut segments = vec![head];
                while self.eat(&Token::ColonColon) {
                    segments.push(self.ident("a constant name")?);
                }
                self.expect(Token::RParen, "`)`")?;
                let full = segments.join("::");
                let class = self
                    .db
                    .classes()
                    .lookup(&full)
                    .ok_or(ParseError::UnknownConstant(full))?;
                Ok(self.db.class_of(class))
            }
            "type_parameter" => {
                self.expect(Token::LParen, "`(`")?;
                let name = match self.bump() {
                    Token::Symbol(name) => name,
                    _ => return Err(self.unexpected("a symbol")),
                };
                self.expect(Token::RParen, "`)`")?;
                Ok(self.db.type_parameter(&name))
            }
            "type_member" | "type_template" => self.parse_type_member(),
            "proc" => self.parse_proc(),
            _ => Err(ParseError::UnknownConstructor(format!("T.{name}"))),
        }
    }

    fn parse_type_member(&mut self) -> Result<TypeId, ParseError> {
        if !self.eat(&Token::LParen) {
            return Ok(self.db.type_variable(Variance::Invariant, None));
        }
        let result = match self.bump() {
            Token::Symbol(s) if s == "out" => self.db.type_variable(Variance::Covariant, None),
            Token::Symbol(s) if s == "in" => self.db.type_variable(Variance::Contravariant, None),
            Token::Ident(s) if s == "fixed" => {
                self.expect(Token::Colon, "`:`")?;
                let fixed = self.parse_type()?;
                self.db.type_variable(Variance::Invariant, Some(fixed))
            }
            _ => return Err(self.unexpected("`:in`, `:out` or `fixed:`")),
        };
        self.expect(Token::RParen, "`)`")?;
        Ok(result)
    }

    fn parse_proc(&mut self) -> Result<TypeId, ParseError> {
        let mut bind = None;
        let mut params: Vec<(Arc<str>, TypeId)> = Vec::new();
        let mut returns = None;
        while returns.is_none() && self.eat(&Token::Dot) {
            let step = self.ident("`bind`, `params`, `returns` or `void`")?;
            match step.as_str() {
                "bind" => {
                    let args = self.parse_call_args()?;
                    self.exactly("T.proc.bind", &args, 1)?;
                    bind = Some(args[0]);
                }
                "params" => {
                    self.expect(Token::LParen, "`(`")?;
                    if !self.eat(&Token::RParen) {
                        loop {
                            let name = self.ident("a parameter name")?;
                            self.expect(Token::Colon, "`:`")?;
                            let ty = self.parse_type()?;
                            params.push((name.into(), ty));
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                        self.expect(Token::RParen, "`)`")?;
                    }
                }
                "returns" => {
                    let args = self.parse_call_args()?;
                    self.exactly("T.proc.returns", &args, 1)?;
                    returns = Some(args[0]);
                }
                "void" => returns = Some(TypeId::VOID),
                other => return Err(ParseError::UnknownConstructor(format!("T.proc.{other}"))),
            }
        }
        let returns = returns.ok_or(ParseError::ProcWithoutReturn)?;
        Ok(match bind {
            Some(bind) => self.db.bound_proc(bind, params, returns),
            None => self.db.proc_type(params, returns),
        })
    }

    fn parse_call_args(&mut self) -> Result<Vec<TypeId>, ParseError> {
        self.expect(Token::LParen, "`(`")?;
        self.parse_list(Token::RParen)
    }

    /// Comma-separated types up to (and including) `close`.
    fn parse_list(&mut self, close: Token) -> Result<Vec<TypeId>, ParseError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_type()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let expected = if close == Token::RParen { "`)`" } else { "`]`" };
        self.expect(close, expected)?;
        Ok(items)
    }

    fn exactly(&self, name: &str, args: &[TypeId], expected: usize) -> Result<(), ParseError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(ParseError::Arity {
                name: name.to_string(),
                expected,
                found: args.len(),
            })
        }
    }
}

/// Parse a type expression such as `T::Array[T.nilable(Integer)]`.
pub fn parse_type(db: &dyn TypeDatabase, src: &str) -> Result<TypeId, ParseError> {
    let mut parser = Parser {
        db,
        tokens: tokenize(src)?,
        pos: 0,
    };
    let ty = parser.parse_type()?;
    if *parser.peek() != Token::Eof {
        return Err(parser.unexpected("end of input"));
    }
    Ok(ty)
}

#[cfg(test)]
#[path = "tests/parse_tests.rs"]
mod tests;
