use super::{BinaryOp, Expr, ExprError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
}

/// Whether `name` can be written without backticks.
pub(super) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn error(offset: usize, message: impl Into<String>) -> ExprError {
    ExprError::Parse {
        offset,
        message: message.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos] as char;
        let start = pos;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                pos += 1;
                continue;
            }
            '+' => tokens.push((start, Token::Plus)),
            '-' => tokens.push((start, Token::Minus)),
            '/' => tokens.push((start, Token::Slash)),
            '^' => tokens.push((start, Token::Pow)),
            '(' => tokens.push((start, Token::LParen)),
            ')' => tokens.push((start, Token::RParen)),
            '.' if !bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                tokens.push((start, Token::Dot))
            }
            '*' => {
                if bytes.get(pos + 1) == Some(&b'*') {
                    pos += 1;
                    tokens.push((start, Token::Pow));
                } else {
                    tokens.push((start, Token::Star));
                }
            }
            '`' => {
                let rest = &source[pos + 1..];
                let end = rest
                    .find('`')
                    .ok_or_else(|| error(start, "unterminated quoted name"))?;
                let name = &rest[..end];
                if name.is_empty() {
                    return Err(error(start, "empty quoted name"));
                }
                tokens.push((start, Token::Name(name.to_string())));
                pos += end + 2;
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = pos;
                while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
                    end += 1;
                }
                if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
                    let mut exp = end + 1;
                    if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
                        exp += 1;
                    }
                    if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                        end = exp;
                        while end < bytes.len() && bytes[end].is_ascii_digit() {
                            end += 1;
                        }
                    }
                }
                let text = &source[pos..end];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| error(start, format!("invalid number '{text}'")))?;
                tokens.push((start, Token::Number(value)));
                pos = end;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = pos;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                tokens.push((start, Token::Name(source[pos..end].to_string())));
                pos = end;
                continue;
            }
            _ => {
                let found = source[pos..].chars().next().unwrap_or(c);
                return Err(error(start, format!("unexpected character '{found}'")));
            }
        }
        pos += 1;
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses, signs and exponents accepted in one formula.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, token)| token.clone());
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(error(self.offset(), "expression nested too deeply"));
        }
        self.depth += 1;
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                // `-2` is a literal; `-2 ^ 2` stays a negated power.
                match self.unary()? {
                    Expr::Number(value) => Ok(Expr::Number(-value)),
                    inner => Ok(Expr::Neg(Box::new(inner))),
                }
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Pow) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Name(name)) => {
                if self.peek() != Some(&Token::Dot) {
                    return Ok(Expr::Param(name));
                }
                self.advance();
                let offset = self.offset();
                match self.advance() {
                    Some(Token::Name(value)) => Ok(Expr::EnumIs { param: name, value }),
                    _ => Err(error(offset, "expected an enum value after '.'")),
                }
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                let offset = self.offset();
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(error(offset, "expected ')'")),
                }
            }
            Some(other) => Err(error(offset, format!("unexpected token {other:?}"))),
            None => Err(error(offset, "unexpected end of expression")),
        }
    }
}

/// Parses an amount formula such as `steel_1 * 2 + \`Aluminium sheet_3\``.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(error(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    let expr = parser.expression()?;
    if parser.pos < parser.tokens.len() {
        return Err(error(parser.offset(), "unexpected trailing input"));
    }
    Ok(expr)
}
