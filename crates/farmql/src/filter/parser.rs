use super::{
    date,
    phrase::{CmpOp, Literal, ListOp, LogicOp, Operand, Phrase},
    token::{self, Token, TokenKind},
    CommandRunner,
};
use crate::{Error, Result};

use chrono::NaiveDateTime;
use farmql_core::{
    schema::{Field, TableId},
    Schema,
};
use indexmap::IndexMap;
use log::trace;

/// Everything a WHERE string is resolved against.
pub(crate) struct Context<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) primary: TableId,
    pub(crate) strict: bool,

    /// Aliases supplied by the caller. Checked before the table and global
    /// aliases.
    pub(crate) aliases: &'a IndexMap<String, String>,

    pub(crate) commands: &'a dyn CommandRunner,

    /// Local time dates without a year or day are completed from.
    pub(crate) now: NaiveDateTime,
}

/// Parses `text` into a phrase tree. Empty text has no phrase.
///
/// `stack` holds the aliases and commands being expanded; meeting one of
/// them again is an infinite loop.
pub(crate) fn parse(
    cx: &Context<'_>,
    text: &str,
    stack: &mut Vec<String>,
) -> Result<Option<Phrase>> {
    let tokens = token::tokenize(text)?;
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut parser = Parser {
        cx,
        text,
        tokens,
        pos: 0,
        stack,
    };

    let phrase = parser.or()?;

    if let Some(token) = parser.peek() {
        return Err(match token.kind {
            TokenKind::Paren if token.text == ")" => Error::syntax("parentheses mismatch"),
            TokenKind::Bracket if token.text == "]" => Error::syntax("']' is out of place"),
            TokenKind::Bracket => Error::syntax("lists can only exist as right operands."),
            TokenKind::ListDelim => Error::syntax("',' is out of place"),
            _ => {
                let before = &parser.tokens[parser.pos - 1].text;
                Error::syntax(format!(
                    "no operator found between '{before}' and '{}'.",
                    token.text
                ))
            }
        });
    }

    Ok(Some(phrase))
}

struct Parser<'a, 's> {
    cx: &'a Context<'a>,
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    stack: &'s mut Vec<String>,
}

impl Parser<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind, text: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_text(kind, text)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Phrase> {
        let mut left = self.and()?;

        while self.eat(TokenKind::Boolean, "or") {
            self.expect_operand("or")?;
            let right = self.and()?;
            left = Phrase::Logic {
                left: Box::new(left),
                op: LogicOp::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn and(&mut self) -> Result<Phrase> {
        let mut left = self.unary()?;

        while self.eat(TokenKind::Boolean, "and") {
            self.expect_operand("and")?;
            let right = self.unary()?;
            left = Phrase::Logic {
                left: Box::new(left),
                op: LogicOp::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Checks that something follows the binary operator `op`.
    fn expect_operand(&self, op: &str) -> Result<()> {
        match self.peek() {
            None => Err(Error::syntax(format!("no right operand for '{op}'"))),
            Some(token) if token.is_text(TokenKind::Paren, ")") => {
                Err(Error::syntax(format!("no right operand for '{op}'")))
            }
            Some(token) if token.is(TokenKind::Boolean) => Err(Error::syntax(format!(
                "'{}' operator is out of place",
                token.text.to_lowercase()
            ))),
            _ => Ok(()),
        }
    }

    fn unary(&mut self) -> Result<Phrase> {
        if !self.peek().is_some_and(|token| token.is(TokenKind::Negate)) {
            return self.term();
        }
        self.pos += 1;

        let dangling = match self.peek() {
            None => true,
            Some(token) => {
                token.is_text(TokenKind::Paren, ")")
                    || matches!(
                        token.kind,
                        TokenKind::Boolean | TokenKind::Comparison | TokenKind::ListComparison
                    )
            }
        };
        if dangling {
            return Err(Error::syntax("not operator must preceed an expression."));
        }

        let inner = self.unary()?;
        Ok(Phrase::Not(Box::new(inner)))
    }

    fn term(&mut self) -> Result<Phrase> {
        let Some(token) = self.next() else {
            return Err(Error::syntax("parentheses mismatch"));
        };

        match token.kind {
            TokenKind::Paren if token.text == "(" => {
                if self.peek().is_some_and(|t| t.is_text(TokenKind::Paren, ")")) {
                    return Err(Error::syntax("parentheses mismatch"));
                }
                let inner = self.or()?;
                if !self.eat(TokenKind::Paren, ")") {
                    return Err(Error::syntax("parentheses mismatch"));
                }
                Ok(Phrase::Group(Box::new(inner)))
            }
            TokenKind::Paren => Err(Error::syntax("parentheses mismatch")),
            TokenKind::Bracket if token.text == "[" => {
                Err(Error::syntax("lists can only exist as right operands."))
            }
            TokenKind::Bracket => Err(Error::syntax("']' is out of place")),
            TokenKind::ListDelim => Err(Error::syntax("',' is out of place")),
            TokenKind::Boolean | TokenKind::Comparison | TokenKind::ListComparison => {
                Err(Error::syntax(format!(
                    "no left operand found for '{}'",
                    token.text.to_lowercase()
                )))
            }
            _ => self.operand_phrase(token),
        }
    }

    /// A phrase starting with a value: a comparison, a list comparison or a
    /// stand-alone value.
    fn operand_phrase(&mut self, token: Token) -> Result<Phrase> {
        let next = self.peek().map(|next| next.kind);

        match next {
            Some(TokenKind::Comparison) => {
                let op = self.comparison_op()?;
                let left = self.left_operand(&token)?;
                self.comparison(&token, left, op)
            }
            Some(TokenKind::ListComparison) => {
                let op = self.list_op()?;
                let left = self.left_operand(&token)?;
                self.list_comparison(&token, left, op, false)
            }
            Some(TokenKind::Negate)
                if self
                    .peek_at(1)
                    .is_some_and(|t| t.is(TokenKind::ListComparison)) =>
            {
                self.pos += 1;
                let op = self.list_op()?;
                let left = self.left_operand(&token)?;
                self.list_comparison(&token, left, op, true)
            }
            _ => self.stand_alone(token),
        }
    }

    fn comparison_op(&mut self) -> Result<CmpOp> {
        let Some(token) = self.next() else {
            return Err(Error::syntax("unexpected end of where string"));
        };
        let op = CmpOp::parse(&token.text)
            .ok_or_else(|| Error::syntax(format!("unknown operator '{}'", token.text)))?;

        // `is not` reads as `!=`
        if op == CmpOp::Is && self.eat(TokenKind::Negate, "not") {
            return Ok(CmpOp::Ne);
        }

        Ok(op)
    }

    fn list_op(&mut self) -> Result<ListOp> {
        let Some(token) = self.next() else {
            return Err(Error::syntax("unexpected end of where string"));
        };
        ListOp::parse(&token.text)
            .ok_or_else(|| Error::syntax(format!("unknown operator '{}'", token.text)))
    }

    /// Resolves the left operand of a comparison. Aliases cannot be
    /// compared.
    fn left_operand(&mut self, token: &Token) -> Result<Operand> {
        if token.is(TokenKind::Unquoted)
            && self.field(&token.text).is_none()
            && self.alias_text(&token.text).is_some()
        {
            return Err(Error::syntax("aliases can only be used as stand-alone phrases."));
        }

        self.operand(token)
    }

    fn comparison(&mut self, left_token: &Token, left: Operand, op: CmpOp) -> Result<Phrase> {
        let right = match self.next() {
            None => {
                return Err(Error::syntax(format!(
                    "no right operand for '{}'",
                    op.as_str()
                )))
            }
            Some(token) if token.is_text(TokenKind::Bracket, "[") => {
                return Err(Error::syntax("lists can only exist as right operands."))
            }
            Some(token) if is_value(&token) => {
                let right = self.operand(&token)?;
                self.check_comparison(left_token, &token, &left, &right)?;
                right
            }
            Some(_) => {
                return Err(Error::syntax(format!(
                    "no right operand for '{}'",
                    op.as_str()
                )))
            }
        };

        Ok(Phrase::Comparison { left, op, right })
    }

    fn check_comparison(
        &self,
        left_token: &Token,
        right_token: &Token,
        left: &Operand,
        right: &Operand,
    ) -> Result<()> {
        let left_field = left.as_member().map(|id| self.cx.schema.field(id));
        let right_field = right.as_member().map(|id| self.cx.schema.field(id));

        match (left_field, right_field) {
            (None, None) if self.cx.strict => {
                return Err(Error::no_member_found(format!(
                    "both {} and {} don't map to valid member names in \"{}\"",
                    left_token.text, right_token.text, self.text
                )));
            }
            (Some(l), Some(r)) if l.is_virtual() || r.is_virtual() => {
                return Err(Error::incorrect_type(
                    "virtual fields cannot be compared with other members.",
                ));
            }
            _ => {}
        }

        Ok(())
    }

    fn list_comparison(&mut self, left_token: &Token, left: Operand, op: ListOp, negate: bool) -> Result<Phrase> {
        let right = match self.next() {
            None => {
                return Err(Error::syntax(format!(
                    "no right operand for '{}'",
                    op.as_str()
                )))
            }
            Some(token) if token.is_text(TokenKind::Bracket, "[") => self.list()?,
            Some(token) if token.is(TokenKind::Command) => {
                Operand::List(self.command_items(token.command())?)
            }
            Some(token) if is_value(&token) => self.operand(&token)?,
            Some(_) => {
                return Err(Error::syntax(format!(
                    "no right operand for '{}'",
                    op.as_str()
                )))
            }
        };

        if self.cx.strict && left.as_member().is_none() && right.as_member().is_none() {
            return Err(Error::no_member_found(format!(
                "neither {} nor the right operand of '{}' maps to a valid member name in \"{}\"",
                left_token.text,
                op.as_str(),
                self.text
            )));
        }

        let is_virtual = |operand: &Operand| {
            operand
                .as_member()
                .is_some_and(|id| self.cx.schema.field(id).is_virtual())
        };
        if is_virtual(&left) || is_virtual(&right) {
            return Err(Error::incorrect_type(format!(
                "virtual fields cannot be used with '{}'.",
                op.as_str()
            )));
        }

        let is_list_member = |operand: &Operand| {
            operand
                .as_member()
                .is_some_and(|id| self.cx.schema.field(id).is_list())
        };

        let right = match op {
            ListOp::In => {
                if !matches!(right, Operand::List(_)) && !is_list_member(&right) {
                    return Err(Error::incorrect_type("right operand of 'in' must be a list"));
                }
                right
            }
            ListOp::Has => {
                if !is_list_member(&left) {
                    return Err(Error::incorrect_type("left operand of 'has' must be a list"));
                }
                match right {
                    Operand::Literal(literal) => Operand::List(vec![literal]),
                    Operand::Member(_) => {
                        return Err(Error::incorrect_type("right operand of 'has' must be a list"))
                    }
                    list => list,
                }
            }
            ListOp::Like => right,
        };

        Ok(Phrase::ListComparison {
            left,
            op,
            right,
            negate,
        })
    }

    /// Reads list items up to the closing bracket. The opening bracket has
    /// been consumed.
    fn list(&mut self) -> Result<Operand> {
        let mut items = vec![];
        let mut expect_item = true;

        loop {
            let Some(token) = self.next() else {
                return Err(Error::syntax("list was not closed"));
            };

            match token.kind {
                TokenKind::Bracket if token.text == "]" => {
                    if !expect_item || items.is_empty() {
                        break;
                    }
                    return Err(Error::syntax("',' is out of place"));
                }
                TokenKind::Bracket => return Err(Error::syntax("lists cannot be nested.")),
                TokenKind::ListDelim => {
                    if expect_item {
                        return Err(Error::syntax("',' is out of place"));
                    }
                    expect_item = true;
                }
                TokenKind::Paren | TokenKind::Comparison if !is_keyword(&token) => {
                    return Err(Error::syntax("list was not closed"));
                }
                TokenKind::Command => {
                    items.extend(self.command_items(token.command())?);
                    expect_item = false;
                }
                _ => {
                    items.push(self.literal(&token)?);
                    expect_item = false;
                }
            }
        }

        Ok(Operand::List(items))
    }

    fn stand_alone(&mut self, token: Token) -> Result<Phrase> {
        match token.kind {
            TokenKind::Unquoted => self.stand_alone_word(&token.text),
            TokenKind::Command => {
                let command = token.command().to_string();
                let output = self.run(&token.text, &command)?;
                self.expand(token.text.clone(), &output)
            }
            _ => Ok(Phrase::StandAlone(Operand::Literal(self.literal(&token)?))),
        }
    }

    fn stand_alone_word(&mut self, word: &str) -> Result<Phrase> {
        if let Some(text) = self.alias_text(word) {
            return self.expand(word.to_string(), &text);
        }

        if let Some(field) = self.field(word) {
            return Ok(Phrase::StandAlone(Operand::Member(field.id)));
        }

        if self.cx.strict {
            return Err(Error::no_member_found(format!(
                "'{word}' does not map to a valid member or alias."
            )));
        }

        Ok(Phrase::StandAlone(Operand::Literal(Literal::Word(
            word.to_string(),
        ))))
    }

    fn alias_text(&self, word: &str) -> Option<String> {
        let table = self.cx.schema.table(self.cx.primary);
        self.cx
            .aliases
            .get(word)
            .or_else(|| table.where_aliases.get(word))
            .or_else(|| self.cx.schema.where_aliases.get(word))
            .cloned()
    }

    /// Parses the text an alias or command expands to.
    fn expand(&mut self, name: String, text: &str) -> Result<Phrase> {
        self.enter(&name)?;
        trace!("expanding {name} into {text:?}");

        let phrase = parse(self.cx, text, self.stack);
        self.stack.pop();

        Ok(Phrase::Alias {
            name,
            phrase: Box::new(phrase?.unwrap_or(Phrase::Masked)),
        })
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        if self.stack.iter().any(|entry| entry == name) {
            trace!("{name} is already being expanded: {:?}", self.stack);
            return Err(Error::infinite_loop(format!(
                "referencing '{name}' in where statement will cause an infinite loop."
            )));
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    fn run(&mut self, name: &str, command: &str) -> Result<String> {
        self.enter(name)?;
        trace!("running {command:?}");
        let output = self.cx.commands.run(command);
        self.stack.pop();
        output
    }

    /// Each data token of the command output as a list item.
    fn command_items(&mut self, command: &str) -> Result<Vec<Literal>> {
        let output = self.run(&format!("`{command}`"), command)?;
        token::data_tokens(&output)?
            .iter()
            .map(|token| self.literal(token))
            .collect()
    }

    fn field(&self, word: &str) -> Option<&Field> {
        self.cx.schema.field_by_member(word, Some(self.cx.primary))
    }

    /// Resolves a value inside a comparison: members, `null`, or literals.
    fn operand(&mut self, token: &Token) -> Result<Operand> {
        match token.kind {
            TokenKind::Unquoted => {
                if let Some(field) = self.field(&token.text) {
                    return Ok(Operand::Member(field.id));
                }
                if token.text.eq_ignore_ascii_case("null") || token.text == "None" {
                    return Ok(Operand::Literal(Literal::Null));
                }
                Ok(Operand::Literal(Literal::Word(token.text.clone())))
            }
            TokenKind::Command => {
                let command = token.command().to_string();
                let output = self.run(&token.text, &command)?;
                let data = token::data_tokens(&output)?;
                match data.as_slice() {
                    [single] => Ok(Operand::Literal(self.literal(single)?)),
                    _ => Ok(Operand::Literal(Literal::String(output))),
                }
            }
            _ => Ok(Operand::Literal(self.literal(token)?)),
        }
    }

    fn literal(&self, token: &Token) -> Result<Literal> {
        let text = token.text.clone();

        Ok(match token.kind {
            TokenKind::Number => Literal::Number(text),
            TokenKind::ByteNumber => {
                let (number, unit) = split_unit(&text);
                let factor = match unit.chars().next().map(|c| c.to_ascii_lowercase()) {
                    Some('p') => (1u64 << 50) as f64,
                    Some('t') => (1u64 << 40) as f64,
                    Some('g') => (1u64 << 30) as f64,
                    Some('m') => (1u64 << 20) as f64,
                    Some('k') => (1u64 << 10) as f64,
                    _ => 1.0,
                };
                let number: f64 = number.parse()?;
                Literal::Bytes {
                    bytes: number * factor,
                    text,
                }
            }
            TokenKind::TimeString => {
                let (number, unit) = split_unit(&text);
                let factor = match unit {
                    "m" => 60.0,
                    "h" => 3600.0,
                    "d" => 86400.0,
                    "w" => 604800.0,
                    _ => 1.0,
                };
                let number: f64 = number.parse()?;
                Literal::Time {
                    // halves round up, so -1.5s is -1
                    secs: (number * factor + 0.5).floor() as i64,
                    text,
                }
            }
            TokenKind::Date => match date::to_epoch(&text, self.cx.now) {
                Some(epoch) => Literal::Date { epoch, text },
                None => return Err(Error::tokenize(text)),
            },
            TokenKind::String => Literal::String(token.unquote()),
            _ => Literal::Word(text),
        })
    }
}

/// Tokens that can stand on either side of an operator.
fn is_value(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Date
            | TokenKind::ByteNumber
            | TokenKind::TimeString
            | TokenKind::Number
            | TokenKind::Command
            | TokenKind::String
            | TokenKind::Unquoted
    )
}

/// Keywords read as plain words inside a list, e.g. `[in, out]`.
fn is_keyword(token: &Token) -> bool {
    token.text.chars().all(|c| c.is_ascii_alphabetic())
}

/// Splits `1.5MB` into `1.5` and `MB`.
fn split_unit(text: &str) -> (&str, &str) {
    let at = text
        .find(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
        .unwrap_or(text.len());
    text.split_at(at)
}
