use farmql_core::{schema::FieldId, Schema};

use std::fmt::Write;

/// A literal written in a WHERE string.
///
/// Quantities keep the text they were written as so that the canonical
/// rendering reads like the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A number exactly as written, e.g. `300`, `-4.5e3` or `10L`.
    Number(String),

    /// A byte quantity such as `1.5M`, converted to bytes.
    Bytes { bytes: f64, text: String },

    /// A duration such as `-1h`, converted to seconds. Negative durations
    /// point back from the time of the query.
    Time { secs: i64, text: String },

    /// A date/time such as `3/15|4pm`, as seconds since the epoch.
    Date { epoch: i64, text: String },

    /// A quoted string with escapes resolved.
    String(String),

    /// An unquoted word that names no member.
    Word(String),

    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Member(FieldId),
    Literal(Literal),
    List(Vec<Literal>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Is,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    In,
    Like,
    Has,
}

/// A node of the parsed WHERE string.
#[derive(Debug, Clone, PartialEq)]
pub enum Phrase {
    /// A parenthesized phrase.
    Group(Box<Phrase>),

    /// A named WHERE fragment or a stand-alone command, with the phrase it
    /// expanded to.
    Alias { name: String, phrase: Box<Phrase> },

    Not(Box<Phrase>),

    /// A value tested for truthiness, e.g. `where error`.
    StandAlone(Operand),

    Logic {
        left: Box<Phrase>,
        op: LogicOp,
        right: Box<Phrase>,
    },

    Comparison {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },

    ListComparison {
        left: Operand,
        op: ListOp,
        right: Operand,
        negate: bool,
    },

    /// A phrase removed by [`Where::mask`](super::Where::mask). Always
    /// true.
    Masked,
}

impl CmpOp {
    pub(crate) fn parse(text: &str) -> Option<CmpOp> {
        Some(match text.to_lowercase().as_str() {
            "=" | "==" => CmpOp::Eq,
            "!=" => CmpOp::Ne,
            ">" => CmpOp::Gt,
            "<" => CmpOp::Lt,
            ">=" => CmpOp::Ge,
            "<=" => CmpOp::Le,
            "is" => CmpOp::Is,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
            CmpOp::Is => "is",
        }
    }

    /// The operator to use when the operands are swapped.
    pub fn reverse(self) -> CmpOp {
        match self {
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Le => CmpOp::Ge,
            op => op,
        }
    }
}

impl ListOp {
    pub(crate) fn parse(text: &str) -> Option<ListOp> {
        Some(match text.to_lowercase().as_str() {
            "in" => ListOp::In,
            "like" => ListOp::Like,
            "has" => ListOp::Has,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListOp::In => "in",
            ListOp::Like => "like",
            ListOp::Has => "has",
        }
    }
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// The literal as plain text, as matched against list items and
    /// patterns.
    pub fn text(&self) -> String {
        match self {
            Literal::Number(text) => text.trim_end_matches('L').to_string(),
            Literal::Bytes { text, .. }
            | Literal::Time { text, .. }
            | Literal::Date { text, .. }
            | Literal::String(text)
            | Literal::Word(text) => text.clone(),
            Literal::Null => String::new(),
        }
    }

    fn write_natural(&self, dst: &mut String) {
        match self {
            Literal::Number(text)
            | Literal::Bytes { text, .. }
            | Literal::Time { text, .. }
            | Literal::Date { text, .. } => dst.push_str(text),
            Literal::String(text) | Literal::Word(text) => write_quoted(text, dst),
            Literal::Null => dst.push_str("null"),
        }
    }
}

impl Operand {
    pub fn as_member(&self) -> Option<FieldId> {
        match self {
            Operand::Member(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Literal(Literal::Null))
    }

    fn write_natural(&self, schema: &Schema, dst: &mut String) {
        match self {
            Operand::Member(id) => dst.push_str(&schema.field(*id).qualified_member()),
            Operand::Literal(literal) => literal.write_natural(dst),
            Operand::List(items) => {
                dst.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        dst.push_str(", ");
                    }
                    item.write_natural(dst);
                }
                dst.push(']');
            }
        }
    }
}

impl Phrase {
    /// Renders the phrase as WHERE text that parses back into the same
    /// phrase. Members are qualified by their type.
    pub fn to_natural(&self, schema: &Schema) -> String {
        let mut dst = String::new();
        self.write_natural(schema, &mut dst);
        dst
    }

    fn write_natural(&self, schema: &Schema, dst: &mut String) {
        match self {
            Phrase::Group(inner) => {
                dst.push('(');
                inner.write_natural(schema, dst);
                dst.push(')');
            }
            Phrase::Alias { name, .. } => dst.push_str(name),
            Phrase::Not(inner) => {
                dst.push_str("not ");
                inner.write_natural(schema, dst);
            }
            Phrase::StandAlone(operand) => operand.write_natural(schema, dst),
            Phrase::Logic { left, op, right } => {
                left.write_natural(schema, dst);
                dst.push_str(match op {
                    LogicOp::And => " and ",
                    LogicOp::Or => " or ",
                });
                right.write_natural(schema, dst);
            }
            Phrase::Comparison { left, op, right } => {
                left.write_natural(schema, dst);
                match op {
                    CmpOp::Eq | CmpOp::Ne => dst.push_str(op.as_str()),
                    op => {
                        let _ = write!(dst, " {} ", op.as_str());
                    }
                }
                right.write_natural(schema, dst);
            }
            Phrase::ListComparison {
                left,
                op,
                right,
                negate,
            } => {
                left.write_natural(schema, dst);
                dst.push_str(if *negate { " not " } else { " " });
                dst.push_str(op.as_str());
                dst.push(' ');
                right.write_natural(schema, dst);
            }
            Phrase::Masked => dst.push_str("0=0"),
        }
    }

    /// Every member the phrase references, in order of appearance.
    pub fn fields(&self) -> Vec<FieldId> {
        let mut fields = vec![];
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut Vec<FieldId>) {
        fn push(fields: &mut Vec<FieldId>, operand: &Operand) {
            if let Some(id) = operand.as_member() {
                if !fields.contains(&id) {
                    fields.push(id);
                }
            }
        }

        match self {
            Phrase::Group(inner) | Phrase::Not(inner) => inner.collect_fields(fields),
            Phrase::Alias { phrase, .. } => phrase.collect_fields(fields),
            Phrase::StandAlone(operand) => push(fields, operand),
            Phrase::Logic { left, right, .. } => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Phrase::Comparison { left, right, .. } | Phrase::ListComparison { left, right, .. } => {
                push(fields, left);
                push(fields, right);
            }
            Phrase::Masked => {}
        }
    }

    /// Replaces every comparison or stand-alone phrase for which `hide`
    /// returns true with [`Phrase::Masked`]. `hide` receives the members the
    /// phrase references.
    pub fn mask(&self, hide: &dyn Fn(&[FieldId]) -> bool) -> Phrase {
        match self {
            Phrase::Group(inner) => Phrase::Group(Box::new(inner.mask(hide))),
            Phrase::Alias { name, phrase } => {
                let masked = phrase.mask(hide);
                if masked == **phrase {
                    self.clone()
                } else {
                    // the alias name would expand to the unmasked text again
                    Phrase::Group(Box::new(masked))
                }
            }
            Phrase::Not(inner) => Phrase::Not(Box::new(inner.mask(hide))),
            Phrase::Logic { left, op, right } => Phrase::Logic {
                left: Box::new(left.mask(hide)),
                op: *op,
                right: Box::new(right.mask(hide)),
            },
            Phrase::StandAlone(_) | Phrase::Comparison { .. } | Phrase::ListComparison { .. } => {
                if hide(&self.fields()) {
                    Phrase::Masked
                } else {
                    self.clone()
                }
            }
            Phrase::Masked => Phrase::Masked,
        }
    }

    /// True if `needle` appears somewhere in the phrase. Comparisons also
    /// match with their operands swapped, so `5<a` finds `a>5`.
    pub fn contains(&self, needle: &Phrase) -> bool {
        if self.matches(needle) {
            return true;
        }

        match self {
            Phrase::Group(inner) | Phrase::Not(inner) => inner.contains(needle),
            Phrase::Alias { phrase, .. } => phrase.contains(needle),
            Phrase::Logic { left, right, .. } => left.contains(needle) || right.contains(needle),
            _ => false,
        }
    }

    fn matches(&self, needle: &Phrase) -> bool {
        if self == needle {
            return true;
        }

        match (self, needle) {
            (
                Phrase::Comparison { left, op, right },
                Phrase::Comparison {
                    left: other_left,
                    op: other_op,
                    right: other_right,
                },
            ) => left == other_right && right == other_left && op.reverse() == *other_op,
            // `(a)` is found as `a`
            (_, Phrase::Group(inner)) => self.matches(inner),
            _ => false,
        }
    }
}

fn write_quoted(text: &str, dst: &mut String) {
    dst.push('\'');
    for c in text.chars() {
        if c == '\'' || c == '\\' {
            dst.push('\\');
        }
        dst.push(c);
    }
    dst.push('\'');
}
