use super::phrase::{CmpOp, Literal, ListOp, LogicOp, Operand, Phrase};
use crate::{Error, Result};

use farmql_core::{
    schema::{epoch_to_local, Category, Field},
    stmt::Value,
    Schema,
};
use farmql_sql::Serializer;

/// Renders a phrase tree as the body of a SQL WHERE clause. Members are
/// always qualified by their table.
pub(crate) struct Render<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) serializer: Serializer<'a>,

    /// Seconds since the epoch that relative times count back from.
    pub(crate) now: i64,
}

impl Render<'_> {
    pub(crate) fn phrase(&self, phrase: &Phrase) -> Result<String> {
        Ok(match phrase {
            Phrase::Group(inner) | Phrase::Alias { phrase: inner, .. } => {
                format!("({})", self.phrase(inner)?)
            }
            Phrase::Not(inner) => match &**inner {
                Phrase::StandAlone(operand) => self.stand_alone(operand, true)?,
                Phrase::Group(_) | Phrase::Alias { .. } => format!("NOT {}", self.phrase(inner)?),
                inner => format!("NOT ({})", self.phrase(inner)?),
            },
            Phrase::StandAlone(operand) => self.stand_alone(operand, false)?,
            Phrase::Logic { left, op, right } => {
                let op = match op {
                    LogicOp::And => "AND",
                    LogicOp::Or => "OR",
                };
                format!("{} {op} {}", self.phrase(left)?, self.phrase(right)?)
            }
            Phrase::Comparison { left, op, right } => self.comparison(left, *op, right)?,
            Phrase::ListComparison {
                left,
                op: ListOp::In,
                right,
                negate,
            } => self.in_list(left, right, *negate)?,
            Phrase::ListComparison {
                left,
                op: ListOp::Like,
                right,
                negate,
            } => self.like(left, right, *negate)?,
            Phrase::ListComparison {
                left,
                op: ListOp::Has,
                right,
                negate,
            } => self.has(left, right, *negate)?,
            Phrase::Masked => "0=0".to_string(),
        })
    }

    fn field(&self, operand: &Operand) -> Option<&Field> {
        operand.as_member().map(|id| self.schema.field(id))
    }

    /// Truthiness of a value on its own.
    fn stand_alone(&self, operand: &Operand, negate: bool) -> Result<String> {
        let field = match operand {
            Operand::Member(id) => self.schema.field(*id),
            Operand::Literal(literal) => {
                let truthy = match literal {
                    Literal::Number(text) => text
                        .trim_end_matches('L')
                        .parse::<f64>()
                        .is_ok_and(|n| n != 0.0),
                    Literal::Bytes { bytes, .. } => *bytes != 0.0,
                    Literal::Time { .. } | Literal::Date { .. } => true,
                    Literal::String(text) | Literal::Word(text) => !text.is_empty(),
                    Literal::Null => false,
                };
                return Ok(constant(truthy != negate));
            }
            Operand::List(items) => return Ok(constant(!items.is_empty() != negate)),
        };

        if field.is_virtual() {
            let columns = self.dependent_columns(field)?;
            return self.virtual_field(field)?.where_standalone(field, &columns, negate);
        }

        let column = field.qualified_name();

        Ok(match (field.category(), negate) {
            (Category::Timestamp, false) => format!("{column} IS NOT NULL"),
            (Category::Timestamp, true) => format!("{column} IS NULL"),
            (Category::Int | Category::Float, false) => {
                format!("({column}<>0 AND {column} IS NOT NULL)")
            }
            (Category::Int | Category::Float, true) => format!("({column}=0 OR {column} IS NULL)"),
            (Category::String | Category::Discriminator, false) => {
                format!("({column}<>'' AND {column} IS NOT NULL)")
            }
            (Category::String | Category::Discriminator, true) => {
                format!("({column}='' OR {column} IS NULL)")
            }
            (Category::Boolean, false) => format!("{column}='t'"),
            (Category::Boolean, true) => format!("({column}='f' OR {column} IS NULL)"),
            (_, false) => format!("{column} IS NOT NULL"),
            (_, true) => format!("{column} IS NULL"),
        })
    }

    fn comparison(&self, left: &Operand, op: CmpOp, right: &Operand) -> Result<String> {
        let left_field = self.field(left);
        let right_field = self.field(right);

        if right.is_null() || left.is_null() {
            let value = if right.is_null() { left } else { right };
            let value = self.operand(value, None)?;
            return Ok(match op {
                CmpOp::Eq | CmpOp::Is => format!("{value} IS NULL"),
                CmpOp::Ne => format!("{value} IS NOT NULL"),
                op => format!("{value} {} NULL", op.as_str()),
            });
        }

        let op_sql = match op {
            CmpOp::Is => "=",
            op => op.as_str(),
        };

        if let Some(field) = left_field.filter(|field| field.is_virtual()) {
            let operand = self.operand(right, None)?;
            let columns = self.dependent_columns(field)?;
            return self
                .virtual_field(field)?
                .where_comparison(field, &columns, op_sql, &operand, true);
        }

        if let Some(field) = right_field.filter(|field| field.is_virtual()) {
            let operand = self.operand(left, None)?;
            let columns = self.dependent_columns(field)?;
            return self
                .virtual_field(field)?
                .where_comparison(field, &columns, op_sql, &operand, false);
        }

        let lhs = self.operand(left, right_field)?;
        let rhs = self.operand(right, left_field)?;

        Ok(match op {
            CmpOp::Eq | CmpOp::Ne | CmpOp::Is => format!("{lhs}{op_sql}{rhs}"),
            _ => format!("{lhs} {op_sql} {rhs}"),
        })
    }

    fn in_list(&self, left: &Operand, right: &Operand, negate: bool) -> Result<String> {
        match right {
            Operand::List(items) => {
                let lhs = self.operand(left, None)?;
                let field = self.field(left);
                let (op, join) = if negate { ("!=", " AND ") } else { ("=", " OR ") };

                let terms = items
                    .iter()
                    .map(|item| Ok(format!("{lhs}{op}{}", self.literal(item, field)?)))
                    .collect::<Result<Vec<_>>>()?;

                Ok(chain(terms, join, negate))
            }
            Operand::Member(id) => {
                let field = self.schema.field(*id);
                let Operand::Literal(item) = left else {
                    return Err(Error::incorrect_type(format!(
                        "only literals can be searched for in '{}'",
                        field.member
                    )));
                };

                let test = self
                    .serializer
                    .contains(&field.qualified_name(), field, &item.text());
                Ok(if negate { format!("NOT ({test})") } else { test })
            }
            Operand::Literal(_) => Err(Error::incorrect_type("right operand of 'in' must be a list")),
        }
    }

    fn like(&self, left: &Operand, right: &Operand, negate: bool) -> Result<String> {
        let mut lhs = self.operand(left, None)?;
        if self.field(left).is_some_and(|field| {
            field.kind.is_array() || matches!(field.category(), Category::Dict | Category::Json)
        }) {
            lhs = self.serializer.text_cast(&lhs);
        }

        let op = self.serializer.regex_op(negate);
        let join = if negate { " AND " } else { " OR " };

        let terms = match right {
            Operand::List(items) => items
                .iter()
                .map(|item| format!("{lhs} {op} {}", self.serializer.quote(&item.text())))
                .collect(),
            operand => vec![format!("{lhs} {op} {}", self.operand(operand, None)?)],
        };

        Ok(chain(terms, join, negate))
    }

    fn has(&self, left: &Operand, right: &Operand, negate: bool) -> Result<String> {
        let Some(field) = self.field(left) else {
            return Err(Error::incorrect_type("left operand of 'has' must be a list"));
        };
        let Operand::List(items) = right else {
            return Err(Error::incorrect_type("right operand of 'has' must be a list"));
        };

        let column = field.qualified_name();
        let tests = items
            .iter()
            .map(|item| self.serializer.contains(&column, field, &item.text()));

        let terms = if negate {
            tests.map(|test| format!("NOT ({test})")).collect()
        } else {
            tests.collect()
        };

        // an empty `has` holds for every list
        Ok(chain(terms, if negate { " OR " } else { " AND " }, !negate))
    }

    fn operand(&self, operand: &Operand, against: Option<&Field>) -> Result<String> {
        match operand {
            Operand::Member(id) => Ok(self.schema.field(*id).qualified_name()),
            Operand::Literal(literal) => self.literal(literal, against),
            Operand::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.literal(item, against))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", items.join(", ")))
            }
        }
    }

    /// Renders a literal for comparison with `against`. Quantities are
    /// converted into the unit of the field.
    fn literal(&self, literal: &Literal, against: Option<&Field>) -> Result<String> {
        let category = against.map(Field::category);

        if let (Some(field), Some(Category::Boolean)) = (against, category) {
            let packed = field.pack(&Value::String(literal.text()))?;
            return Ok(self.serializer.literal(&packed));
        }

        let textual = category.is_some_and(is_textual);

        Ok(match literal {
            Literal::Number(text) => {
                let number = text.trim_end_matches('L');
                if textual {
                    self.serializer.quote(number)
                } else {
                    number.to_string()
                }
            }
            Literal::Bytes { bytes, .. } => {
                let scaled = bytes * against.map_or(1.0, |field| field.kind.byte_scale());
                if category == Some(Category::Float) {
                    scaled.to_string()
                } else {
                    (scaled.round() as i64).to_string()
                }
            }
            Literal::Time { secs, .. } if *secs < 0 => self.time(self.now + secs, category),
            Literal::Time { secs, .. } => secs.to_string(),
            Literal::Date { epoch, .. } => self.time(*epoch, category),
            Literal::String(text) | Literal::Word(text) => self.serializer.quote(text),
            Literal::Null => "NULL".to_string(),
        })
    }

    /// A point in time: epoch seconds for integer fields, a quoted local
    /// timestamp otherwise.
    fn time(&self, epoch: i64, category: Option<Category>) -> String {
        if matches!(category, Some(Category::Int | Category::Float)) {
            return epoch.to_string();
        }

        match epoch_to_local(epoch) {
            Some(local) => self
                .serializer
                .quote(&local.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => epoch.to_string(),
        }
    }

    fn virtual_field<'f>(
        &self,
        field: &'f Field,
    ) -> Result<&'f dyn farmql_core::schema::VirtualField> {
        field
            .virtual_field
            .as_deref()
            .ok_or_else(|| Error::invalid_schema(format!("'{}' has no behavior", field.member)))
    }

    /// Qualified columns of the members a virtual field is computed from.
    pub(crate) fn dependent_columns(&self, field: &Field) -> Result<Vec<String>> {
        let table = self.schema.table(field.table());
        field
            .dependents
            .iter()
            .map(|member| {
                table
                    .field_by_member(member)
                    .map(Field::qualified_name)
                    .ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "'{}' depends on unknown member '{member}'",
                            field.member
                        ))
                    })
            })
            .collect()
    }
}

/// Fields whose literals are compared as text.
fn is_textual(category: Category) -> bool {
    matches!(
        category,
        Category::String
            | Category::Discriminator
            | Category::StringList
            | Category::StringArray
            | Category::Dict
            | Category::Json
    )
}

fn constant(truthy: bool) -> String {
    if truthy { "1=1" } else { "0=1" }.to_string()
}

/// Joins `terms`, parenthesizing more than one. `empty_holds` is the truth
/// value of a chain without terms.
fn chain(terms: Vec<String>, join: &str, empty_holds: bool) -> String {
    match terms.len() {
        0 if empty_holds => "0=0".to_string(),
        0 => "0!=0".to_string(),
        1 => terms.into_iter().collect(),
        _ => format!("({})", terms.join(join)),
    }
}
