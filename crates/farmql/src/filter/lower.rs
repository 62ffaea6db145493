use super::phrase::{CmpOp, Literal, ListOp, LogicOp, Operand, Phrase};
use crate::Result;

use farmql_core::{
    schema::{Category, Field},
    stmt::{BinaryOp, Expr, ExprLike, Value},
    Schema,
};

/// Lowers a phrase tree to a predicate AST.
pub(crate) fn lower(schema: &Schema, phrase: &Phrase) -> Result<Expr> {
    Ok(match phrase {
        Phrase::Group(inner) | Phrase::Alias { phrase: inner, .. } => lower(schema, inner)?,
        Phrase::Not(inner) => Expr::not(lower(schema, inner)?),
        Phrase::StandAlone(operand) => operand_expr(schema, operand, None)?,
        Phrase::Logic { left, op, right } => {
            let left = lower(schema, left)?;
            let right = lower(schema, right)?;
            match op {
                LogicOp::And => Expr::and(left, right),
                LogicOp::Or => Expr::or(left, right),
            }
        }
        Phrase::Comparison { left, op, right } => {
            let lhs = operand_expr(schema, left, field(schema, right))?;
            let rhs = operand_expr(schema, right, field(schema, left))?;
            let op = match op {
                CmpOp::Eq | CmpOp::Is => BinaryOp::Eq,
                CmpOp::Ne => BinaryOp::Ne,
                CmpOp::Gt => BinaryOp::Gt,
                CmpOp::Lt => BinaryOp::Lt,
                CmpOp::Ge => BinaryOp::Ge,
                CmpOp::Le => BinaryOp::Le,
            };
            Expr::binary_op(lhs, op, rhs)
        }
        Phrase::ListComparison {
            left,
            op,
            right,
            negate,
        } => {
            let lhs = operand_expr(schema, left, field(schema, right))?;
            let rhs = operand_expr(schema, right, field(schema, left))?;
            match (op, negate) {
                (ListOp::In, false) => Expr::in_list(lhs, rhs),
                (ListOp::In, true) => Expr::not_in_list(lhs, rhs),
                (ListOp::Like, negate) => ExprLike::new(lhs, rhs, *negate).into(),
                (ListOp::Has, false) => Expr::has(lhs, rhs),
                (ListOp::Has, true) => Expr::not(Expr::has(lhs, rhs)),
            }
        }
        Phrase::Masked => Expr::from(true),
    })
}

fn field<'a>(schema: &'a Schema, operand: &Operand) -> Option<&'a Field> {
    operand.as_member().map(|id| schema.field(id))
}

fn operand_expr(schema: &Schema, operand: &Operand, against: Option<&Field>) -> Result<Expr> {
    Ok(match operand {
        Operand::Member(id) => {
            let field = schema.field(*id);
            if field.is_virtual() {
                Expr::virtual_member(&field.type_name, &field.member)
            } else {
                Expr::member(&field.type_name, &field.member)
            }
        }
        Operand::Literal(literal) => literal_expr(literal, against)?,
        Operand::List(items) => Expr::list(
            items
                .iter()
                .map(|item| literal_expr(item, against))
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

fn literal_expr(literal: &Literal, against: Option<&Field>) -> Result<Expr> {
    let category = against.map(Field::category);

    if let (Some(field), Some(Category::Boolean)) = (against, category) {
        if !literal.is_null() {
            return Ok(Expr::Value(field.unpack(&Value::String(literal.text()))?));
        }
    }

    Ok(match literal {
        Literal::Number(text) => {
            let number = text.trim_end_matches('L');
            let textual = matches!(
                category,
                Some(Category::String | Category::Discriminator | Category::StringList | Category::StringArray)
            );

            if textual {
                Expr::value(number)
            } else if let Ok(n) = number.parse::<i64>() {
                Expr::value(n)
            } else {
                Expr::value(number.parse::<f64>()?)
            }
        }
        Literal::Bytes { bytes, .. } => {
            let scaled = bytes * against.map_or(1.0, |field| field.kind.byte_scale());
            if category == Some(Category::Float) {
                Expr::value(scaled)
            } else {
                Expr::value(scaled.round() as i64)
            }
        }
        Literal::Time { secs, .. } if *secs < 0 => Expr::relative_time(*secs),
        Literal::Time { secs, .. } => Expr::value(*secs),
        Literal::Date { epoch, .. } => Expr::time_int(*epoch),
        Literal::String(text) | Literal::Word(text) => Expr::value(text.as_str()),
        Literal::Null => Expr::null(),
    })
}
