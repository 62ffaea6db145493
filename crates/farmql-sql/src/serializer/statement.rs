use super::{Comma, Formatter, Ident, ToSql};

use crate::stmt::{self, Direction, SelectColumn};
use farmql_core::driver::Flavor;

struct Column<'a> {
    select: &'a stmt::Select,
    column: &'a SelectColumn,
}

impl ToSql for Column<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let serializer = f.serializer;

        match self.column {
            SelectColumn::Field(id) => {
                let field = serializer.field(*id);
                let qualified = field.qualified_name();
                let select_name = field.select_name.as_str();

                if id.table != self.select.primary {
                    // Columns of joined tables come back keyed by their type.
                    let alias = Ident(format!("{}.{}", field.type_name, select_name));
                    fmt!(f, qualified " AS " alias);
                } else if self.select.is_joined() {
                    fmt!(f, qualified " AS " select_name);
                } else if field.packed {
                    fmt!(f, field.name.as_str() " AS " select_name);
                } else {
                    fmt!(f, field.name.as_str());
                }
            }
            SelectColumn::Expr { sql, alias } => fmt!(f, sql " AS " alias),
        }
    }
}

impl ToSql for &stmt::Join {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let table = f.serializer.table(self.table).name.as_str();
        let kind = if self.left_join { " LEFT JOIN " } else { " JOIN " };
        fmt!(f, kind table " ON (" self.on.as_str() ")");
    }
}

impl ToSql for &stmt::OrderBy {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self.direction {
            Direction::Asc => fmt!(f, self.expr.as_str()),
            Direction::Desc => fmt!(f, self.expr.as_str() " DESC"),
        }
    }
}

impl ToSql for &stmt::Select {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let table = f.serializer.table(self.primary).name.as_str();

        if self.count {
            fmt!(f, "SELECT COUNT(*) AS rowcount");
        } else {
            let columns = Comma(self.columns.iter().map(|column| Column {
                select: self,
                column,
            }));
            fmt!(f, "SELECT " columns);
        }

        fmt!(f, " FROM " table);

        for join in &self.joins {
            join.to_sql(f);
        }

        let mut conditions: Vec<String> =
            self.filter.iter().map(|filter| format!("({filter})")).collect();
        conditions.extend(self.where_args.iter().cloned());

        if !conditions.is_empty() {
            fmt!(f, " WHERE " conditions.join(" AND "));
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY " Comma(&self.group_by));
        }

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.order_by));
        }

        match (self.limit, self.offset) {
            (Some(limit), None) => fmt!(f, " LIMIT " limit),
            (Some(limit), Some(offset)) => fmt!(f, " LIMIT " limit " OFFSET " offset),
            (None, Some(offset)) => match f.serializer.flavor {
                Flavor::Postgresql => fmt!(f, " OFFSET " offset),
                Flavor::Sqlite => fmt!(f, " LIMIT -1 OFFSET " offset),
                Flavor::Mysql => fmt!(f, " LIMIT 18446744073709551615 OFFSET " offset),
            },
            (None, None) => {}
        }
    }
}

struct Row<'a>(&'a [farmql_core::schema::Packed]);

impl ToSql for Row<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, "(" Comma(self.0) ")");
    }
}

impl ToSql for &stmt::Insert {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let table = f.serializer.table(self.table).name.as_str();
        let columns = Comma(&self.columns);
        let rows = Comma(self.rows.iter().map(|row| Row(row)));

        fmt!(f, "INSERT INTO " table " (" columns ") VALUES " rows);
    }
}

struct Assignment<'a>(&'a (String, farmql_core::schema::Packed));

impl ToSql for Assignment<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let (column, value) = self.0;
        fmt!(f, column "=" value);
    }
}

impl ToSql for &stmt::Update {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let table = f.serializer.table(self.table).name.as_str();
        let assignments = Comma(self.assignments.iter().map(Assignment));

        fmt!(f, "UPDATE " table " SET " assignments);

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }
    }
}

impl ToSql for &stmt::Delete {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let table = f.serializer.table(self.table).name.as_str();

        fmt!(f, "DELETE FROM " table);

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }
    }
}
