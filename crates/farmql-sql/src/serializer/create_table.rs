use super::{Comma, Formatter, Serializer, ToSql};

use crate::stmt;
use farmql_core::{
    driver::Flavor,
    schema::{Field, FieldKind, Table},
};

impl Serializer<'_> {
    /// The column type of a stored field, `None` for virtual fields.
    pub fn column_type(&self, field: &Field) -> Option<String> {
        use FieldKind::*;

        let pg = self.flavor == Flavor::Postgresql;

        let ty = match &field.kind {
            AutoInc | Serial => match self.flavor {
                Flavor::Postgresql => "SERIAL",
                Flavor::Sqlite => "INTEGER",
                Flavor::Mysql => "INT AUTO_INCREMENT",
            }
            .to_string(),
            TinyInt { .. } | SmallInt { .. } => "SMALLINT".to_string(),
            Int | TimeInt | ByteInt | KiloByte | MegaByte | GigaByte | SecsInt => {
                "INTEGER".to_string()
            }
            BigInt => "BIGINT".to_string(),
            Float | MegaByteFloat | GigaByteFloat | SecsFloat => match self.flavor {
                Flavor::Postgresql => "DOUBLE PRECISION",
                Flavor::Sqlite => "REAL",
                Flavor::Mysql => "DOUBLE",
            }
            .to_string(),
            Boolean => match self.flavor {
                Flavor::Postgresql => "BOOLEAN",
                Flavor::Sqlite => "TEXT",
                Flavor::Mysql => "CHAR(1)",
            }
            .to_string(),
            Timestamp => match self.flavor {
                Flavor::Postgresql => "TIMESTAMP",
                Flavor::Sqlite => "TEXT",
                Flavor::Mysql => "DATETIME",
            }
            .to_string(),
            VarChar(len) => format!("VARCHAR({len})"),
            Char(len) => format!("CHAR({len})"),
            Text | StrList { .. } | IntList { .. } => "TEXT".to_string(),
            Blob if pg => "BYTEA".to_string(),
            Blob => "BLOB".to_string(),
            Inet if pg => "INET".to_string(),
            Inet => "VARCHAR(64)".to_string(),
            Uuid if pg => "UUID".to_string(),
            Uuid => "CHAR(36)".to_string(),
            StrArray if pg => "TEXT[]".to_string(),
            IntArray if pg => "INTEGER[]".to_string(),
            StrArray | IntArray => "TEXT".to_string(),
            Dict | Json if pg => "JSONB".to_string(),
            Dict | Json => "TEXT".to_string(),
            ObjType => "VARCHAR(32)".to_string(),
            Virtual => return None,
        };

        Some(ty)
    }

    /// The auto-increment key declared inline, when it is the only key.
    fn inline_key<'t>(&self, table: &'t Table) -> Option<&'t Field> {
        match table.keys.as_slice() {
            [index] if table.fields[*index].kind.is_auto_increment() => {
                Some(&table.fields[*index])
            }
            _ => None,
        }
    }
}

struct ColumnDef<'a> {
    field: &'a Field,
    ty: String,
    inline_key: bool,
}

impl ToSql for ColumnDef<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let name = self.field.name.as_str();
        let ty = self.ty;

        fmt!(f, "\n    " name " " ty);

        if self.inline_key {
            match f.serializer.flavor {
                Flavor::Sqlite => fmt!(f, " PRIMARY KEY AUTOINCREMENT"),
                Flavor::Postgresql | Flavor::Mysql => fmt!(f, " PRIMARY KEY"),
            }
        }
    }
}

impl ToSql for &stmt::CreateTable {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let serializer = f.serializer;
        let table = serializer.table(self.table);
        let inline_key = serializer.inline_key(table);

        let columns: Vec<_> = table
            .columns()
            .filter_map(|field| {
                Some(ColumnDef {
                    field,
                    ty: serializer.column_type(field)?,
                    inline_key: inline_key.is_some_and(|key| key.id == field.id),
                })
            })
            .collect();

        let name = table.name.as_str();
        fmt!(f, "CREATE TABLE " name " (");

        for (i, column) in columns.into_iter().enumerate() {
            if i > 0 {
                fmt!(f, ",");
            }
            column.to_sql(f);
        }

        if inline_key.is_none() && !table.keys.is_empty() {
            let keys = Comma(table.keys().map(|field| field.name.as_str()));
            fmt!(f, ",\n    PRIMARY KEY (" keys ")");
        }

        fmt!(f, "\n)");
    }
}

impl ToSql for &stmt::CreateIndex {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let field = f.serializer.field(self.field);
        let table = field.table_name.as_str();
        let column = field.name.as_str();
        let index_name = format!("{table}_{column}_idx");

        fmt!(f, "CREATE INDEX " index_name " ON " table " (" column);

        // Only MySQL needs a prefix length to index text columns.
        if let (Some(len), Flavor::Mysql) = (field.index_len, f.serializer.flavor) {
            fmt!(f, "(" len.to_string() ")");
        }

        fmt!(f, ")");
    }
}
