use super::Serializer;

use farmql_core::{
    driver::Flavor,
    schema::{Category, Field, Packed},
    Schema,
};

impl<'a> Serializer<'a> {
    pub fn new(schema: &'a Schema, flavor: Flavor) -> Serializer<'a> {
        Serializer { schema, flavor }
    }

    pub fn sqlite(schema: &'a Schema) -> Serializer<'a> {
        Serializer::new(schema, Flavor::Sqlite)
    }

    pub fn postgresql(schema: &'a Schema) -> Serializer<'a> {
        Serializer::new(schema, Flavor::Postgresql)
    }

    pub fn mysql(schema: &'a Schema) -> Serializer<'a> {
        Serializer::new(schema, Flavor::Mysql)
    }

    /// The regular expression match operator.
    pub fn regex_op(&self, negate: bool) -> &'static str {
        match (self.flavor, negate) {
            (Flavor::Postgresql, false) => "~",
            (Flavor::Postgresql, true) => "!~",
            (_, false) => "REGEXP",
            (_, true) => "NOT REGEXP",
        }
    }

    /// Renders a packed value as a literal.
    pub fn literal(&self, value: &Packed) -> String {
        match value {
            Packed::Null => "NULL".to_string(),
            Packed::Default => match self.flavor {
                Flavor::Postgresql => "DEFAULT".to_string(),
                Flavor::Sqlite | Flavor::Mysql => "NULL".to_string(),
            },
            Packed::Integer(v) => v.to_string(),
            Packed::Real(v) if v.is_finite() => v.to_string(),
            Packed::Real(_) => "NULL".to_string(),
            Packed::Text(v) => self.quote(v),
        }
    }

    /// Quotes a string literal.
    pub fn quote(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('\'');
        for c in text.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' if self.flavor == Flavor::Mysql => out.push_str("\\\\"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    /// Casts a column to text, used when matching patterns against array
    /// and JSON columns.
    pub fn text_cast(&self, column: &str) -> String {
        match self.flavor {
            Flavor::Mysql => format!("CAST({column} AS CHAR)"),
            Flavor::Postgresql | Flavor::Sqlite => format!("CAST({column} AS TEXT)"),
        }
    }

    /// Tests whether the list or array stored in `column` holds `item`.
    pub fn contains(&self, column: &str, field: &Field, item: &str) -> String {
        match (field.kind.separator(), self.flavor) {
            (None, Flavor::Postgresql) => format!("{} = ANY({column})", self.quote(item)),
            (None, _) => {
                let needle = match field.category() {
                    Category::StringArray => {
                        let mut escaped = String::new();
                        for c in item.chars() {
                            if c == '"' || c == '\\' {
                                escaped.push('\\');
                            }
                            escaped.push(c);
                        }
                        format!(",\"{escaped}\",")
                    }
                    _ => format!(",{item},"),
                };
                let items = match self.flavor {
                    Flavor::Mysql => format!("TRIM(BOTH '}}' FROM TRIM(BOTH '{{' FROM {column}))"),
                    _ => format!("trim({column}, '{{}}')"),
                };
                self.position(&self.concat(&["','", &items, "','"]), &self.quote(&needle))
            }
            (Some(separator), _) => {
                let sep = self.quote(&separator.to_string());
                let haystack = self.concat(&[&sep, column, &sep]);
                self.position(&haystack, &self.quote(&format!("{separator}{item}{separator}")))
            }
        }
    }

    fn concat(&self, parts: &[&str]) -> String {
        match self.flavor {
            Flavor::Mysql => format!("CONCAT({})", parts.join(", ")),
            Flavor::Postgresql | Flavor::Sqlite => parts.join("||"),
        }
    }

    fn position(&self, haystack: &str, needle: &str) -> String {
        match self.flavor {
            Flavor::Sqlite => format!("instr({haystack}, {needle}) > 0"),
            Flavor::Postgresql => format!("strpos({haystack}, {needle}) > 0"),
            Flavor::Mysql => format!("LOCATE({needle}, {haystack}) > 0"),
        }
    }
}
