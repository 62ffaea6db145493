use super::{Formatter, ToSql};

use farmql_core::schema::Packed;

impl ToSql for &Packed {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let literal = f.serializer.literal(self);
        f.dst.push_str(&literal);
    }
}
