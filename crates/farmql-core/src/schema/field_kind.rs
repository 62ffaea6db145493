use crate::stmt::Value;

/// Storage and behavior class of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer key assigned by the store when left unset.
    AutoInc,
    Serial,
    TinyInt { unsigned: bool },
    SmallInt { unsigned: bool },
    Int,
    BigInt,
    Float,
    Boolean,

    /// Seconds since the epoch, stored as an integer.
    TimeInt,
    Timestamp,

    /// Byte counts in the named unit. WHERE literals such as `3G` are
    /// rescaled to the unit of the field they are compared against.
    ByteInt,
    KiloByte,
    MegaByte,
    MegaByteFloat,
    GigaByte,
    GigaByteFloat,

    SecsInt,
    SecsFloat,

    VarChar(usize),
    Char(usize),
    Text,
    Blob,
    Inet,
    Uuid,

    /// A list of strings stored as delimited text.
    StrList { separator: char },
    /// A list of integers stored as delimited text.
    IntList { separator: char },
    StrArray,
    IntArray,

    /// A JSON object; empty in storage reads back as `{}`.
    Dict,
    /// Arbitrary JSON; empty in storage reads back as null.
    Json,

    /// Names the subtype of the object stored in a row.
    ObjType,

    /// Computed from other members; has no column.
    Virtual,
}

/// The coarse categories that decide how a field is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    String,
    Int,
    Float,
    Boolean,
    Timestamp,
    StringList,
    IntList,
    StringArray,
    IntArray,
    Dict,
    Json,
    Discriminator,
    Virtual,
}

impl FieldKind {
    pub fn str_list() -> FieldKind {
        FieldKind::StrList { separator: ',' }
    }

    pub fn int_list() -> FieldKind {
        FieldKind::IntList { separator: ',' }
    }

    pub fn category(&self) -> Category {
        use FieldKind::*;

        match self {
            AutoInc | Serial | TinyInt { .. } | SmallInt { .. } | Int | BigInt | TimeInt
            | ByteInt | KiloByte | MegaByte | GigaByte | SecsInt => Category::Int,
            Float | MegaByteFloat | GigaByteFloat | SecsFloat => Category::Float,
            Boolean => Category::Boolean,
            Timestamp => Category::Timestamp,
            VarChar(_) | Char(_) | Text | Blob | Inet | Uuid => Category::String,
            StrList { .. } => Category::StringList,
            IntList { .. } => Category::IntList,
            StrArray => Category::StringArray,
            IntArray => Category::IntArray,
            Dict => Category::Dict,
            Json => Category::Json,
            ObjType => Category::Discriminator,
            Virtual => Category::Virtual,
        }
    }

    pub fn is_auto_increment(&self) -> bool {
        matches!(self, FieldKind::AutoInc | FieldKind::Serial)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.category(), Category::Int | Category::Float)
    }

    /// True for every kind holding several values: delimited lists and
    /// arrays.
    pub fn is_list(&self) -> bool {
        matches!(
            self.category(),
            Category::StringList | Category::IntList | Category::StringArray | Category::IntArray
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self.category(), Category::StringArray | Category::IntArray)
    }

    /// Delimiter of a text-stored list.
    pub fn separator(&self) -> Option<char> {
        match self {
            FieldKind::StrList { separator } | FieldKind::IntList { separator } => {
                Some(*separator)
            }
            _ => None,
        }
    }

    /// Factor converting bytes into the unit of this field.
    pub fn byte_scale(&self) -> f64 {
        match self {
            FieldKind::KiloByte => 1.0 / (1u64 << 10) as f64,
            FieldKind::MegaByte | FieldKind::MegaByteFloat => 1.0 / (1u64 << 20) as f64,
            FieldKind::GigaByte | FieldKind::GigaByteFloat => 1.0 / (1u64 << 30) as f64,
            _ => 1.0,
        }
    }

    /// The value a member holds when nothing was assigned or selected.
    pub fn default_value(&self) -> Value {
        match self.category() {
            Category::Int => Value::I64(0),
            Category::Float => Value::F64(0.0),
            Category::Boolean => Value::Bool(false),
            Category::String => Value::String(String::new()),
            Category::StringList | Category::IntList | Category::StringArray | Category::IntArray => {
                Value::List(vec![])
            }
            Category::Dict => Value::Json(serde_json::Value::Object(Default::default())),
            Category::Timestamp | Category::Json | Category::Discriminator | Category::Virtual => {
                Value::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(FieldKind::AutoInc.category(), Category::Int);
        assert_eq!(FieldKind::TimeInt.category(), Category::Int);
        assert_eq!(FieldKind::MegaByteFloat.category(), Category::Float);
        assert_eq!(FieldKind::str_list().category(), Category::StringList);
        assert!(FieldKind::IntArray.is_list());
        assert!(!FieldKind::Text.is_list());
    }

    #[test]
    fn byte_scales() {
        assert_eq!(FieldKind::KiloByte.byte_scale() * 1024.0, 1.0);
        assert_eq!(FieldKind::GigaByteFloat.byte_scale() * (1u64 << 30) as f64, 1.0);
        assert_eq!(FieldKind::ByteInt.byte_scale(), 1.0);
    }
}
