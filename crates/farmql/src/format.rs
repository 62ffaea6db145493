//! Plain-text rendering of query results.
//!
//! Each field kind maps to a default [`FieldFormat`]: numbers are
//! right-justified, strings left-justified and truncated in the middle,
//! times have a fixed width. Values are always read through
//! [`DbObject::get`](crate::DbObject::get) so that formatting never has to
//! know how a field is stored.

use crate::{Error, QueryResult, Result};

use farmql_core::{
    schema::{epoch_to_local, to_timestamp, Field, FieldKind},
    stmt::Value,
};

const TIME_FORMAT: &str = "%m/%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Right,
}

/// Which part of a value too wide for its column is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncate {
    /// Never shorten the value.
    Never,

    /// Keep the end of the value.
    Left,

    /// Keep both ends and elide the middle.
    Center,

    /// Keep the start of the value.
    Right,
}

/// How a value is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Text,
    Integer,
    Float { precision: usize },

    /// Epoch seconds shown as a local time.
    Time,

    /// A timestamp shown as a local time.
    Datetime,

    /// A quantity of bytes in units of `scale` bytes.
    Bytes { scale: u64 },

    /// Seconds shown as `H:MM:SS`.
    Elapsed,
    List,
    Dict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFormat {
    pub style: Style,
    pub justify: Justify,
    pub truncate: Truncate,

    /// Narrowest the column may be.
    pub min_width: usize,

    /// Widest the column may be; wider values are truncated.
    pub max_width: Option<usize>,
}

impl FieldFormat {
    /// The default format for values of `field`.
    pub fn for_field(field: &Field) -> FieldFormat {
        use FieldKind::*;

        let (style, min_width, max_width) = match &field.kind {
            AutoInc | Serial | TinyInt { .. } | SmallInt { .. } | Int | BigInt => {
                (Style::Integer, 0, None)
            }
            Float => (Style::Float { precision: 1 }, 0, None),
            TimeInt => (Style::Time, 11, Some(11)),
            Timestamp => (Style::Datetime, 11, Some(11)),
            ByteInt => (Style::Bytes { scale: 1 }, 5, None),
            KiloByte => (Style::Bytes { scale: 1 << 10 }, 5, None),
            MegaByte | MegaByteFloat => (Style::Bytes { scale: 1 << 20 }, 5, None),
            GigaByte | GigaByteFloat => (Style::Bytes { scale: 1 << 30 }, 5, None),
            SecsInt | SecsFloat => (Style::Elapsed, 10, None),
            VarChar(len) | Char(len) => (Style::Text, 0, Some((*len).clamp(1, 40))),
            Text | Blob | Inet | Uuid | ObjType | Boolean => (Style::Text, 0, Some(40)),
            StrList { .. } | IntList { .. } | StrArray | IntArray => (Style::List, 0, Some(40)),
            Dict | Json => (Style::Dict, 0, Some(40)),
            Virtual => (Style::Text, 0, None),
        };

        let (justify, truncate) = match style {
            Style::Integer | Style::Float { .. } | Style::Bytes { .. } | Style::Elapsed => {
                (Justify::Right, Truncate::Never)
            }
            Style::Time | Style::Datetime => (Justify::Left, Truncate::Right),
            Style::List | Style::Dict => (Justify::Left, Truncate::Right),
            Style::Text => (Justify::Left, Truncate::Center),
        };

        FieldFormat {
            style,
            justify,
            truncate,
            min_width,
            max_width,
        }
    }

    /// The text of `value`, before padding.
    pub fn render(&self, value: &Value) -> String {
        if value.is_null() {
            return String::new();
        }

        match self.style {
            Style::Text | Style::Integer => value.to_text(),
            Style::Float { precision } => match value.as_f64() {
                Some(v) => format!("{v:.precision$}"),
                None => value.to_text(),
            },
            Style::Time => match value.as_i64() {
                Some(secs) if secs > 0 => epoch_to_local(secs)
                    .map(|time| time.format(TIME_FORMAT).to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            },
            Style::Datetime => to_timestamp(value)
                .map(|time| time.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
            Style::Bytes { scale } => match value.as_f64() {
                Some(v) => bytes(v * scale as f64),
                None => value.to_text(),
            },
            Style::Elapsed => match value.as_i64() {
                Some(secs) => elapsed(secs),
                None => value.to_text(),
            },
            Style::List => match value {
                Value::List(items) => items
                    .iter()
                    .map(Value::to_text)
                    .collect::<Vec<_>>()
                    .join(","),
                value => value.to_text(),
            },
            Style::Dict => match value {
                Value::Json(serde_json::Value::Object(map)) => map
                    .iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(text) => format!("{key}:{text}"),
                        value => format!("{key}:{value}"),
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
                value => value.to_text(),
            },
        }
    }

    /// Fits `text` into a column of `width` characters.
    pub fn pad(&self, text: &str, width: usize) -> String {
        let text = self.truncate(text, width);
        match self.justify {
            Justify::Left => format!("{text:<width$}"),
            Justify::Right => format!("{text:>width$}"),
        }
    }

    /// The width of a column whose widest value is `widest` characters.
    pub fn width(&self, widest: usize) -> usize {
        let width = widest.max(self.min_width);
        match (self.truncate, self.max_width) {
            (Truncate::Never, _) | (_, None) => width,
            (_, Some(max)) => width.min(max),
        }
    }

    fn truncate(&self, text: &str, width: usize) -> String {
        let len = text.chars().count();
        if len <= width || width == 0 {
            return text.to_string();
        }

        match self.truncate {
            Truncate::Never => text.to_string(),
            Truncate::Right => text.chars().take(width).collect(),
            Truncate::Left => text.chars().skip(len - width).collect(),
            Truncate::Center if width < 3 => text.chars().take(width).collect(),
            Truncate::Center => {
                let keep = width - 2;
                let head = keep.div_ceil(2);
                let tail = keep - head;
                let start: String = text.chars().take(head).collect();
                let end: String = text.chars().skip(len - tail).collect();
                format!("{start}..{end}")
            }
        }
    }
}

/// Renders the given members of every object in `result` as a table with a
/// header line. An empty `members` renders every selected member.
pub fn format_rows(result: &mut QueryResult, members: &[&str]) -> Result<String> {
    let columns: Vec<(String, FieldFormat)> = {
        let fields = result.resolve(members)?;
        fields
            .into_iter()
            .map(|(name, field)| (name, FieldFormat::for_field(field)))
            .collect()
    };

    if columns.is_empty() {
        return Err(Error::invalid_member("nothing to format"));
    }

    let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    let widths = result.field_widths(&names)?;

    let mut lines = vec![];

    let header = columns
        .iter()
        .map(|(name, format)| {
            let width = format.width(widths.get(name).copied().unwrap_or(0));
            format.pad(name, width)
        })
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(header.trim_end().to_string());

    for index in 0..result.len() {
        let Some(object) = result.get(index)? else {
            break;
        };

        let mut cells = vec![];
        for (name, format) in &columns {
            let width = format.width(widths.get(name).copied().unwrap_or(0));
            let text = format.render(&object.get(name)?);
            cells.push(format.pad(&text, width));
        }
        lines.push(cells.join(" ").trim_end().to_string());
    }

    Ok(lines.join("\n"))
}

fn bytes(mut value: f64) -> String {
    const UNITS: [&str; 6] = ["B", "K", "M", "G", "T", "P"];

    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{}{}", value.round() as i64, UNITS[unit])
    } else if value < 10.0 {
        format!("{value:.1}{}", UNITS[unit])
    } else {
        format!("{}{}", value.round() as i64, UNITS[unit])
    }
}

/// `H:MM:SS` without leading zero groups; zero is blank.
fn elapsed(secs: i64) -> String {
    if secs == 0 {
        return String::new();
    }

    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);

    if hours > 0 {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}")
    } else if minutes > 0 {
        format!("{sign}{minutes}:{seconds:02}")
    } else {
        format!("{sign}{seconds}")
    }
}
