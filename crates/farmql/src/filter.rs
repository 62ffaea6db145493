mod command;
pub use command::{CommandRunner, ShellCommand};

mod date;

mod lower;

mod parser;

mod phrase;
pub use phrase::{CmpOp, ListOp, Literal, LogicOp, Operand, Phrase};

mod sql;
pub(crate) use sql::Render;

mod token;

use crate::{simplify, Error, Result};

use chrono::{DateTime, Local};
use farmql_core::{
    driver::Flavor,
    schema::{Field, FieldId, TableId},
    stmt::{self, Expr, Input},
    Schema,
};
use farmql_sql::Serializer;
use indexmap::IndexMap;
use std::sync::{Arc, OnceLock};

/// A parsed WHERE string.
///
/// The phrase tree is built once; SQL, the predicate AST and the canonical
/// text are all rendered from it.
#[derive(Debug, Clone)]
pub struct Where {
    builder: Builder,

    text: String,

    root: Option<Phrase>,

    /// When the string was parsed. Relative times and dates without a year
    /// count from here.
    now: DateTime<Local>,

    /// Optimized predicate, built on first use.
    predicate: OnceLock<Expr>,
}

/// Options for parsing WHERE strings against a primary table.
#[derive(Debug, Clone)]
pub struct Builder {
    schema: Arc<Schema>,
    primary: TableId,
    strict: bool,
    aliases: IndexMap<String, String>,
    commands: Arc<dyn CommandRunner>,
    now: Option<DateTime<Local>>,
}

impl Builder {
    /// When set (the default), bare words must name a member or an alias.
    pub fn strict(mut self, strict: bool) -> Builder {
        self.strict = strict;
        self
    }

    /// Adds an alias checked before the table and global aliases.
    pub fn alias(mut self, name: impl Into<String>, text: impl Into<String>) -> Builder {
        self.aliases.insert(name.into(), text.into());
        self
    }

    pub fn commands(mut self, commands: Arc<dyn CommandRunner>) -> Builder {
        self.commands = commands;
        self
    }

    /// Fixes the time the string is parsed at.
    pub fn now(mut self, now: DateTime<Local>) -> Builder {
        self.now = Some(now);
        self
    }

    pub fn parse(&self, text: &str) -> Result<Where> {
        let now = self.now.unwrap_or_else(Local::now);

        let cx = parser::Context {
            schema: &self.schema,
            primary: self.primary,
            strict: self.strict,
            aliases: &self.aliases,
            commands: &*self.commands,
            now: now.naive_local(),
        };

        let root = parser::parse(&cx, text, &mut vec![])?;

        Ok(Where {
            builder: self.clone(),
            text: text.to_string(),
            root,
            now,
            predicate: OnceLock::new(),
        })
    }
}

impl Where {
    pub fn builder(schema: Arc<Schema>, primary: TableId) -> Builder {
        Builder {
            schema,
            primary,
            strict: true,
            aliases: IndexMap::new(),
            commands: Arc::new(ShellCommand),
            now: None,
        }
    }

    /// Parses `text` with the default options.
    pub fn parse(schema: Arc<Schema>, primary: TableId, text: &str) -> Result<Where> {
        Where::builder(schema, primary).parse(text)
    }

    /// The text the string was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn primary(&self) -> TableId {
        self.builder.primary
    }

    pub fn schema(&self) -> &Schema {
        &self.builder.schema
    }

    pub fn root(&self) -> Option<&Phrase> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Renders the body of a WHERE clause for `flavor`. An empty string
    /// renders as the empty string.
    pub fn to_sql(&self, flavor: Flavor) -> Result<String> {
        let Some(root) = &self.root else {
            return Ok(String::new());
        };

        let render = Render {
            schema: self.schema(),
            serializer: Serializer::new(self.schema(), flavor),
            now: self.now.timestamp(),
        };
        render.phrase(root)
    }

    /// Renders the string in canonical form. Parsing the result yields the
    /// same SQL and AST.
    pub fn to_natural(&self) -> String {
        self.root
            .as_ref()
            .map(|root| root.to_natural(self.schema()))
            .unwrap_or_default()
    }

    /// The predicate AST before optimization. An empty string is `true`.
    pub fn ast(&self) -> Result<Expr> {
        match &self.root {
            Some(root) => lower::lower(self.schema(), root),
            None => Ok(Expr::from(true)),
        }
    }

    /// The optimized predicate.
    pub fn predicate(&self) -> Result<&Expr> {
        if let Some(predicate) = self.predicate.get() {
            return Ok(predicate);
        }

        let predicate = simplify::optimize(self.ast()?)?;
        Ok(self.predicate.get_or_init(|| predicate))
    }

    /// Tests an object against the string without going through the store.
    pub fn matches(&self, input: &mut dyn Input) -> Result<bool> {
        stmt::matches(self.predicate()?, input)
    }

    /// Every field the string depends on, once each, in order of
    /// appearance. Virtual fields are followed by the fields they are
    /// computed from.
    pub fn members(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = vec![];
        let Some(root) = &self.root else {
            return fields;
        };

        for id in root.fields() {
            let field = self.schema().field(id);
            let table = self.schema().table(field.table());

            let dependents = field
                .dependents
                .iter()
                .filter_map(|member| table.field_by_member(member));

            for field in std::iter::once(field).chain(dependents) {
                if !fields.iter().any(|f| f.id == field.id) {
                    fields.push(field);
                }
            }
        }

        fields
    }

    /// Tables the string references other than the primary table. Each
    /// needs a join.
    pub fn tables(&self) -> Vec<TableId> {
        let mut tables = vec![];
        for field in self.members() {
            let table = field.table();
            if table != self.primary() && !tables.contains(&table) {
                tables.push(table);
            }
        }
        tables
    }

    /// Replaces every phrase that references one of `members` with an
    /// always true phrase. With `keep`, phrases referencing anything else are
    /// replaced instead.
    ///
    /// Members are written as in WHERE strings; `Type.*` names every member
    /// of a table.
    pub fn mask(&self, members: &[&str], keep: bool) -> Result<Where> {
        let mut tables = vec![];
        let mut fields = vec![];

        for member in members {
            if let Some(name) = member.strip_suffix(".*") {
                let table = self.schema().table_by_name(name).ok_or_else(|| {
                    Error::invalid_member(format!("'{name}' does not name a table"))
                })?;
                tables.push(table.id);
            } else {
                let field = self
                    .schema()
                    .field_by_member(member, Some(self.primary()))
                    .ok_or_else(|| {
                        Error::invalid_member(format!("'{member}' does not map to a valid member"))
                    })?;
                fields.push(field.id);
            }
        }

        let listed = |id: &FieldId| {
            if tables.contains(&id.table) || fields.contains(id) {
                return true;
            }
            // a virtual field counts as listed when a dependent is
            let field = self.schema().field(*id);
            let table = self.schema().table(id.table);
            field.dependents.iter().any(|member| {
                table
                    .field_by_member(member)
                    .is_some_and(|dependent| fields.contains(&dependent.id))
            })
        };

        let hide = |ids: &[FieldId]| ids.iter().any(|id| listed(id) != keep);

        let root = self.root.as_ref().map(|root| root.mask(&hide));
        let text = root
            .as_ref()
            .map(|root| root.to_natural(self.schema()))
            .unwrap_or_default();

        Ok(Where {
            builder: self.builder.clone(),
            text,
            root,
            now: self.now,
            predicate: OnceLock::new(),
        })
    }

    /// True if the string contains the phrase written in `text`.
    /// Comparisons are also found with their operands swapped.
    pub fn find(&self, text: &str) -> Result<bool> {
        let Some(root) = &self.root else {
            return Ok(false);
        };

        let needle = self.builder.clone().strict(false).now(self.now).parse(text)?;
        Ok(needle.root.is_some_and(|needle| root.contains(&needle)))
    }
}
