use farmql_sql::stmt::Direction;

/// What to read: which members, which objects, and in which order.
///
/// ```
/// # use farmql::Query;
/// let query = Query::new("user=joe and not done")
///     .members(["jobid", "title", "Task.state"])
///     .order_by(["-priority", "jobid"])
///     .limit(10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Members to select. Empty selects every column of the table.
    pub(crate) members: Vec<String>,

    /// Members to leave out of the selection.
    pub(crate) not_members: Vec<String>,

    /// WHERE string.
    pub(crate) filter: String,

    /// Raw SQL conditions ANDed with the WHERE string.
    pub(crate) where_args: Vec<String>,

    pub(crate) order_by: Vec<(String, Direction)>,

    pub(crate) group_by: Vec<String>,

    pub(crate) limit: Option<u64>,

    pub(crate) offset: Option<u64>,

    /// Aliases available to this query's WHERE string only.
    pub(crate) aliases: Vec<(String, String)>,
}

impl Query {
    pub fn new(filter: impl Into<String>) -> Query {
        Query {
            filter: filter.into(),
            ..Query::default()
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Query {
        self.filter = filter.into();
        self
    }

    /// Members are written as in WHERE strings; `Type.*` selects every
    /// member of a table.
    pub fn members<I, S>(mut self, members: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = members.into_iter().map(Into::into).collect();
        self
    }

    pub fn not_members<I, S>(mut self, members: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_members = members.into_iter().map(Into::into).collect();
        self
    }

    /// A leading `-` sorts a member in descending order, a leading `+` (or
    /// none) in ascending order.
    pub fn order_by<I, S>(mut self, members: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.order_by = members
            .into_iter()
            .map(|member| {
                let member = member.as_ref();
                match member.strip_prefix('-') {
                    Some(member) => (member.to_string(), Direction::Desc),
                    None => (member.trim_start_matches('+').to_string(), Direction::Asc),
                }
            })
            .collect();
        self
    }

    pub fn group_by<I, S>(mut self, members: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = members.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: u64) -> Query {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Query {
        self.offset = Some(offset);
        self
    }

    pub fn where_arg(mut self, sql: impl Into<String>) -> Query {
        self.where_args.push(sql.into());
        self
    }

    pub fn alias(mut self, name: impl Into<String>, text: impl Into<String>) -> Query {
        self.aliases.push((name.into(), text.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_prefixes() {
        let query = Query::new("").order_by(["-priority", "+user", "jobid"]);
        assert_eq!(
            query.order_by,
            vec![
                ("priority".to_string(), Direction::Desc),
                ("user".to_string(), Direction::Asc),
                ("jobid".to_string(), Direction::Asc),
            ]
        );
    }
}
