use super::TableId;

/// How one table is reached from another in a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: TableId,
    pub right: TableId,

    /// The ON clause, e.g. `Task.jobid=Job.jobid AND ...`.
    pub on: String,

    /// Tables that must already be joined before this join can be used.
    pub pre_tables: Vec<TableId>,

    /// An explicit join that does not imply its reverse.
    pub one_way: bool,

    /// Rendered as `LEFT JOIN` rather than `JOIN`.
    pub left_join: bool,

    /// Declared explicitly rather than derived from common keys.
    pub explicit: bool,
}

impl Join {
    /// The ON clause with each equality written in a canonical direction,
    /// so that `A.k=B.k` and `B.k=A.k` compare equal.
    pub(crate) fn canonical_on(&self) -> Vec<String> {
        let mut terms: Vec<String> = self
            .on
            .split(" AND ")
            .map(|term| match term.trim().split_once('=') {
                Some((a, b)) if a.trim() > b.trim() => format!("{}={}", b.trim(), a.trim()),
                Some((a, b)) => format!("{}={}", a.trim(), b.trim()),
                None => term.trim().to_string(),
            })
            .collect();
        terms.sort();
        terms
    }
}
