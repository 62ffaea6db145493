use farmql::{
    driver::Flavor,
    filter::Builder,
    stmt::{Expr, Value},
    Where,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

fn jobs() -> Builder {
    let schema = tests::render_farm();
    let job = schema.table_by_name("Job").unwrap().id;
    Where::builder(schema, job)
}

fn object(values: &[(&str, Value)]) -> IndexMap<String, Value> {
    values
        .iter()
        .map(|(member, value)| (member.to_string(), value.clone()))
        .collect()
}

#[test]
fn comparison_renders_and_evaluates() {
    let w = jobs().parse("priority > 300 and user=thing").unwrap();
    assert_eq!(
        w.to_sql(Flavor::Sqlite).unwrap(),
        "Job.priority > 300 AND Job.user='thing'"
    );

    let mut busy = object(&[("priority", Value::F64(400.0)), ("user", "thing".into())]);
    let mut idle = object(&[("priority", Value::F64(200.0)), ("user", "thing".into())]);
    assert!(w.matches(&mut busy).unwrap());
    assert!(!w.matches(&mut idle).unwrap());
}

#[test]
fn list_membership() {
    let w = jobs().parse("owner in [tom, dick, harry]").unwrap();

    assert!(w.matches(&mut object(&[("owner", "dick".into())])).unwrap());
    assert!(!w.matches(&mut object(&[("owner", "adam".into())])).unwrap());
}

#[test]
fn byte_units_follow_the_member() {
    let w = jobs().parse("filesize > 1.5M").unwrap();
    assert_eq!(w.to_sql(Flavor::Sqlite).unwrap(), "Job.filesize > 1536");
}

#[test]
fn negation_is_pushed_to_comparisons() {
    let w = jobs().parse("not (errors=1 or errors=2)").unwrap();
    assert_eq!(
        *w.predicate().unwrap(),
        Expr::and(
            Expr::ne(Expr::member("Job", "errors"), 1),
            Expr::ne(Expr::member("Job", "errors"), 2),
        )
    );

    let mut failed = object(&[("errors", Value::I64(2))]);
    let mut clean = object(&[("errors", Value::I64(0))]);
    assert!(!w.matches(&mut failed).unwrap());
    assert!(w.matches(&mut clean).unwrap());
}

#[test]
fn aliases_expand_in_place() {
    let w = jobs().parse("mine and pri > 10").unwrap();
    assert_eq!(
        w.to_sql(Flavor::Sqlite).unwrap(),
        "(Job.user='joe') AND Job.priority > 10"
    );
}

#[test]
fn alias_cycles_are_reported() {
    let err = jobs().parse("loop1").unwrap_err();
    assert!(err.is_infinite_loop());
}

#[test]
fn unknown_words_are_rejected_in_strict_mode() {
    let err = jobs().parse("colour=red").unwrap_err();
    assert!(err.is_no_member_found());
}

#[test]
fn joined_members_name_their_tables() {
    let w = jobs().parse("Task.state=finished and user=joe").unwrap();
    let schema = tests::render_farm();
    let task = schema.table_by_name("Task").unwrap().id;

    assert_eq!(w.tables(), vec![task]);
}
