use farmql_core::{
    schema::{ElapsedSecs, FieldDef, FieldKind, TableDef, VirtualDef},
    Schema,
};

use std::sync::Arc;

/// A cut-down render farm: jobs own tasks, tasks run commands, blades stand
/// alone.
pub(crate) fn render_farm() -> Arc<Schema> {
    let schema = Schema::builder()
        .table(
            TableDef::new("Job")
                .field(FieldDef::new("jobid", FieldKind::AutoInc).key())
                .field(FieldDef::new("user", FieldKind::VarChar(16)).equiv_key().index())
                .field(FieldDef::new("title", FieldKind::Text).equiv_key())
                .field(FieldDef::new("owner", FieldKind::Text))
                .field(FieldDef::new("priority", FieldKind::Float))
                .field(FieldDef::new("spooltime", FieldKind::TimeInt))
                .field(FieldDef::new("starttime", FieldKind::TimeInt))
                .field(FieldDef::new("stoptime", FieldKind::TimeInt))
                .field(FieldDef::new("crews", FieldKind::str_list()))
                .field(FieldDef::new("filesize", FieldKind::KiloByte))
                .field(FieldDef::new("done", FieldKind::Boolean))
                .field(FieldDef::new("errors", FieldKind::Int))
                .field(FieldDef::new("metadata", FieldKind::Dict))
                .virtual_field(VirtualDef::new(
                    "elapsed",
                    ["starttime", "stoptime"],
                    Arc::new(ElapsedSecs),
                ))
                .alias("pri", "priority")
                .where_alias("active", "not done"),
        )
        .table(
            TableDef::new("Task")
                .field(FieldDef::new("jobid", FieldKind::Int).key())
                .field(FieldDef::new("taskid", FieldKind::Int).key())
                .field(FieldDef::new("state", FieldKind::Text))
                .field(FieldDef::new("title", FieldKind::Text))
                .field(FieldDef::new("previds", FieldKind::int_list())),
        )
        .table(
            TableDef::new("Command")
                .field(FieldDef::new("jobid", FieldKind::Int).key())
                .field(FieldDef::new("cmdid", FieldKind::Int).key())
                .field(FieldDef::new("taskid", FieldKind::Int))
                .field(FieldDef::new("argv", FieldKind::StrArray)),
        )
        .table(
            TableDef::new("Blade")
                .field(FieldDef::new("name", FieldKind::Text).key())
                .field(FieldDef::new("memory", FieldKind::MegaByte)),
        )
        .common_keys(["jobid", "taskid"])
        .where_alias("mine", "user=joe")
        .where_alias("loop1", "loop2 and done")
        .where_alias("loop2", "errors or loop1")
        .build();

    match schema {
        Ok(schema) => Arc::new(schema),
        Err(err) => panic!("invalid fixture schema: {err}"),
    }
}
