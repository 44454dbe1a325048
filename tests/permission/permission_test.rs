use std::sync::Arc;

use jsonql::action::Value;
use jsonql::config::Settings;
use jsonql::context::Row;
use jsonql::metadata::{SchemaBuilder, SchemaSnapshot};
use jsonql::permission::{PermissionFacts, StaticPolicy};
use jsonql::{Action, DataContext, Dialect, ErrorKind, Operation, Result, Summary, Translator};
use parking_lot::Mutex;

/// Records every statement it is asked to run and returns no rows.
struct SpyContext {
    schema: Arc<SchemaSnapshot>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
}

impl SpyContext {
    fn new() -> Self {
        let mut builder = SchemaBuilder::new("default");
        builder.table("users", &["id", "name", "email", "tenant_id"]);
        builder.table("audit", &["id", "message"]);
        Self {
            schema: Arc::new(builder.build()),
            executed: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.executed.lock().len()
    }
}

impl DataContext for SpyContext {
    fn source(&self) -> &str {
        "default"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn schema(&self) -> Arc<SchemaSnapshot> {
        Arc::clone(&self.schema)
    }

    fn execute(&self, action: &mut Action) -> Result<Summary> {
        let stmt = action.build()?.clone();
        self.executed.lock().push((stmt.sql, stmt.params));
        Ok(Summary::rows(action, Vec::<Row>::new()))
    }

    fn execute_sql(&self, sql: &str) -> Result<Summary> {
        self.executed.lock().push((sql.to_string(), Vec::new()));
        Ok(Summary::passthrough(Operation::Sql, Vec::new()))
    }

    fn execute_native(&self, content: &str) -> Result<Summary> {
        self.executed.lock().push((content.to_string(), Vec::new()));
        Ok(Summary::passthrough(Operation::Native, Vec::new()))
    }

    fn execute_transaction(&self, actions: &mut [Action]) -> Result<Summary> {
        let mut children = Vec::new();
        for action in actions.iter_mut() {
            children.push(self.execute(action)?);
        }
        Ok(Summary::transaction(children))
    }

    fn refresh_schema(&self) -> Result<()> {
        Ok(())
    }
}

fn translator(facts: &str) -> (Translator, Arc<SpyContext>) {
    let facts: PermissionFacts = toml::from_str(facts).unwrap();
    let translator =
        Translator::new(Settings::default()).with_policy(Arc::new(StaticPolicy::new(facts)));
    let spy = Arc::new(SpyContext::new());
    translator.register("default", spy.clone()).unwrap();
    (translator, spy)
}

const READ_USERS: &str = r#"
[[tables]]
table = "users"
action = "query"
"#;

#[test]
fn test_denied_request_never_reaches_backend() {
    let (translator, spy) = translator(READ_USERS);

    let err = translator
        .translate(r#"{"delete": "users", "where": "id=1"}"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(
        err.to_string(),
        "permission denied: no delete permission on table [users]"
    );

    let err = translator.translate(r#"{"select": "audit"}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    assert_eq!(spy.calls(), 0);
}

#[test]
fn test_allowed_request_runs_once() {
    let (translator, spy) = translator(READ_USERS);

    let summary = translator
        .translate(r#"{"select": "users", "fields": "name"}"#)
        .unwrap();
    assert_eq!(summary.operation(), Operation::Select);
    assert_eq!(spy.calls(), 1);
}

#[test]
fn test_transaction_children_are_checked() {
    let (translator, spy) = translator(READ_USERS);

    let err = translator
        .translate(r#"{"transaction": [{"insert": "users", "values": {"name": "ann"}}]}"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(spy.calls(), 0);
}

#[test]
fn test_conditions_reach_rendered_statement() {
    let (translator, spy) = translator(
        r#"
[[tables]]
table = "users"
action = "query"

[[tables.conditions]]
column = "tenant_id"
value = "7"
"#,
    );

    translator
        .translate(r#"{"select": "users", "fields": "name", "where": "name=bob"}"#)
        .unwrap();

    let executed = spy.executed.lock();
    let (sql, params) = &executed[0];
    assert_eq!(
        sql,
        "SELECT\n  \"users\".\"name\"\nFROM \"users\"\nWHERE \"users\".\"name\" = ? AND \"users\".\"tenant_id\" = ?"
    );
    assert_eq!(
        params,
        &vec![Value::Text("bob".into()), Value::Text("7".into())]
    );
}

#[test]
fn test_hidden_columns_are_not_selected() {
    let (translator, spy) = translator(
        r#"
[[tables]]
table = "users"
action = "query"

[[columns]]
table = "users"
column = "name"
action = "read"
"#,
    );

    translator.translate(r#"{"select": "users"}"#).unwrap();
    let executed = spy.executed.lock();
    assert_eq!(executed[0].0, "SELECT\n  \"users\".\"name\"\nFROM \"users\"");

    drop(executed);
    let err = translator
        .translate(r#"{"select": "users", "fields": "email"}"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(spy.calls(), 1);
}

const READ_USER_NAMES: &str = r#"
[[tables]]
table = "users"
action = "query"

[[columns]]
table = "users"
column = "name"
action = "read"
"#;

#[test]
fn test_expressions_are_denied_on_column_restricted_tables() {
    let (translator, spy) = translator(READ_USER_NAMES);

    let err = translator
        .translate(r#"{"select": "users", "fields": ["name", "upper(email)"]}"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert!(err.to_string().contains("upper(email)"));
    assert_eq!(spy.calls(), 0);
}

#[test]
fn test_subquery_columns_are_denied() {
    // users carries no column rules here; the subquery still reaches audit.
    let (translator, spy) = translator(READ_USERS);

    let err = translator
        .translate(r#"{"select": "users", "fields": ["name", "(select message from audit)"]}"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(spy.calls(), 0);
}

#[test]
fn test_hidden_columns_cannot_filter_or_sort() {
    let (translator, spy) = translator(READ_USER_NAMES);

    for request in [
        r#"{"select": "users", "fields": "name", "where": "email=a@b"}"#,
        r#"{"select": "users", "fields": "name", "where": {"or": ["name=bob", "tenant_id=7"]}}"#,
        r#"{"select": "users", "fields": "name", "order": "-email"}"#,
        r#"{"select": "users", "fields": "name", "group": "tenant_id"}"#,
    ] {
        let err = translator.translate(request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission, "{request}");
    }
    assert_eq!(spy.calls(), 0);

    translator
        .translate(r#"{"select": "users", "fields": "name", "where": "name=bob", "order": "name"}"#)
        .unwrap();
    assert_eq!(spy.calls(), 1);
}
