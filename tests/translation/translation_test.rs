use std::sync::Arc;
use std::time::Duration;

use jsonql::config::{MetadataSettings, RefreshPolicy, Settings};
use jsonql::context::SqliteContext;
use jsonql::{DataContext, Error, ErrorKind, Operation, Translator};
use rusqlite::Connection;
use serde_json::json;

fn sqlite(source: &str, ddl: &str) -> Arc<SqliteContext> {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(ddl).unwrap();
    Arc::new(SqliteContext::from_connection(source, conn).unwrap())
}

fn shop() -> Arc<SqliteContext> {
    sqlite(
        "main",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER);
         CREATE TABLE orders (
             id INTEGER PRIMARY KEY,
             user_id INTEGER NOT NULL REFERENCES users(id),
             status TEXT
         );
         INSERT INTO users (id, name, age) VALUES (1, 'ann', 34), (2, 'bob', 19), (3, 'cy', 52);
         INSERT INTO orders (id, user_id, status) VALUES
             (10, 1, 'open'), (11, 1, 'paid'), (12, 3, 'open');",
    )
}

fn translator(settings: Settings) -> Translator {
    let translator = Translator::new(settings);
    translator.register("main", shop()).unwrap();
    translator
}

#[test]
fn test_select_with_join_and_filters() {
    let translator = translator(Settings::default());
    let summary = translator
        .translate(
            r#"{
                "select": "orders o",
                "join": {"inner": "users"},
                "fields": ["o.id", "users.name who"],
                "where": ["status=open", "users.age>=30"],
                "order": "-o.id"
            }"#,
        )
        .unwrap();

    assert_eq!(summary.operation(), Operation::Select);
    assert_eq!(
        summary.data(),
        json!([{"id": 12, "who": "cy"}, {"id": 10, "who": "ann"}])
    );
}

#[test]
fn test_detail_and_limit_documents() {
    let translator = translator(Settings::default());

    let detail = translator
        .translate(r#"{"detail": "users", "fields": "name", "where": "age<20"}"#)
        .unwrap();
    assert_eq!(detail.data(), json!({"name": "bob"}));

    let page = translator
        .translate(r#"{"select": "users", "fields": "id", "order": "id", "limit": [0, 2]}"#)
        .unwrap();
    assert_eq!(
        page.data(),
        json!({"start": 0, "end": 2, "total": 3, "data": [{"id": 1}, {"id": 2}]})
    );
}

#[test]
fn test_write_documents() {
    let translator = translator(Settings::default());

    let inserted = translator
        .translate(r#"{"insert": "users", "values": {"name": "dee", "age": 27}}"#)
        .unwrap();
    assert_eq!(inserted.data(), json!({"affected_rows": 1, "last_insert_id": 4}));

    let updated = translator
        .translate(r#"{"update": "users", "values": {"age": 28}, "where": "name=dee"}"#)
        .unwrap();
    assert_eq!(updated.data(), json!({"affected_rows": 1}));

    let deleted = translator
        .translate(r#"{"delete": "orders", "where": "status=open"}"#)
        .unwrap();
    assert_eq!(deleted.data(), json!({"affected_rows": 2}));
}

#[test]
fn test_transaction_runs_in_request_order() {
    let translator = translator(Settings::default());
    let summary = translator
        .translate(
            r#"{"transaction": [
                {"insert": "main.users", "values": {"name": "eve"}},
                {"update": "users", "values": {"age": 40}, "where": "name=eve"}
            ]}"#,
        )
        .unwrap();

    assert_eq!(summary.operation(), Operation::Transaction);
    assert_eq!(
        summary.data(),
        json!([{"affected_rows": 1, "last_insert_id": 4}, {"affected_rows": 1}])
    );

    let eve = translator
        .translate(r#"{"detail": "users", "fields": "age", "where": "name=eve"}"#)
        .unwrap();
    assert_eq!(eve.data(), json!({"age": 40}));
}

#[test]
fn test_failed_transaction_leaves_no_trace() {
    let translator = translator(Settings::default());
    let err = translator
        .translate(
            r#"{"transaction": [
                {"insert": "users", "values": {"id": 9, "name": "fay"}},
                {"insert": "orders", "values": {"id": 10, "user_id": 9}}
            ]}"#,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);

    let fay = translator
        .translate(r#"{"select": "users", "where": "id=9"}"#)
        .unwrap();
    assert!(fay.result_rows().is_empty());
}

#[test]
fn test_cross_source_transaction_is_rejected() {
    let translator = translator(Settings::default());
    translator
        .register(
            "archive",
            sqlite("archive", "CREATE TABLE logs (id INTEGER PRIMARY KEY, line TEXT);"),
        )
        .unwrap();

    let err = translator
        .translate(
            r#"{"transaction": [
                {"insert": "users", "values": {"name": "gus"}},
                {"insert": "archive.logs", "values": {"line": "gus joined"}}
            ]}"#,
        )
        .unwrap_err();
    assert!(matches!(err, Error::CrossSourceTransaction));
    assert_eq!(err.kind(), ErrorKind::CrossSourceTransaction);

    // Each source still answers on its own.
    let logs = translator
        .translate(r#"{"select": "archive.logs"}"#)
        .unwrap();
    assert!(logs.result_rows().is_empty());
}

#[test]
fn test_structure_documents() {
    let translator = translator(Settings::default());

    let users = translator.translate(r#"{"struct": "users"}"#).unwrap();
    let doc = users.data();
    assert_eq!(doc["name"], "users");
    assert_eq!(doc["columns"].as_array().map(Vec::len), Some(3));
    assert_eq!(doc["columns"][0]["primary_key"], true);

    let all = translator.translate(r#"{"structs": "main"}"#).unwrap();
    let doc = all.data();
    let names: Vec<&str> = doc
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["orders", "users"]);
}

#[test]
fn test_malformed_requests() {
    let translator = translator(Settings::default());

    let err = translator.translate("[1, 2]").unwrap_err();
    assert_eq!(err.to_string(), "request must be a JSON object");

    let err = translator.translate(r#"{"where": "id=1"}"#).unwrap_err();
    assert!(matches!(err, Error::NoOperation));

    let err = translator.translate("{not json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRequest);
}

#[test]
fn test_refresh_all_reloads_every_source() {
    let translator = translator(Settings::default());
    let archive = sqlite("archive", "CREATE TABLE logs (id INTEGER PRIMARY KEY);");
    translator.register("archive", archive.clone()).unwrap();

    archive
        .connection()
        .execute_batch("CREATE TABLE events (id INTEGER PRIMARY KEY)")
        .unwrap();
    assert!(translator
        .translate(r#"{"select": "archive.events"}"#)
        .is_err());

    assert_eq!(translator.refresh_all(), 2);
    assert!(translator
        .translate(r#"{"select": "archive.events"}"#)
        .is_ok());
}

#[tokio::test]
async fn test_refresh_task_is_opt_in() {
    let translator = Arc::new(translator(Settings::default()));
    assert!(translator.spawn_refresh().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interval_refresh_swaps_schema() {
    let settings = Settings {
        metadata: MetadataSettings {
            refresh_policy: RefreshPolicy::Interval,
            refresh_interval: 1,
        },
        ..Settings::default()
    };
    let context = shop();
    let translator = Translator::new(settings);
    translator.register("main", context.clone()).unwrap();
    let translator = Arc::new(translator);

    let handle = translator.spawn_refresh().unwrap();
    let mut refreshed = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if context.registry().generation() > 0 {
            refreshed = true;
            break;
        }
    }
    handle.abort();
    assert!(refreshed);
    assert_eq!(context.schema().tables().len(), 2);
}
