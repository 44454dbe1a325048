use std::fs;

use jsonql::context::SqliteContext;
use jsonql::metadata::{load_table_configs, SchemaProvider};
use jsonql::{DataContext, Dialect, Operation, Parser, Summary};
use rusqlite::Connection;
use serde_json::json;

fn shop() -> SqliteContext {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE orders (
             id INTEGER PRIMARY KEY,
             user_id INTEGER REFERENCES users(id),
             total REAL
         );
         CREATE TABLE reviews (id INTEGER PRIMARY KEY, user_id REFERENCES users, body TEXT);
         CREATE TABLE notes (id INTEGER PRIMARY KEY, author INTEGER, body TEXT);
         INSERT INTO users (id, name) VALUES (1, 'ann'), (2, 'bob');
         INSERT INTO orders (id, user_id, total) VALUES (10, 1, 9.5), (11, 1, 20.0), (12, 2, 3.0);",
    )
    .unwrap();
    SqliteContext::from_connection("main", conn).unwrap()
}

fn run(ctx: &SqliteContext, request: serde_json::Value) -> Summary {
    let schema = ctx.schema();
    let mut action = Parser::new(schema.as_ref(), Dialect::Sqlite)
        .parse(&request)
        .unwrap();
    ctx.execute(&mut action).unwrap()
}

#[test]
fn test_foreign_key_without_column_list_targets_primary_key() {
    let ctx = shop();
    let schema = ctx.schema();
    let reviews = schema.get_table("reviews").unwrap();
    let users = schema.get_table("users").unwrap();

    let paths = schema.get_relationships(reviews.id, users.id);
    assert_eq!(paths.len(), 1);
    let rel = paths[0].first().unwrap();
    assert_eq!(schema.column(rel.foreign).name, "id");
}

#[test]
fn test_join_rows_use_generated_keys() {
    let ctx = shop();
    let summary = run(
        &ctx,
        json!({
            "select": "orders",
            "join": "users",
            "fields": ["id", "users.name"],
            "where": "total>5",
            "order": "id"
        }),
    );
    assert_eq!(
        summary.data(),
        json!([
            {"id": 10, "users__name": "ann"},
            {"id": 11, "users__name": "ann"}
        ])
    );
}

#[test]
fn test_write_round() {
    let ctx = shop();

    let inserted = run(&ctx, json!({"insert": "users", "values": {"name": "cy"}}));
    assert_eq!(inserted.operation(), Operation::Insert);
    assert_eq!(inserted.data(), json!({"affected_rows": 1, "last_insert_id": 3}));

    let updated = run(
        &ctx,
        json!({"update": "users", "values": {"name": "cyd"}, "where": "id=3"}),
    );
    assert_eq!(updated.data(), json!({"affected_rows": 1}));

    let detail = run(&ctx, json!({"detail": "users", "where": "id=3"}));
    assert_eq!(detail.data(), json!({"id": 3, "name": "cyd"}));

    let deleted = run(&ctx, json!({"delete": "users", "where": "name=cyd"}));
    assert_eq!(deleted.affected_rows(), Some(1));

    let missing = run(&ctx, json!({"detail": "users", "where": "id=3"}));
    assert_eq!(missing.data(), json!({}));
}

#[test]
fn test_paginated_envelope() {
    let ctx = shop();
    let summary = run(
        &ctx,
        json!({"select": "orders", "fields": "id", "order": "-id", "limit": [1, 2]}),
    );
    assert_eq!(
        summary.data(),
        json!({"start": 1, "end": 2, "total": 3, "data": [{"id": 11}]})
    );
}

#[test]
fn test_passthrough_statements() {
    let ctx = shop();

    let rows = ctx.execute_native("SELECT COUNT(*) AS n FROM users").unwrap();
    assert_eq!(rows.result_rows()[0]["n"], 2);

    let deleted = ctx.execute_sql("DELETE FROM orders WHERE id = 12").unwrap();
    assert_eq!(deleted.operation(), Operation::Sql);
    assert_eq!(deleted.affected_rows(), Some(1));
}

#[test]
fn test_transaction_commits_every_statement() {
    let ctx = shop();
    let schema = ctx.schema();
    let parser = Parser::new(schema.as_ref(), Dialect::Sqlite);
    let mut actions = vec![
        parser
            .parse(&json!({"insert": "users", "values": {"name": "dee"}}))
            .unwrap(),
        parser
            .parse(&json!({"delete": "orders", "where": "user_id=2"}))
            .unwrap(),
    ];

    let summary = ctx.execute_transaction(&mut actions).unwrap();
    assert_eq!(summary.children().len(), 2);
    assert_eq!(
        summary.data(),
        json!([{"affected_rows": 1, "last_insert_id": 3}, {"affected_rows": 1}])
    );

    let orders: i64 = ctx
        .connection()
        .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orders, 2);
}

#[test]
fn test_table_configs_add_names_and_associations() {
    let dir = tempfile::tempdir().unwrap();
    let source_dir = dir.path().join("main");
    fs::create_dir_all(&source_dir).unwrap();
    fs::write(
        source_dir.join("notes.json"),
        r#"{
            "display_name": "Notes",
            "alias": "memo",
            "columns": {
                "author": {
                    "association": { "target_table": "users", "target_column": "id", "type": "MANY_TO_ONE" }
                }
            }
        }"#,
    )
    .unwrap();

    let ctx = shop();
    let notes = ctx.schema().get_table("notes").unwrap().id;
    let users = ctx.schema().get_table("users").unwrap().id;
    assert!(ctx.schema().get_relationships(notes, users).is_empty());

    let configs = load_table_configs(dir.path(), "main").unwrap();
    let ctx = ctx.with_table_configs(configs).unwrap();
    let schema = ctx.schema();
    assert_eq!(schema.get_table("memo").map(|t| t.name.as_str()), Some("notes"));
    assert_eq!(schema.get_table("notes").unwrap().display_name, "Notes");
    assert_eq!(schema.get_relationships(notes, users).len(), 1);

    ctx.connection()
        .execute("INSERT INTO notes (id, author, body) VALUES (1, 2, 'hi')", [])
        .unwrap();
    let summary = run(
        &ctx,
        json!({"select": "memo", "join": "users", "fields": ["body", "users.name"]}),
    );
    assert_eq!(summary.data(), json!([{"body": "hi", "users__name": "bob"}]));
}

#[test]
fn test_refresh_keeps_table_configs() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("main")).unwrap();
    fs::write(dir.path().join("main").join("notes.json"), r#"{"alias": "memo"}"#).unwrap();

    let ctx = shop()
        .with_table_configs(load_table_configs(dir.path(), "main").unwrap())
        .unwrap();
    let before = ctx.registry().generation();

    ctx.connection()
        .execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT)")
        .unwrap();
    ctx.refresh_schema().unwrap();

    let schema = ctx.schema();
    assert!(schema.get_table("tags").is_some());
    assert!(schema.get_table("memo").is_some());
    assert_eq!(ctx.registry().generation(), before + 1);
}
