use jsonql::action::{ColumnTarget, Connector, FilterItem, JoinKind, Operation, TableKind, Value};
use jsonql::metadata::{AssociationType, ColumnType, SchemaBuilder, SchemaSnapshot};
use jsonql::{Dialect, Error, ErrorKind, Parser};
use serde_json::json;

/// users <- orders (orders.user_id -> users.id), plus a JSON column on users.
fn shop_schema() -> SchemaSnapshot {
    let mut builder = SchemaBuilder::new("shop");

    let users = builder.add_table("users", None);
    let user_id = builder.add_column(users, "id", ColumnType::Integer, false);
    builder.set_primary_key(user_id);
    builder.add_column(users, "name", ColumnType::Text, true);
    builder.add_column(users, "age", ColumnType::Integer, true);
    builder.add_column(users, "profile", ColumnType::Json, true);

    let orders = builder.add_table("orders", None);
    let order_id = builder.add_column(orders, "id", ColumnType::Integer, false);
    builder.set_primary_key(order_id);
    let order_user = builder.add_column(orders, "user_id", ColumnType::Integer, false);
    builder.add_column(orders, "total", ColumnType::Real, true);
    builder.add_column(orders, "status", ColumnType::Text, true);

    builder.relate(order_user, user_id, AssociationType::ManyToOne);
    builder.build()
}

#[test]
fn test_full_select_renders() {
    let schema = shop_schema();
    let mut action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({
            "select": "orders o",
            "join": "users",
            "fields": ["o.id", "users.name", "count(*) total"],
            "where": ["o.total>=100", {"or": "status=open,pending"}],
            "group": ["o.id", "users.name"],
            "order": "-o.id",
            "limit": [0, 10]
        }))
        .unwrap();

    assert_eq!(action.operation(), Operation::Select);
    assert_eq!(action.source(), None);

    let stmt = action.build().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT\n  \"o\".\"id\",\n  \"users\".\"name\" AS \"users__name\",\n  count(*) AS \"total\"\n\
         FROM \"orders\" AS \"o\"\n\
         LEFT JOIN \"users\" ON \"o\".\"user_id\" = \"users\".\"id\"\n\
         WHERE \"o\".\"total\" >= ? OR \"o\".\"status\" IN (?, ?)\n\
         GROUP BY \"o\".\"id\", \"users\".\"name\"\n\
         ORDER BY \"o\".\"id\" DESC\n\
         LIMIT 10 OFFSET 0"
    );
    assert_eq!(
        stmt.params,
        vec![
            Value::Float(100.0),
            Value::Text("open".into()),
            Value::Text("pending".into())
        ]
    );
}

#[test]
fn test_source_prefix_is_recorded() {
    let schema = shop_schema();
    let action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"query": "shop.users"}))
        .unwrap();
    assert_eq!(action.source(), Some("shop"));
    assert_eq!(action.primary_table_item().map(|t| t.name.as_str()), Some("users"));
}

#[test]
fn test_default_projection_is_every_column() {
    let schema = shop_schema();
    let action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"select": "users"}))
        .unwrap();
    let names: Vec<&str> = action.column_items().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "age", "profile"]);
}

#[test]
fn test_star_includes_requested_join_tables() {
    let schema = shop_schema();
    let action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"select": "orders", "join": {"inner": "users"}, "fields": "*"}))
        .unwrap();

    assert_eq!(action.join_items()[0].kind, JoinKind::Inner);
    let keys: Vec<&str> = action.column_items().iter().map(|c| c.result_key()).collect();
    assert_eq!(
        keys,
        vec![
            "id",
            "user_id",
            "total",
            "status",
            "users__id",
            "users__name",
            "users__age",
            "users__profile"
        ]
    );
}

#[test]
fn test_table_star_and_unknown_table_star() {
    let schema = shop_schema();
    let parser = Parser::new(&schema, Dialect::Sqlite);

    let action = parser
        .parse(&json!({"select": "orders o", "join": "users", "fields": "users.*"}))
        .unwrap();
    assert_eq!(action.column_items().len(), 4);
    assert!(action
        .column_items()
        .iter()
        .all(|c| matches!(c.target, ColumnTarget::JoinColumn { .. })));

    let err = parser
        .parse(&json!({"select": "orders", "fields": "regions.*"}))
        .unwrap_err();
    assert!(matches!(err, Error::TableNotFound(ref t) if t == "regions"));
}

#[test]
fn test_alias_forms_in_fields() {
    let schema = shop_schema();
    let action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"select": "users", "fields": ["name AS who", "age years", "upper(name)"]}))
        .unwrap();

    let items = action.column_items();
    assert_eq!(items[0].alias.as_deref(), Some("who"));
    assert!(items[0].custom_alias);
    assert_eq!(items[1].alias.as_deref(), Some("years"));
    assert!(items[2].is_expression());
    assert_eq!(items[2].alias, None);
}

#[test]
fn test_where_reuses_projection_alias() {
    let schema = shop_schema();
    let mut action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"select": "users", "fields": "age years", "where": "years>30"}))
        .unwrap();
    let stmt = action.build().unwrap();
    assert!(stmt.sql.ends_with("WHERE \"users\".\"age\" > ?"));
    assert_eq!(stmt.params, vec![Value::Int(30)]);
}

#[test]
fn test_nested_filter_groups() {
    let schema = shop_schema();
    let action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({
            "select": "users",
            "where": ["age>18", {"or": ["name=ann", "name=bob"]}]
        }))
        .unwrap();

    let filters = action.filter_items();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0].connector(), Connector::And);
    match &filters[1] {
        FilterItem::Group { connector, items } => {
            assert_eq!(*connector, Connector::Or);
            assert_eq!(items.len(), 2);
        }
        other => panic!("expected group, got {other:?}"),
    }
}

#[test]
fn test_null_attribute_is_rejected() {
    let schema = shop_schema();
    let err = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"select": "users", "where": null}))
        .unwrap_err();
    assert_eq!(err.to_string(), "where node value is null");
    assert_eq!(err.kind(), ErrorKind::MalformedRequest);
}

#[test]
fn test_malformed_nodes() {
    let schema = shop_schema();
    let parser = Parser::new(&schema, Dialect::Sqlite);

    let err = parser
        .parse(&json!({"select": "users", "fields": {"name": true}}))
        .unwrap_err();
    assert_eq!(err.to_string(), "fields node cannot be an object");

    let err = parser
        .parse(&json!({"select": "orders", "join": [["users"]]}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Join child node cannot be an array");

    let err = parser
        .parse(&json!({"select": "orders", "join": {"cross": "users"}}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Unsupported join type[cross]");

    let err = parser
        .parse(&json!({"select": "users", "limit": [5]}))
        .unwrap_err();
    assert_eq!(err.to_string(), "limit node must be an array");

    let err = parser
        .parse(&json!({"select": "users", "where": {"xor": "age=1"}}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Unsupported connector[xor]");
}

#[test]
fn test_unknown_schema_entities() {
    let schema = shop_schema();
    let parser = Parser::new(&schema, Dialect::Sqlite);

    let err = parser.parse(&json!({"select": "invoices"})).unwrap_err();
    assert!(matches!(err, Error::TableNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::Schema);

    let err = parser
        .parse(&json!({"select": "users", "fields": "users.email"}))
        .unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(ref c) if c == "users.email"));
}

#[test]
fn test_unvalidated_dialect_keeps_unknown_table() {
    let schema = shop_schema();
    let mut action = Parser::new(&schema, Dialect::Ansi)
        .parse(&json!({"select": "audit_log", "where": "level=error"}))
        .unwrap();

    let table = action.primary_table_item().unwrap();
    assert!(table.is_expression());
    assert_eq!(table.kind, TableKind::Main);
    let stmt = action.build().unwrap();
    assert!(stmt.sql.starts_with("SELECT\n  *\nFROM \"audit_log\""));
}

#[test]
fn test_insert_values() {
    let schema = shop_schema();
    let mut action = Parser::new(&schema, Dialect::Postgres)
        .parse(&json!({
            "insert": "users",
            "values": {"name": "ann", "profile": "{\"tier\":1}", "nickname": "skipped"}
        }))
        .unwrap();

    let names: Vec<&str> = action.values().iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["name", "profile"]);
    assert_eq!(action.values()[1].value, Value::Json("{\"tier\":1}".into()));

    let stmt = action.build().unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO \"users\" (\"name\", \"profile\") VALUES ($1, $2::json)"
    );
}

#[test]
fn test_write_ignores_table_alias() {
    let schema = shop_schema();
    let mut action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"delete": "users u", "where": "id=3"}))
        .unwrap();
    let stmt = action.build().unwrap();
    assert_eq!(stmt.sql, "DELETE FROM \"users\" WHERE \"users\".\"id\" = ?");
    assert_eq!(stmt.params, vec![Value::Int(3)]);
}

#[test]
fn test_file_and_template_hints() {
    let schema = shop_schema();
    let action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({"select": "orders", "file": "csv", "template": "monthly"}))
        .unwrap();
    assert_eq!(action.filename().as_deref(), Some("orders.csv"));
    assert_eq!(action.template(), Some("monthly"));
}

#[test]
fn test_transaction_children() {
    let schema = shop_schema();
    let parser = Parser::new(&schema, Dialect::Sqlite);

    let action = parser
        .parse(&json!({"transaction": [
            {"insert": "users", "values": {"name": "ann"}},
            {"update": "users", "values": {"age": 31}, "where": "name=ann"}
        ]}))
        .unwrap();
    assert_eq!(action.operation(), Operation::Transaction);
    let ops: Vec<Operation> = action
        .transaction_actions()
        .iter()
        .map(|a| a.operation())
        .collect();
    assert_eq!(ops, vec![Operation::Insert, Operation::Update]);

    let err = parser
        .parse(&json!({"transaction": [{"transaction": []}]}))
        .unwrap_err();
    assert_eq!(err.to_string(), "transactions cannot be nested");
}

#[test]
fn test_struct_requires_known_table() {
    let schema = shop_schema();
    let parser = Parser::new(&schema, Dialect::Sqlite);
    let action = parser.parse(&json!({"struct": "orders"})).unwrap();
    assert_eq!(action.operation(), Operation::Struct);

    let err = parser.parse(&json!({"struct": "ghosts"})).unwrap_err();
    assert!(matches!(err, Error::TableNotFound(_)));
}

#[test]
fn test_bare_name_prefers_main_table_over_projected_join_column() {
    let schema = shop_schema();
    let mut action = Parser::new(&schema, Dialect::Sqlite)
        .parse(&json!({
            "select": "orders",
            "join": "users",
            "fields": ["users.id", "orders.user_id"],
            "where": "id=1",
            "order": "id"
        }))
        .unwrap();

    let stmt = action.build().unwrap();
    assert!(
        stmt.sql.ends_with("WHERE \"orders\".\"id\" = ?\nORDER BY \"orders\".\"id\" ASC"),
        "{}",
        stmt.sql
    );
}
