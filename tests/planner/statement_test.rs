use jsonql::action::{Connector, FilterItem, FilterValue, Operator, Value};
use jsonql::metadata::{AssociationType, ColumnType, SchemaBuilder, SchemaSnapshot};
use jsonql::{Action, Dialect, Error, Parser};
use serde_json::json;

fn library() -> SchemaSnapshot {
    let mut builder = SchemaBuilder::new("library");

    let authors = builder.add_table("authors", None);
    let author_id = builder.add_column(authors, "id", ColumnType::Integer, false);
    builder.set_primary_key(author_id);
    builder.add_column(authors, "name", ColumnType::Text, false);

    let books = builder.add_table("books", None);
    let book_id = builder.add_column(books, "id", ColumnType::Integer, false);
    builder.set_primary_key(book_id);
    let book_author = builder.add_column(books, "author_id", ColumnType::Integer, false);
    builder.add_column(books, "title", ColumnType::Text, false);
    builder.add_column(books, "year", ColumnType::Integer, true);

    builder.relate(book_author, author_id, AssociationType::ManyToOne);
    builder.build()
}

fn parse(dialect: Dialect, request: serde_json::Value) -> Action {
    let schema = library();
    Parser::new(&schema, dialect).parse(&request).unwrap()
}

#[test]
fn test_build_is_cached_until_rebuild() {
    let mut action = parse(
        Dialect::Sqlite,
        json!({"select": "books", "fields": "title", "where": "year>2000"}),
    );
    let first = action.build().unwrap().clone();
    assert!(action.is_built());

    let title = action.column_items()[0].clone();
    action.add_filter_item(FilterItem::Condition {
        connector: Connector::And,
        column: title,
        operator: Operator::Like,
        value: FilterValue::Single("%rust%".into()),
    });

    // The cached statement does not see the new filter.
    assert_eq!(action.build().unwrap(), &first);

    let rebuilt = action.rebuild().unwrap();
    assert_eq!(
        rebuilt.sql,
        "SELECT\n  \"books\".\"title\"\nFROM \"books\"\nWHERE \"books\".\"year\" > ? AND \"books\".\"title\" LIKE ?"
    );
    assert_eq!(
        rebuilt.params,
        vec![Value::Int(2000), Value::Text("%rust%".into())]
    );
}

#[test]
fn test_count_keeps_joins_and_filters() {
    let action = parse(
        Dialect::Postgres,
        json!({
            "select": "books b",
            "join": "authors",
            "fields": ["b.title", "authors.name"],
            "where": "authors.name=ann",
            "order": "b.title",
            "limit": [20, 30]
        }),
    );

    let count = action.count().unwrap();
    assert_eq!(
        count.sql,
        "SELECT\n  COUNT(*)\nFROM \"books\" AS \"b\"\n\
         LEFT JOIN \"authors\" ON \"b\".\"author_id\" = \"authors\".\"id\"\n\
         WHERE \"authors\".\"name\" = $1"
    );
    assert_eq!(count.params, vec![Value::Text("ann".into())]);
}

#[test]
fn test_grouped_count_wraps_derived_table() {
    let action = parse(
        Dialect::Sqlite,
        json!({"select": "books", "fields": ["author_id", "count(*) n"], "group": "author_id"}),
    );

    let count = action.count().unwrap();
    assert!(count.sql.starts_with("SELECT\n  COUNT(*)\nFROM (SELECT\n"));
    assert!(count.sql.contains("GROUP BY \"books\".\"author_id\""));
    assert!(count.sql.ends_with(") AS \"count_result\""));
}

#[test]
fn test_mysql_quoting() {
    let mut action = parse(
        Dialect::MySql,
        json!({"select": "authors", "fields": "name", "where": "id!=4"}),
    );
    let stmt = action.build().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT\n  `authors`.`name`\nFROM `authors`\nWHERE `authors`.`id` <> ?"
    );
    assert_eq!(stmt.params, vec![Value::Int(4)]);
}

#[test]
fn test_tsql_pagination_without_order() {
    let mut action = parse(
        Dialect::TSql,
        json!({"select": "authors", "fields": "name", "where": "name=ann", "limit": [0, 10]}),
    );
    let stmt = action.build().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT\n  [authors].[name]\nFROM [authors]\nWHERE [authors].[name] = @p1\n\
         ORDER BY (SELECT NULL)\nOFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
    );
}

#[test]
fn test_empty_window_keeps_offset() {
    let mut action = parse(
        Dialect::Sqlite,
        json!({"select": "authors", "fields": "name", "limit": [5, 5]}),
    );
    let stmt = action.build().unwrap();
    assert!(stmt.sql.ends_with("LIMIT 0 OFFSET 5"));
}

#[test]
fn test_update_binds_values_before_filters() {
    let mut action = parse(
        Dialect::Postgres,
        json!({"update": "books", "values": {"year": "1999", "title": "Dune"}, "where": "id=7"}),
    );
    let stmt = action.build().unwrap();
    assert!(stmt.sql.starts_with("UPDATE \"books\" SET "));
    assert!(stmt.sql.ends_with("WHERE \"books\".\"id\" = $3"));
    assert_eq!(stmt.params.last(), Some(&Value::Int(7)));
    assert_eq!(stmt.params.len(), 3);
}

#[test]
fn test_full_join_follows_dialect_support() {
    let request = json!({"select": "books", "join": {"full": "authors"}, "fields": "title"});

    let mut postgres = parse(Dialect::Postgres, request.clone());
    assert!(postgres
        .build()
        .unwrap()
        .sql
        .contains("FULL OUTER JOIN \"authors\" ON \"books\".\"author_id\" = \"authors\".\"id\""));

    let mut mysql = parse(Dialect::MySql, request);
    let err = mysql.build().unwrap_err();
    assert!(matches!(err, Error::UnsupportedJoinType(_)));
    assert_eq!(err.to_string(), "Unsupported join type[full]");
    assert!(mysql.count().is_err());
}
