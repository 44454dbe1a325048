use jsonql::action::{Action, JoinKind, Operation, TableItem, TableItemId, TableKind};
use jsonql::metadata::{AssociationType, SchemaBuilder, SchemaProvider, SchemaSnapshot};
use jsonql::planner::{JoinBuilder, JoinRequest};
use jsonql::{Dialect, ErrorKind};

/// Tables a, b, c with the given `table.column -> table.column` edges.
fn graph(edges: &[(&str, &str)]) -> SchemaSnapshot {
    let mut builder = SchemaBuilder::new("main");
    builder.table("a", &["id", "b_id", "c_id"]);
    builder.table("b", &["id", "c_id"]);
    builder.table("c", &["id"]);
    for (primary, foreign) in edges {
        builder
            .relate_names(primary, foreign, AssociationType::ManyToOne)
            .unwrap();
    }
    builder.build()
}

fn select_from(schema: &SchemaSnapshot, table: &str) -> (Action, TableItemId) {
    let table = schema.get_table(table).unwrap();
    let mut action = Action::new(Operation::Select, Dialect::Sqlite);
    let primary = action.add_table_item(TableItem {
        table: Some(table.id),
        name: table.name.clone(),
        display_name: table.display_name.clone(),
        schema: None,
        alias: None,
        custom_alias: false,
        kind: TableKind::Main,
    });
    (action, primary)
}

fn join(schema: &SchemaSnapshot, table: &str, kind: JoinKind) -> JoinRequest {
    JoinRequest::new(schema.get_table(table).unwrap().id, kind)
}

/// Names of the joined tables, in join order.
fn joined_tables(action: &Action) -> Vec<String> {
    action
        .join_items()
        .iter()
        .filter_map(|j| j.right_table_item())
        .map(|id| action.table_item(id).name.clone())
        .collect()
}

#[test]
fn test_closure_prefers_path_through_requested_tables() {
    let schema = graph(&[("a.b_id", "b.id"), ("a.c_id", "c.id"), ("b.c_id", "c.id")]);
    let (mut action, primary) = select_from(&schema, "a");

    JoinBuilder::new(&schema)
        .build(
            &mut action,
            primary,
            &[join(&schema, "b", JoinKind::Left), join(&schema, "c", JoinKind::Left)],
        )
        .unwrap();

    assert_eq!(joined_tables(&action), vec!["b", "c"]);
    let b_item = action.join_items()[0].right_table_item();
    assert_eq!(action.join_items()[0].left_table_item(), Some(primary));
    // c hangs off the b item, not off a.
    assert_eq!(action.join_items()[1].left_table_item(), b_item);

    let stmt = action.build().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT\n  *\nFROM \"a\"\n\
         LEFT JOIN \"b\" ON \"a\".\"b_id\" = \"b\".\"id\"\n\
         LEFT JOIN \"c\" ON \"b\".\"c_id\" = \"c\".\"id\""
    );
}

#[test]
fn test_shortest_path_when_intermediate_not_requested() {
    let schema = graph(&[("a.b_id", "b.id"), ("a.c_id", "c.id"), ("b.c_id", "c.id")]);
    let (mut action, primary) = select_from(&schema, "a");

    JoinBuilder::new(&schema)
        .build(&mut action, primary, &[join(&schema, "c", JoinKind::Left)])
        .unwrap();

    assert_eq!(joined_tables(&action), vec!["c"]);
    assert_eq!(action.join_items()[0].left_table_item(), Some(primary));
    assert_eq!(action.relationship_paths().len(), 1);
    assert_eq!(action.relationship_paths()[0].len(), 1);
}

#[test]
fn test_request_order_is_not_silently_reordered() {
    let schema = graph(&[("a.b_id", "b.id"), ("b.c_id", "c.id")]);
    let (mut action, primary) = select_from(&schema, "a");

    JoinBuilder::new(&schema)
        .build(
            &mut action,
            primary,
            &[join(&schema, "c", JoinKind::Inner), join(&schema, "b", JoinKind::Left)],
        )
        .unwrap();

    // The only path to c runs through b; the b join is shared with the
    // request for b itself.
    assert_eq!(joined_tables(&action), vec!["b", "c"]);
    assert_eq!(action.join_items()[0].kind, JoinKind::Left);
    assert_eq!(action.join_items()[1].kind, JoinKind::Inner);
    assert_eq!(action.relationship_paths().len(), 2);
}

#[test]
fn test_resolve_paths_respects_order() {
    let schema = graph(&[("a.b_id", "b.id"), ("b.c_id", "c.id")]);
    let a = schema.get_table("a").unwrap().id;
    let builder = JoinBuilder::new(&schema);

    let paths = builder
        .resolve_paths(
            a,
            &[join(&schema, "b", JoinKind::Left), join(&schema, "c", JoinKind::Left)],
        )
        .unwrap();
    let lengths: Vec<usize> = paths.iter().map(|p| p.len()).collect();
    assert_eq!(lengths, vec![1, 2]);
}

#[test]
fn test_no_path_is_an_association_error() {
    let schema = graph(&[("a.b_id", "b.id")]);
    let (mut action, primary) = select_from(&schema, "a");

    let err = JoinBuilder::new(&schema)
        .build(&mut action, primary, &[join(&schema, "c", JoinKind::Left)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Relationship);
    assert_eq!(
        err.to_string(),
        "Association relation not found for the table [a] and [c]"
    );
    assert!(action.join_items().is_empty());
}

fn parallel_edges() -> SchemaSnapshot {
    let mut builder = SchemaBuilder::new("main");
    builder.table("a", &["id", "b_id", "b_code"]);
    builder.table("b", &["id", "code"]);
    builder
        .relate_names("a.b_id", "b.id", AssociationType::ManyToOne)
        .unwrap();
    builder
        .relate_names("a.b_code", "b.code", AssociationType::ManyToOne)
        .unwrap();
    builder.build()
}

#[test]
fn test_parallel_relationships_join_separately() {
    let schema = parallel_edges();
    let (mut action, primary) = select_from(&schema, "a");

    JoinBuilder::new(&schema)
        .build(&mut action, primary, &[join(&schema, "b", JoinKind::Left)])
        .unwrap();

    assert_eq!(action.join_items().len(), 2);
    let second = action.join_items()[1].right_table_item().unwrap();
    assert_eq!(action.table_item(second).alias.as_deref(), Some("b1"));
}

#[test]
fn test_parallel_relationships_join_on_multi_column() {
    let schema = parallel_edges();
    let (mut action, primary) = select_from(&schema, "a");

    JoinBuilder::new(&schema)
        .join_on_multi_column(true)
        .build(&mut action, primary, &[join(&schema, "b", JoinKind::Left)])
        .unwrap();

    assert_eq!(action.join_items().len(), 1);
    assert_eq!(action.join_items()[0].conditions.len(), 2);
    let stmt = action.build().unwrap();
    assert!(stmt
        .sql
        .contains("LEFT JOIN \"b\" ON \"a\".\"b_id\" = \"b\".\"id\" AND \"a\".\"b_code\" = \"b\".\"code\""));
}
