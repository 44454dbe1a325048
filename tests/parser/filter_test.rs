use jsonql::action::{FilterValue, Operator};
use jsonql::parser::parse_condition;
use jsonql::{Error, ErrorKind};

fn single(v: &str) -> FilterValue {
    FilterValue::Single(v.to_string())
}

fn many(vs: &[&str]) -> FilterValue {
    FilterValue::Many(vs.iter().map(|v| v.to_string()).collect())
}

#[test]
fn test_qualified_column() {
    let cond = parse_condition("o.total>=100").unwrap();
    assert_eq!(cond.column, "o.total");
    assert_eq!(cond.operator, Operator::Gte);
    assert_eq!(cond.value, single("100"));

    let cond = parse_condition("sales.orders.status=open").unwrap();
    assert_eq!(cond.column, "sales.orders.status");
    assert_eq!(cond.value, single("open"));
}

#[test]
fn test_first_operator_wins() {
    // Everything after the operator belongs to the value.
    let cond = parse_condition("query=a=b").unwrap();
    assert_eq!(cond.column, "query");
    assert_eq!(cond.operator, Operator::Equal);
    assert_eq!(cond.value, single("a=b"));

    let cond = parse_condition("expr<=x>y").unwrap();
    assert_eq!(cond.operator, Operator::Lte);
    assert_eq!(cond.value, single("x>y"));
}

#[test]
fn test_list_takes_precedence_over_range() {
    let cond = parse_condition("tags=a,b~c").unwrap();
    assert_eq!(cond.operator, Operator::In);
    assert_eq!(cond.value, many(&["a", "b~c"]));
}

#[test]
fn test_between_dates() {
    let cond = parse_condition("created_at=2024-01-01~2024-12-31").unwrap();
    assert_eq!(cond.operator, Operator::Between);
    assert_eq!(cond.value, many(&["2024-01-01", "2024-12-31"]));
}

#[test]
fn test_like_patterns_are_kept() {
    let cond = parse_condition("name%=%smith%").unwrap();
    assert_eq!(cond.operator, Operator::Like);
    assert_eq!(cond.value, single("%smith%"));

    let cond = parse_condition("name!%=a_%").unwrap();
    assert_eq!(cond.operator, Operator::NotLike);
    assert_eq!(cond.value, single("a_%"));
}

#[test]
fn test_bang_without_operator_is_part_of_column() {
    let cond = parse_condition("n!x=1").unwrap();
    assert_eq!(cond.column, "n!x");
    assert_eq!(cond.operator, Operator::Equal);
}

#[test]
fn test_empty_value_is_equal_to_empty_string() {
    let cond = parse_condition("name=").unwrap();
    assert_eq!(cond.operator, Operator::Equal);
    assert_eq!(cond.value, single(""));
}

#[test]
fn test_null_is_case_insensitive() {
    assert_eq!(parse_condition("deleted_at=Null").unwrap().operator, Operator::Null);
    assert_eq!(
        parse_condition("deleted_at != null").unwrap().operator,
        Operator::NotNull
    );
}

#[test]
fn test_invalid_condition_error() {
    let err = parse_condition("total").unwrap_err();
    assert!(matches!(err, Error::InvalidFilter(ref text) if text == "total"));
    assert_eq!(err.kind(), ErrorKind::MalformedRequest);
    assert_eq!(err.to_string(), "invalid filter condition: total");
}
