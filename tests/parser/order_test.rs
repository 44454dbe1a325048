use jsonql::parser::parse_order;
use jsonql::sql::SortDir;
use jsonql::Error;

#[test]
fn test_prefix_forms() {
    assert_eq!(
        parse_order("-o.created_at").unwrap(),
        ("o.created_at".to_string(), SortDir::Desc)
    );
    assert_eq!(
        parse_order("+o.created_at").unwrap(),
        ("o.created_at".to_string(), SortDir::Asc)
    );
}

#[test]
fn test_keyword_forms() {
    assert_eq!(parse_order("total desc").unwrap(), ("total".to_string(), SortDir::Desc));
    assert_eq!(parse_order("total Asc").unwrap(), ("total".to_string(), SortDir::Asc));
}

#[test]
fn test_default_is_ascending() {
    assert_eq!(parse_order(" total ").unwrap(), ("total".to_string(), SortDir::Asc));
}

#[test]
fn test_unknown_trailing_word_stays_in_column() {
    let (column, dir) = parse_order("total sideways").unwrap();
    assert_eq!(column, "total sideways");
    assert_eq!(dir, SortDir::Asc);
}

#[test]
fn test_empty_column_is_rejected() {
    let err = parse_order("-").unwrap_err();
    assert!(matches!(err, Error::InvalidOrder(_)));
    assert_eq!(err.to_string(), "invalid order condition: -");
}
