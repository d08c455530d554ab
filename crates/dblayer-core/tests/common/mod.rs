#![allow(dead_code)]

use dblayer_core::{Dialect, ParameterizedSql, PlaceholderStyle};

/// Counts placeholders the way a driver would see them, ignoring quoted
/// identifiers and literals.
pub fn placeholder_count(dialect: Dialect, sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '?' if dialect.features().placeholder == PlaceholderStyle::Question => count += 1,
            '$' if dialect.features().placeholder == PlaceholderStyle::Numbered => {
                if chars.peek().is_some_and(char::is_ascii_digit) {
                    count += 1;
                }
            }
            _ => {}
        }
    }
    count
}

/// Asserts that the statement binds exactly as many arguments as it has
/// placeholders, and that Postgres placeholders run `$1..$n`.
pub fn assert_balanced(dialect: Dialect, stmt: &ParameterizedSql) {
    assert_eq!(
        placeholder_count(dialect, &stmt.sql),
        stmt.args.len(),
        "placeholder mismatch on {dialect}: {}",
        stmt.sql
    );
    if dialect == Dialect::Postgres {
        for i in 1..=stmt.args.len() {
            assert!(
                stmt.sql.contains(&format!("${i}")),
                "missing ${i} in {}",
                stmt.sql
            );
        }
    }
}
