//! Filter micro-language
//!
//! ```text
//! column <op> [!]value
//! ```
//!
//! Operators are `=`, `>`, `<`, `>=`, `<=`, `~` and a single space; the last
//! two mean `LIKE`. A leading `!` on the value negates the predicate, the
//! value `empty` matches NULL or empty strings, and a parenthesized value
//! `(a,b)` with `=`, `~` or space becomes an `IN` list.

use once_cell::sync::Lazy;
use regex::Regex;

use super::property::{Property, parse_property};
use super::value::SqlValue;

static RE_FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z_.]+)\s*(>=|<=|=|>|<|~| )\s*(.*)$").expect("valid filter regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    In,
}

impl FilterOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(FilterOp::Eq),
            ">" => Some(FilterOp::Gt),
            "<" => Some(FilterOp::Lt),
            ">=" => Some(FilterOp::Ge),
            "<=" => Some(FilterOp::Le),
            "~" | " " => Some(FilterOp::Like),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Ge => ">=",
            FilterOp::Le => "<=",
            FilterOp::Like => "LIKE",
            FilterOp::In => "IN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// The `empty` literal.
    Empty,
    Single(String),
    List(Vec<String>),
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: Property,
    pub op: FilterOp,
    pub value: FilterValue,
    pub negated: bool,
}

/// A WHERE fragment with `?` placeholders and its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub values: Vec<SqlValue>,
    pub negated: bool,
}

/// Parse a filter string. Returns `None` for strings outside the grammar.
pub fn parse_filter(s: &str, default_table: &str) -> Option<Filter> {
    let caps = RE_FILTER.captures(s)?;
    let (column, op, raw) = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(c), Some(o), Some(v)) => (c.as_str(), o.as_str(), v.as_str()),
        _ => return None,
    };

    let column = parse_property(column, default_table);
    if column.is_empty() {
        return None;
    }
    let mut op = FilterOp::from_token(op)?;

    let (negated, raw) = match raw.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let value = if raw == "empty" {
        FilterValue::Empty
    } else if matches!(op, FilterOp::Eq | FilterOp::Like)
        && raw.len() >= 2
        && raw.starts_with('(')
        && raw.ends_with(')')
    {
        op = FilterOp::In;
        let inner = &raw[1..raw.len() - 1];
        let items = inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        FilterValue::List(items)
    } else {
        FilterValue::Single(raw.to_string())
    };

    Some(Filter {
        column,
        op,
        value,
        negated,
    })
}

impl Filter {
    pub fn predicate(&self) -> Predicate {
        let col = self.column.sql();
        let (sql, values) = match &self.value {
            FilterValue::Empty => (
                format!("({col} IS NULL OR {col} = ?)"),
                vec![SqlValue::String(String::new())],
            ),
            FilterValue::List(items) if items.is_empty() => ("1 = 0".to_string(), Vec::new()),
            FilterValue::List(items) => {
                let placeholders = vec!["?"; items.len()].join(", ");
                (
                    format!("{col} IN ({placeholders})"),
                    items.iter().map(SqlValue::from).collect(),
                )
            }
            FilterValue::Single(v) => (
                format!("{col} {} ?", self.op.sql()),
                vec![SqlValue::from(v)],
            ),
        };

        Predicate {
            sql,
            values,
            negated: self.negated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pred(s: &str) -> Predicate {
        parse_filter(s, "apps").expect("filter should parse").predicate()
    }

    #[test]
    fn equality_with_spaces() {
        let p = pred("app = acme");
        assert_eq!(p.sql, r#""apps"."app" = ?"#);
        assert_eq!(p.values, vec![SqlValue::from("acme")]);
        assert!(!p.negated);
    }

    #[test]
    fn bang_negates() {
        let p = pred("app=!acme");
        assert_eq!(p.sql, r#""apps"."app" = ?"#);
        assert_eq!(p.values, vec![SqlValue::from("acme")]);
        assert!(p.negated);
    }

    #[test]
    fn tilde_and_space_mean_like() {
        let f = parse_filter("app~", "apps").unwrap();
        assert_eq!(f.op, FilterOp::Like);
        assert_eq!(f.value, FilterValue::Single(String::new()));

        let f = parse_filter("app ", "apps").unwrap();
        assert_eq!(f.op, FilterOp::Like);

        let p = pred("app ac%");
        assert_eq!(p.sql, r#""apps"."app" LIKE ?"#);
        assert_eq!(p.values, vec![SqlValue::from("ac%")]);
    }

    #[test]
    fn empty_literal() {
        let p = pred("app=empty");
        assert_eq!(p.sql, r#"("apps"."app" IS NULL OR "apps"."app" = ?)"#);
        assert!(!p.negated);
        assert!(pred("app=!empty").negated);
    }

    #[test]
    fn parenthesized_values_become_in_lists() {
        let f = parse_filter("app=(a,b)", "apps").unwrap();
        assert_eq!(f.op, FilterOp::In);
        let p = f.predicate();
        assert_eq!(p.sql, r#""apps"."app" IN (?, ?)"#);
        assert_eq!(p.values, vec![SqlValue::from("a"), SqlValue::from("b")]);

        assert_eq!(parse_filter("app (a, b)", "apps").unwrap().op, FilterOp::In);
        assert_eq!(pred("app=()").sql, "1 = 0");
        assert_eq!(parse_filter("id>(1,2)", "apps").unwrap().op, FilterOp::Gt);
    }

    #[test]
    fn two_character_operators_win() {
        let f = parse_filter("id>=5", "apps").unwrap();
        assert_eq!(f.op, FilterOp::Ge);
        assert_eq!(f.value, FilterValue::Single("5".to_string()));

        let f = parse_filter("id<=5", "apps").unwrap();
        assert_eq!(f.op, FilterOp::Le);

        let f = parse_filter("id<5", "apps").unwrap();
        assert_eq!(f.op, FilterOp::Lt);
    }

    #[test]
    fn qualified_columns_keep_their_table() {
        let p = pred("nodes.nodename=n1");
        assert_eq!(p.sql, r#""nodes"."nodename" = ?"#);
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert_eq!(parse_filter("???", "apps"), None);
        assert_eq!(parse_filter("", "apps"), None);
        assert_eq!(parse_filter("app", "apps"), None);
        assert_eq!(parse_filter("1=1; drop", "apps"), None);
    }
}
