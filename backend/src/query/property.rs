//! Property specifiers
//!
//! A property names a column of a table, as written in the `props`,
//! `groupby` and `orderby` query parameters:
//!
//! ```text
//! [~][table.]column[:alias]
//! ```
//!
//! `~` marks a descending sort key, `table.` defaults to the table the
//! specifier is parsed for, and `:alias` renames the column in the output.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// A reference to `table.column`, with an optional output alias and sort
/// direction. Equality and hashing only consider the table and column.
#[derive(Debug, Clone, Default)]
pub struct Property {
    pub table: String,
    pub name: String,
    pub remap: Option<String>,
    pub desc: bool,
}

impl Property {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            remap: None,
            desc: false,
        }
    }

    /// An inert property, produced by empty specifiers.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Quoted `"table"."column"` expression.
    pub fn sql(&self) -> String {
        if self.table.is_empty() {
            quote_ident(&self.name)
        } else {
            format!("{}.{}", quote_ident(&self.table), quote_ident(&self.name))
        }
    }

    /// The SQL expression followed by `DESC` for descending sort keys.
    pub fn sql_with_order(&self) -> String {
        if self.desc {
            format!("{} DESC", self.sql())
        } else {
            self.sql()
        }
    }

    /// The externally visible name of this property for a request on
    /// `base_table`: columns of the base table are bare, others qualified.
    pub fn label(&self, base_table: &str) -> String {
        if self.table == base_table {
            self.name.clone()
        } else {
            self.to_string()
        }
    }

    /// Output key of the property in a result row.
    pub fn alias(&self, base_table: &str) -> String {
        match &self.remap {
            Some(remap) => remap.clone(),
            None => self.label(base_table),
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.name == other.name
    }
}

impl Eq for Property {}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.table.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.table, self.name)
        }
    }
}

impl Serialize for Property {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a single property specifier, defaulting the table to `default_table`.
pub fn parse_property(specifier: &str, default_table: &str) -> Property {
    let mut prop = Property::default();

    let mut s = specifier.trim();
    if let Some(rest) = s.strip_prefix('~') {
        prop.desc = true;
        s = rest.trim_start_matches('~');
    }
    if s.is_empty() {
        return prop;
    }

    if let Some((head, remap)) = s.split_once(':') {
        if !remap.is_empty() {
            prop.remap = Some(remap.to_string());
        }
        s = head;
    }

    match s.split_once('.') {
        Some((table, name)) => {
            prop.table = table.to_string();
            prop.name = name.to_string();
        }
        None => {
            prop.table = default_table.to_string();
            prop.name = s.to_string();
        }
    }

    prop
}

/// Parse a comma separated list of specifiers, dropping empty entries.
pub fn parse_property_list(list: &str, default_table: &str) -> Vec<Property> {
    list.split(',')
        .map(|s| parse_property(s, default_table))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Quote an SQL identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bare_column_with_default_table() {
        let p = parse_property("tag_name", "tags");
        assert_eq!(p.table, "tags");
        assert_eq!(p.name, "tag_name");
        assert_eq!(p.remap, None);
        assert!(!p.desc);
    }

    #[test]
    fn parses_qualified_alias_and_desc() {
        let p = parse_property("~nodes.nodename:host", "tags");
        assert_eq!(p.table, "nodes");
        assert_eq!(p.name, "nodename");
        assert_eq!(p.remap.as_deref(), Some("host"));
        assert!(p.desc);
        assert_eq!(p.sql_with_order(), r#""nodes"."nodename" DESC"#);
    }

    #[test]
    fn empty_specifiers_are_inert() {
        assert!(parse_property("", "tags").is_empty());
        assert!(parse_property("~", "tags").is_empty());
        assert_eq!(
            parse_property_list("tag_name,,nodes.nodename,", "tags"),
            vec![Property::new("tags", "tag_name"), Property::new("nodes", "nodename")]
        );
    }

    #[test]
    fn display_round_trips() {
        let props = [
            Property::new("tags", "tag_name"),
            Property::new("nodes", "nodename"),
            Property::new("auth_user", "first.name"),
        ];
        for p in props {
            assert_eq!(parse_property(&p.to_string(), "other"), p);
        }

        let p = parse_property("~nodes.nodename:host", "x");
        let again = parse_property(&format!("~{}:host", p), "y");
        assert_eq!(again, p);
        assert_eq!(again.remap, p.remap);
        assert_eq!(again.desc, p.desc);
    }

    #[test]
    fn equality_ignores_alias_and_direction() {
        let a = parse_property("~tags.tag_name:name", "tags");
        let b = parse_property("tag_name", "tags");
        assert_eq!(a, b);
    }

    #[test]
    fn labels_are_relative_to_base_table() {
        let own = parse_property("tag_name", "tags");
        let other = parse_property("nodes.nodename", "tags");
        assert_eq!(own.label("tags"), "tag_name");
        assert_eq!(other.label("tags"), "nodes.nodename");
        assert_eq!(parse_property("tag_name:name", "tags").alias("tags"), "name");
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(Property::new("tags", "tag_name").sql(), r#""tags"."tag_name""#);
        assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
    }
}
