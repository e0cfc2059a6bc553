//! Query string parameters of table requests

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::property::{Property, parse_property_list};

pub const DEFAULT_LIMIT: i64 = 20;
pub const DEFAULT_OFFSET: i64 = 0;

/// `props`, `filters`, `groupby`, `orderby`, `limit`, `offset` and `meta`.
/// `filters` may repeat; for the other keys the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub props: Option<String>,
    pub filters: Vec<String>,
    pub groupby: Option<String>,
    pub orderby: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub meta: Option<String>,
}

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "props" => params.props = Some(value),
                "filters" => params.filters.push(value),
                "groupby" => params.groupby = Some(value),
                "orderby" => params.orderby = Some(value),
                "limit" => params.limit = Some(value),
                "offset" => params.offset = Some(value),
                "meta" => params.meta = Some(value),
                _ => {}
            }
        }
        params
    }

    pub fn props(&self, table: &str) -> Vec<Property> {
        list(self.props.as_deref(), table)
    }

    pub fn groupby(&self, table: &str) -> Vec<Property> {
        list(self.groupby.as_deref(), table)
    }

    pub fn orderby(&self, table: &str) -> Vec<Property> {
        list(self.orderby.as_deref(), table)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_OFFSET)
    }

    /// Enabled unless explicitly `f`, `F`, `false` or `0`.
    pub fn meta(&self) -> bool {
        !matches!(self.meta.as_deref(), Some("f" | "F" | "false" | "0"))
    }
}

fn list(value: Option<&str>, table: &str) -> Vec<Property> {
    value
        .map(|s| parse_property_list(s, table))
        .unwrap_or_default()
}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_query(parts.uri.query().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn paging_defaults() {
        let params = QueryParams::from_query("");
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 20);

        let params = QueryParams::from_query("limit=abc&offset=x1");
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 20);

        let params = QueryParams::from_query("limit=5&offset=10");
        assert_eq!(params.offset(), 10);
        assert_eq!(params.limit(), 5);
    }

    #[test]
    fn meta_flag() {
        assert!(QueryParams::from_query("").meta());
        assert!(QueryParams::from_query("meta=yes").meta());
        assert!(QueryParams::from_query("meta=1").meta());
        for off in ["f", "F", "false", "0"] {
            assert!(!QueryParams::from_query(&format!("meta={off}")).meta());
        }
    }

    #[test]
    fn filters_repeat_and_decode() {
        let params = QueryParams::from_query("filters=tag_name%3Dprod&filters=tag_data+x&props=a,b");
        assert_eq!(params.filters, vec!["tag_name=prod", "tag_data x"]);
        assert_eq!(
            params.props("tags"),
            vec![Property::new("tags", "a"), Property::new("tags", "b")]
        );
        assert!(params.groupby("tags").is_empty());
    }
}
