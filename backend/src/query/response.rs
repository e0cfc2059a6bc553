//! Table response envelope

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize)]
pub struct TableResponse {
    pub data: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<TableResponseMeta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableResponseMeta {
    /// Matching rows before paging
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
    /// Rows in `data`
    pub count: usize,
    pub available_props: Vec<String>,
    pub included_props: Vec<String>,
}

impl TableResponse {
    /// Envelope without metadata.
    pub fn data(data: Vec<Map<String, Value>>) -> Self {
        Self { data, meta: None }
    }
}
