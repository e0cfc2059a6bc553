//! Dynamic relational query engine
//!
//! Turns the `props`, `filters`, `groupby`, `orderby`, `limit`, `offset` and
//! `meta` query parameters plus the caller's identity into a scoped, joined
//! and parameterized query against the registered tables, and serializes
//! the result into a [`TableResponse`].

pub mod acl;
pub mod builder;
pub mod error;
pub mod filter;
pub mod joins;
pub mod params;
pub mod property;
pub mod registry;
pub mod request;
pub mod response;
pub mod value;

pub use acl::{Caller, Identity, Intent};
pub use builder::{TableQuery, execute_with_binds};
pub use error::QueryError;
pub use joins::{JoinEdge, JoinGraph, Route};
pub use params::QueryParams;
pub use property::{Property, parse_property, parse_property_list};
pub use registry::{FieldDef, Registry, Table, TableEntity};
pub use request::TableRequest;
pub use response::{TableResponse, TableResponseMeta};
pub use value::SqlValue;
