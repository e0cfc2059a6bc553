//! Entity registry
//!
//! Maps table names to their field definitions and the join graph that
//! connects them. Built once at startup and shared read-only.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::QueryError;
use super::joins::JoinGraph;
use super::property::{Property, parse_property};
use super::request::TableRequest;

/// Column definition generated by `#[derive(TableEntity)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Struct field and database column name
    pub name: &'static str,
    /// External property name, `None` for hidden columns
    pub property: Option<&'static str>,
    /// SQLite column type (TEXT, INTEGER, REAL, BOOLEAN, BLOB)
    pub sql_type: &'static str,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
}

impl FieldDef {
    /// Column definition for CREATE TABLE
    pub fn to_sql(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.name, self.sql_type);

        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }

        if !self.nullable && !self.primary_key {
            sql.push_str(" NOT NULL");
            sql.push_str(match self.sql_type {
                "INTEGER" | "BOOLEAN" => " DEFAULT 0",
                "REAL" => " DEFAULT 0.0",
                _ => " DEFAULT ''",
            });
        }

        if self.unique {
            sql.push_str(" UNIQUE");
        }

        sql
    }
}

/// A struct stored in its own table.
///
/// Implemented by `#[derive(TableEntity)]`.
pub trait TableEntity {
    const TABLE_NAME: &'static str;

    fn fields() -> &'static [FieldDef];
}

/// A registered table.
#[derive(Debug)]
pub struct Table {
    name: String,
    fields: &'static [FieldDef],
    props: OnceCell<Vec<(Property, &'static str)>>,
}

impl Table {
    pub fn new(name: impl Into<String>, fields: &'static [FieldDef]) -> Self {
        Self {
            name: name.into(),
            fields,
            props: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.fields.iter().any(|f| f.name == column)
    }

    /// Property to field name map, in declaration order.
    fn prop_map(&self) -> &[(Property, &'static str)] {
        self.props.get_or_init(|| {
            self.fields
                .iter()
                .filter_map(|f| {
                    f.property
                        .map(|p| (parse_property(p, &self.name), f.name))
                })
                .collect()
        })
    }

    /// All exposed properties of the table.
    pub fn props(&self) -> Vec<Property> {
        self.prop_map().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Field name holding `prop`, if the table exposes it.
    pub fn field_of(&self, prop: &Property) -> Option<&'static str> {
        self.prop_map()
            .iter()
            .find(|(p, _)| p == prop)
            .map(|(_, field)| *field)
    }

    /// Pick `props` out of a serialized entity, keyed by their output alias.
    /// Properties of other tables are skipped. An empty `props` selects all.
    pub fn line_map(&self, line: &Map<String, Value>, props: &[Property]) -> Map<String, Value> {
        let defaults;
        let props = if props.is_empty() {
            defaults = self.props();
            defaults.as_slice()
        } else {
            props
        };

        let mut out = Map::with_capacity(props.len());
        for prop in props {
            let Some(field) = self.field_of(prop) else {
                continue;
            };
            if let Some(value) = line.get(field) {
                out.insert(prop.alias(&self.name), value.clone());
            }
        }
        out
    }

    /// Remap typed rows into maps keyed by the requested properties.
    pub fn remap<T: Serialize>(
        &self,
        rows: &[T],
        props: &[Property],
    ) -> Result<Vec<Map<String, Value>>, serde_json::Error> {
        rows.iter()
            .map(|row| match serde_json::to_value(row)? {
                Value::Object(line) => Ok(self.line_map(&line, props)),
                _ => Ok(Map::new()),
            })
            .collect()
    }

    /// CREATE TABLE statement from the field definitions
    pub fn create_table_sql(&self) -> String {
        let column_defs: Vec<String> = self.fields.iter().map(|f| f.to_sql()).collect();

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n  {}\n)",
            self.name,
            column_defs.join(",\n  ")
        )
    }
}

/// Registered tables and the join graph between them.
#[derive(Debug, Default)]
pub struct Registry {
    tables: HashMap<String, Table>,
    order: Vec<String>,
    graph: JoinGraph,
}

impl Registry {
    pub fn new(graph: JoinGraph) -> Self {
        Self {
            tables: HashMap::new(),
            order: Vec::new(),
            graph,
        }
    }

    /// Register an entity type under its table name.
    pub fn register<E: TableEntity>(&mut self) -> &mut Self {
        self.register_table(E::TABLE_NAME, E::fields())
    }

    /// Register a table from explicit field definitions.
    pub fn register_table(&mut self, name: &str, fields: &'static [FieldDef]) -> &mut Self {
        if self
            .tables
            .insert(name.to_string(), Table::new(name, fields))
            .is_none()
        {
            self.order.push(name.to_string());
        }
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table(&self, name: &str) -> Result<&Table, QueryError> {
        self.lookup(name)
            .ok_or_else(|| QueryError::UnknownTable(name.to_string()))
    }

    /// Tables in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.order.iter().filter_map(|name| self.tables.get(name))
    }

    pub fn graph(&self) -> &JoinGraph {
        &self.graph
    }

    /// Start a request on a registered table.
    pub fn request(&self, name: &str) -> Result<TableRequest<'_>, QueryError> {
        Ok(TableRequest::new(self, self.table(name)?))
    }

    /// Every property of every table referenced by `props`.
    pub fn available_props(&self, props: &[Property]) -> Vec<Property> {
        let mut seen: Vec<&str> = Vec::new();
        let mut out = Vec::new();
        for prop in props {
            if seen.contains(&prop.table.as_str()) {
                continue;
            }
            seen.push(&prop.table);
            if let Some(table) = self.lookup(&prop.table) {
                out.extend(table.props());
            }
        }
        out
    }
}
