//! Collector API
//!
//! REST backend exposing the collector tables through a dynamic query
//! engine: property projection with automatic joins, a filter
//! micro-language, and row level access control derived from app
//! publications and responsibilities.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod query;

pub use app::{AppState, build_app};
