//! Data types for documents, tables and configuration.

pub mod config;
pub mod document;
pub mod table;
