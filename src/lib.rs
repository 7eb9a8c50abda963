//! SOQL compiler - relational query plans to Salesforce Object Query Language
//!
//! This crate turns a planner's join-based query description into SOQL through:
//! - Alias graph resolution into relationship paths
//! - Field path rewriting of column fragments
//! - Three-valued WHERE/HAVING compilation
//! - Query assembly and execution dispatch

pub mod config;
pub mod field_rewriter;
pub mod query_plan;
pub mod soql_generator;
pub mod topology;
pub mod where_compiler;
