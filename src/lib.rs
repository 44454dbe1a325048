//! # jsonql
//!
//! Translates JSON query documents into dialect-aware SQL over a schema
//! relationship graph, and runs them against configured data sources.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              JSON request document                       │
//! │  {"select": "orders o", "join": "users", "where": ...}   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [parser + join builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Action                              │
//! │   tables, columns, joins, filters, group/order/limit     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [permission policy]
//! ┌─────────────────────────────────────────────────────────┐
//! │             Action (possibly rewritten)                  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [statement builder + dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │            SQL text + ordered parameters                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [data context]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Summary                              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use jsonql::config::Settings;
//! use jsonql::translation::Translator;
//!
//! let settings = Settings::from_file("jsonql.toml")?;
//! let translator = Translator::from_settings(settings)?;
//! let summary = translator.translate(r#"{"select": "users", "where": "age>=18"}"#)?;
//! println!("{}", summary.data());
//! # Ok::<(), jsonql::Error>(())
//! ```

pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod permission;
pub mod planner;
pub mod sql;
pub mod translation;

pub use action::{Action, Operation, Statement};
pub use context::{DataContext, Summary};
pub use error::{Error, ErrorKind, Result};
pub use parser::Parser;
pub use sql::Dialect;
pub use translation::Translator;
