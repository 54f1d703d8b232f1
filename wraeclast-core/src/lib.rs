//! Modifier normalization and stat-template resolution engine.
//!
//! Raw free-text modifiers from items, gems, boss skills and passive
//! tree nodes are matched against a versioned catalog of parameterized
//! stat templates and resolved into structured records: canonical stat
//! key, magnitude or range, operator and unit. The entry point for one
//! run is [`pipeline::run_pass`].

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod file_utils;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod seeding;
pub mod source;
pub mod template;
pub mod writer;

pub use error::{Result, WraeclastError};
pub use pipeline::run_pass;