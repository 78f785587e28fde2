#![doc(hidden)]

//! Core library for ghtally
//!
//! This library consolidates all functionality for the ghtally tool, which tallies the
//! contribution statistics of a GitHub account (lines added and deleted, attributed commits,
//! stars, followers, repositories) and renders them into SVG templates.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`stats`]: Statistics collection, incremental aggregation and caching
//! - [`reports`]: Output sinks (SVG templates, console summary)

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod reports;
pub mod stats;

pub use crate::commands::{Host, run};
