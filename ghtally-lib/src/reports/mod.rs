//! Output sinks for collected statistics
//!
//! Two sinks are provided:
//! - **SVG**: rewrites the text of well-known elements in profile card templates
//! - **Console**: a short colored summary for the terminal
//!
//! Both render the same seven fields, captured by [`RenderFields`].

mod common;
mod console;
pub mod svg;

use crate::stats::RunTotals;

pub use console::generate as generate_console;

/// The fields a template renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFields {
    pub account_age: String,

    /// Commits attributed to the account across all repositories.
    pub commit_count: u64,
    pub star_count: u64,
    pub repo_count: u64,
    pub contributed_repo_count: u64,
    pub follower_count: u64,

    /// Lines added, lines deleted, and their difference.
    pub loc: (u64, u64, i64),
}

impl From<&RunTotals> for RenderFields {
    fn from(totals: &RunTotals) -> Self {
        Self {
            account_age: totals.account_age.clone(),
            commit_count: totals.total_attributed_commits(),
            star_count: totals.star_count,
            repo_count: totals.repo_count,
            contributed_repo_count: totals.contributed_repo_count,
            follower_count: totals.follower_count,
            loc: (totals.total_additions(), totals.total_deletions(), totals.net()),
        }
    }
}
