use super::common::{format_count, format_signed};
use crate::Result;
use crate::stats::RunTotals;
use core::fmt::Write;
use owo_colors::OwoColorize;

pub fn generate<W: Write>(totals: &RunTotals, use_colors: bool, writer: &mut W) -> Result<()> {
    if use_colors {
        writeln!(writer, "{}", totals.login.bold())?;
    } else {
        writeln!(writer, "{}", totals.login)?;
    }

    let rows = [
        ("Account age", totals.account_age.clone()),
        ("Followers", format_count(totals.follower_count)),
        ("Repositories", format_count(totals.repo_count)),
        ("Contributed", format_count(totals.contributed_repo_count)),
        ("Stars", format_count(totals.star_count)),
        ("Commits", format_count(totals.total_attributed_commits())),
    ];

    let width = ["Lines of code", "Cache"]
        .into_iter()
        .chain(rows.iter().map(|(name, _)| *name))
        .map(str::len)
        .max()
        .unwrap_or(0);

    for (name, value) in &rows {
        writeln!(writer, "  {name:<width$} : {value}")?;
    }

    let additions = format!("+{}", format_count(totals.total_additions()));
    let deletions = format!("-{}", format_count(totals.total_deletions()));
    let net = format_signed(totals.net());
    if use_colors {
        writeln!(writer, "  {:<width$} : {net} ({}, {})", "Lines of code", additions.green(), deletions.red())?;
    } else {
        writeln!(writer, "  {:<width$} : {net} ({additions}, {deletions})", "Lines of code")?;
    }

    let counts = &totals.loc.counts;
    let cache = if totals.all_cache_hit() {
        "all repositories unchanged".to_string()
    } else {
        let mut text = format!("{} reused, {} recomputed", counts.cache_hits, counts.computed);
        if counts.inaccessible > 0 {
            write!(text, ", {} inaccessible", counts.inaccessible)?;
        }
        if counts.degraded > 0 {
            write!(text, ", {} kept from a previous run", counts.degraded)?;
        }
        text
    };

    if use_colors && counts.degraded > 0 {
        writeln!(writer, "  {:<width$} : {}", "Cache", cache.yellow())?;
    } else {
        writeln!(writer, "  {:<width$} : {cache}", "Cache")?;
    }

    Ok(())
}
