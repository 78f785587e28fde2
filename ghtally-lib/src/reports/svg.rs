//! Profile card templates.
//!
//! A template is an SVG file whose statistics live in elements with well-known ids. Each
//! numeric value has a companion `<id>_dots` element holding a run of dots, sized so that
//! value and dots together occupy a fixed number of characters and the columns line up.

use super::RenderFields;
use super::common::{format_count, format_signed};
use crate::Result;
use ohno::IntoAppError;
use regex::{Captures, Regex};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const LOG_TARGET: &str = "       svg";

/// Rewrite the template at `path` with `fields`.
///
/// Returns `false` when the template does not exist, which is reported and otherwise
/// ignored. Elements missing from the template are left alone.
pub fn overwrite(path: &Path, fields: &RenderFields) -> Result<bool> {
    let svg = match fs::read_to_string(path) {
        Ok(svg) => svg,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!(target: LOG_TARGET, "Template '{}' not found, skipping it", path.display());
            return Ok(false);
        }
        Err(e) => return Err(e).into_app_err_with(|| format!("unable to read template '{}'", path.display())),
    };

    let svg = render(&svg, fields)?;
    fs::write(path, svg).into_app_err_with(|| format!("unable to write template '{}'", path.display()))?;

    log::info!(target: LOG_TARGET, "Wrote '{}'", path.display());
    Ok(true)
}

/// Apply `fields` to the text of an SVG document.
pub fn render(svg: &str, fields: &RenderFields) -> Result<String> {
    let (additions, deletions, net) = fields.loc;

    let mut svg = set_text(svg, "age_data", &fields.account_age)?;
    for (id, text, width) in [
        ("commit_data", format_count(fields.commit_count), 22),
        ("star_data", format_count(fields.star_count), 14),
        ("repo_data", format_count(fields.repo_count), 6),
        ("contrib_data", format_count(fields.contributed_repo_count), 0),
        ("follower_data", format_count(fields.follower_count), 10),
        ("loc_data", format_signed(net), 9),
        ("loc_add", format_count(additions), 0),
        ("loc_del", format_count(deletions), 7),
    ] {
        svg = set_text(&svg, id, &text)?;
        svg = set_text(&svg, &format!("{id}_dots"), &dots(width, &text))?;
    }

    Ok(svg)
}

/// Filler that pads `text` to `width` characters.
fn dots(width: usize, text: &str) -> String {
    match width.saturating_sub(text.chars().count()) {
        0 => String::new(),
        1 => " ".to_string(),
        2 => ". ".to_string(),
        n => format!(" {} ", ".".repeat(n)),
    }
}

/// Replace the text content of the first element whose `id` is `id`.
///
/// Self-closing elements have no content and are left alone.
fn set_text(svg: &str, id: &str, text: &str) -> Result<String> {
    let pattern = format!(r#"(<[^<>]*\sid\s*=\s*["']{}["'](?:[^<>]*[^<>/])?>)[^<]*"#, regex::escape(id));
    let re = Regex::new(&pattern).into_app_err_with(|| format!("unable to build pattern for element '{id}'"))?;

    let escaped = escape_xml(text);
    Ok(re
        .replace(svg, |caps: &Captures<'_>| {
            let open_tag = caps.get(1).map_or("", |m| m.as_str());
            format!("{open_tag}{escaped}")
        })
        .into_owned())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
