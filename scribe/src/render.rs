//! Terminal rendering of the final result.
//!
//! [`display_result`] never fails. Text that looks like Markdown is styled
//! for the terminal, anything else is printed under a `Results:` label, and
//! if writing the styled output fails the untrimmed text is printed between
//! two `=` separator lines instead.

use std::io::Write;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use colored::Colorize;
use regex::{Captures, Regex};
use tracing::warn;

/// Width of the separator lines around the plain-text fallback.
pub const SEPARATOR_WIDTH: usize = 50;

/// Substrings that mark a text as Markdown.
pub const MARKDOWN_MARKERS: [&str; 5] = ["#", "**", "*", "`", "["];

/// Which branch produced the terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    Markdown,
    Plain,
    Fallback,
}

/// Force ANSI styling on (unless `NO_COLOR` is set) or leave it to `colored`'s
/// terminal detection.
pub fn configure_color(force: bool) {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    if no_color {
        colored::control::set_override(false);
    } else if force {
        colored::control::set_override(true);
    }
}

pub fn looks_like_markdown(text: &str) -> bool {
    MARKDOWN_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Render `content` to `out`, falling back to plain text on any failure.
pub fn display_result<W: Write>(out: &mut W, content: &str) -> RenderPath {
    match render_rich(out, content) {
        Ok(path) => path,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "rich rendering failed");
            render_fallback(out, content, &err);
            RenderPath::Fallback
        }
    }
}

fn render_rich<W: Write>(out: &mut W, content: &str) -> Result<RenderPath> {
    let trimmed = content.trim();
    let (path, body) = if looks_like_markdown(trimmed) {
        (RenderPath::Markdown, markdown_to_ansi(trimmed))
    } else {
        (
            RenderPath::Plain,
            format!("{}\n{trimmed}\n", "Results:".bold().blue()),
        )
    };
    out.write_all(body.as_bytes())
        .context("write rendered result")?;
    out.flush().context("flush rendered result")?;
    Ok(path)
}

fn render_fallback<W: Write>(out: &mut W, content: &str, err: &anyhow::Error) {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let _ = writeln!(out, "Rich rendering failed: {err:#}");
    let _ = writeln!(out, "Falling back to plain text:");
    let _ = writeln!(out, "{separator}");
    let _ = writeln!(out, "{content}");
    let _ = writeln!(out, "{separator}");
    let _ = out.flush();
}

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}(#{1,6})\s*(\S.*?)(?:\s+#+)?\s*$").expect("heading regex"));
static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\*\s*){3,}$|^\s*(?:-\s*){3,}$|^\s*(?:_\s*){3,}$").expect("rule regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("bullet regex"));
static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(\d+)[.)]\s+(.*)$").expect("ordered regex"));
static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s?(.*)$").expect("quote regex"));
static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"`([^`]+)`|\*\*\*(.+?)\*\*\*|\*\*(.+?)\*\*|\*([^*\s](?:[^*]*[^*\s])?)\*|\[([^\]]+)\]\(([^)\s]+)\)",
    )
    .expect("inline regex")
});

/// Line-oriented Markdown to ANSI conversion.
///
/// Covers what short generated posts use: headings, emphasis, inline code,
/// links, bullet and numbered lists, quotes, fenced code and rules.
pub fn markdown_to_ansi(text: &str) -> String {
    let mut out = String::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push_str(&format!("    {}\n", line.yellow()));
            continue;
        }

        let rendered = if let Some(caps) = HEADING_RE.captures(line) {
            let title = inline(&caps[2]);
            match caps[1].len() {
                1 => format!("{}\n", title.bold().underline()),
                2 => format!("{}", title.bold().cyan()),
                _ => format!("{}", title.bold()),
            }
        } else if RULE_RE.is_match(line) {
            format!("{}", "─".repeat(SEPARATOR_WIDTH).dimmed())
        } else if let Some(caps) = BULLET_RE.captures(line) {
            format!("{}• {}", &caps[1], inline(&caps[2]))
        } else if let Some(caps) = ORDERED_RE.captures(line) {
            format!("{}{}. {}", &caps[1], &caps[2], inline(&caps[3]))
        } else if let Some(caps) = QUOTE_RE.captures(line) {
            format!("{} {}", "│".dimmed(), inline(&caps[1]).italic())
        } else {
            inline(line)
        };
        out.push_str(&rendered);
        out.push('\n');
    }

    out
}

fn inline(text: &str) -> String {
    INLINE_RE
        .replace_all(text, |caps: &Captures<'_>| {
            if let Some(code) = caps.get(1) {
                code.as_str().yellow().to_string()
            } else if let Some(both) = caps.get(2) {
                inline(both.as_str()).bold().italic().to_string()
            } else if let Some(strong) = caps.get(3) {
                // Strong spans may carry nested emphasis.
                inline(strong.as_str()).bold().to_string()
            } else if let Some(em) = caps.get(4) {
                em.as_str().italic().to_string()
            } else {
                let label = caps.get(5).map_or("", |m| m.as_str());
                let url = caps.get(6).map_or("", |m| m.as_str());
                format!("{} {}", label.underline().blue(), format!("({url})").dimmed())
            }
        })
        .into_owned()
}
