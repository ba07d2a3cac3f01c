//! Terminal formatting helpers

use chrono::{DateTime, Utc};
use colored::Colorize;

/// Render a proportional bar line, e.g. `tier 2  [#####-----]   5 ( 50.0%)`
pub fn distribution_bar(label: &str, count: i64, total: i64) -> String {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = (((percentage / 100.0) * bar_width as f64) as usize).min(bar_width);
    let empty = bar_width - filled;
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));

    format!(
        "  {:12} [{}] {:>4} ({:>5.1}%)",
        label,
        bar.green(),
        count,
        percentage
    )
}

/// Relative due time: `overdue 3d`, `due now`, `in 2w`
pub fn due_label(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (due - now).num_minutes();
    if minutes.abs() < 1 {
        return "due now".to_string();
    }
    let span = |m: i64| {
        let m = m.unsigned_abs();
        if m < 60 {
            format!("{}m", m)
        } else if m < 60 * 24 {
            format!("{}h", m / 60)
        } else {
            format!("{}d", m / (60 * 24))
        }
    };
    if minutes < 0 {
        format!("overdue {}", span(minutes))
    } else {
        format!("in {}", span(minutes))
    }
}

/// Truncate a string for display (UTF-8 safe)
pub fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// Split `a, b,,c` into trimmed non-empty tags
pub fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
