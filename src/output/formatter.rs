use chrono::{DateTime, Duration, Utc};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::dedup::{FilterResult, Identified};
use crate::ingest::IngestReport;
use crate::rank::RankedPlace;
use crate::scoring::ScoreResult;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format a duration into a human-readable age string
/// "2h" for hours, "3d" for days, "1w" for weeks
pub fn format_age(duration: Duration) -> String {
    let hours = duration.num_hours();
    let days = duration.num_days();
    let weeks = days / 7;

    if weeks >= 1 {
        format!("{}w", weeks)
    } else if days >= 1 {
        format!("{}d", days)
    } else if hours >= 1 {
        format!("{}h", hours)
    } else {
        let minutes = duration.num_minutes();
        if minutes >= 1 {
            format!("{}m", minutes)
        } else {
            "now".to_string()
        }
    }
}

/// Format ranked places as a table with columns: Index, Score, Name, Region, Updated
/// No headers (minimal format). A trailing `~` on the score marks weather-adjusted safety.
pub fn format_ranked_table(ranked: &[RankedPlace], use_colors: bool, now: DateTime<Utc>) -> String {
    if ranked.is_empty() {
        return "No places found.".to_string();
    }

    let term_width = get_terminal_width();

    let index_width = 4;
    let score_width = 4;
    let separator = "  ";

    ranked
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let index_str = format!("{:>3}.", idx + 1);
            let marker = if entry.weather_applied { "~" } else { " " };
            let score_str = format!("{:>3}{}", entry.result.score, marker);
            let region = &entry.place.signal.region_code;
            let age = format_age(entry.place.signal.staleness(now));

            let fixed_width = index_width
                + 1
                + score_width
                + separator.len() * 3
                + region.chars().count()
                + age.len();

            let name = match term_width {
                Some(width) if width > fixed_width + 10 => {
                    truncate_name(&entry.place.name, width - fixed_width)
                }
                // Very narrow terminal, show truncated
                Some(_) => truncate_name(&entry.place.name, 20),
                // No terminal (pipe), don't truncate
                None => entry.place.name.clone(),
            };

            if use_colors {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str.dimmed(),
                    score_str.bold(),
                    separator,
                    name,
                    separator,
                    region.cyan(),
                    separator,
                    age.dimmed()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str, score_str, separator, name, separator, region, separator, age
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format ranked places as tab-separated values for scripting
/// Columns: score, id, name, region (no headers, no colors)
pub fn format_tsv(ranked: &[RankedPlace]) -> String {
    ranked
        .iter()
        .map(|entry| {
            format!(
                "{}\t{}\t{}\t{}",
                entry.result.score,
                entry.place.id,
                entry.place.name,
                entry.place.signal.region_code
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line score explanation: one line per factor plus the total
pub fn format_score_detail(result: &ScoreResult, use_colors: bool) -> String {
    let mut lines: Vec<String> = result
        .breakdown
        .contributions(&result.factors)
        .iter()
        .map(|c| {
            format!(
                "  {:<13}{:>3} x {:.2} = {:>6.2}",
                c.label, c.subscore, c.weight, c.contribution
            )
        })
        .collect();

    let total = format!("O-Dog score: {}", result.score);
    if use_colors {
        lines.insert(0, total.bold().to_string());
    } else {
        lines.insert(0, total);
    }
    lines.join("\n")
}

/// Summary of a dry-run partition, listing each record by identity key
pub fn format_partition<R: Identified>(partition: &FilterResult<R>, use_colors: bool) -> String {
    let mut lines = vec![format!(
        "{} new, {} existing",
        partition.new_places.len(),
        partition.existing_places.len()
    )];

    for record in &partition.new_places {
        let key = record.identity().map_key();
        if use_colors {
            lines.push(format!("  {} {}", "+".green(), key));
        } else {
            lines.push(format!("  + {}", key));
        }
    }
    for record in &partition.existing_places {
        let key = record.identity().map_key();
        if use_colors {
            lines.push(format!("  {} {}", "=".dimmed(), key.dimmed()));
        } else {
            lines.push(format!("  = {}", key));
        }
    }

    lines.join("\n")
}

pub fn format_ingest_report(report: &IngestReport) -> String {
    let elapsed = report.finished_at - report.started_at;
    format!(
        "{} ({}): {} received, {} inserted, {} refreshed, {} raced duplicates in {}ms",
        report.source_api,
        report.mode.describe(),
        report.received,
        report.inserted,
        report.refreshed,
        report.raced_duplicates,
        elapsed.num_milliseconds()
    )
}
