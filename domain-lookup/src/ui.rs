//! Text-mode display logic for domain-lookup CLI.
//!
//! Colored record blocks, the multi-domain summary line and the grouped
//! error summary. Uses only the `console` crate.

use console::{pad_str, style, Alignment, StyledObject};
use domain_lookup_lib::{score, CanonicalRecord, SourceProtocol, MAX_SCORE, UNKNOWN};
use std::time::Duration;

use crate::ErrorStats;

const LABEL_WIDTH: usize = 18;

// ── Record block ─────────────────────────────────────────────────────────────

/// Print one record as a header line followed by aligned fields.
pub fn print_record(record: &CanonicalRecord, show_raw: bool) {
    println!(
        "{}  {}  {}",
        style(&record.domain).white().bold(),
        protocol_badge(record.source_protocol),
        style(header_detail(record)).dim(),
    );

    if record.is_error() {
        if let Some(diagnostic) = &record.diagnostic {
            println!("  {}", style(diagnostic).red());
        }
        return;
    }

    for (label, value) in field_lines(record) {
        let padded = pad_str(label, LABEL_WIDTH, Alignment::Left, None);
        if value == UNKNOWN {
            println!("  {}{}", style(padded).dim(), style(value).dim());
        } else {
            println!("  {}{}", style(padded).dim(), value);
        }
    }

    if let Some(diagnostic) = &record.diagnostic {
        println!("  {}", style(diagnostic).yellow().dim());
    }

    if show_raw && !record.raw_payload.is_empty() {
        println!();
        println!("  {}", style("── Raw response ─────────────────────────────").dim());
        for line in record.raw_payload.lines() {
            println!("  {}", line);
        }
    }
}

fn protocol_badge(protocol: SourceProtocol) -> StyledObject<String> {
    let text = protocol.to_string();
    match protocol {
        SourceProtocol::Rdap => style(text).green().bold(),
        SourceProtocol::Whois => style(text).cyan().bold(),
        SourceProtocol::Static => style(text).yellow().bold(),
        SourceProtocol::Error => style(text).red().bold(),
    }
}

fn header_detail(record: &CanonicalRecord) -> String {
    if record.is_error() {
        return String::new();
    }
    format!(
        "via {}  completeness {}/{}",
        record.source_server,
        score(record),
        MAX_SCORE
    )
}

/// Label/value pairs for the registration fields, `unknown` where absent.
pub fn field_lines(record: &CanonicalRecord) -> Vec<(&'static str, String)> {
    let or_unknown = |value: &Option<String>| value.clone().unwrap_or_else(|| UNKNOWN.to_string());

    let name_servers = if record.name_servers.is_empty() {
        UNKNOWN.to_string()
    } else {
        record.name_servers.iter().collect::<Vec<_>>().join(", ")
    };

    vec![
        ("Registrar", or_unknown(&record.registrar)),
        ("Registrant", or_unknown(&record.registrant)),
        ("Registered", or_unknown(&record.registration_date)),
        ("Expires", or_unknown(&record.expiry_date)),
        ("Name servers", name_servers),
        ("Status", or_unknown(&record.status)),
    ]
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar.
pub fn print_summary(total: usize, errors: usize, duration: Duration) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} domain{} in {:.1}s  {}  {}  {}  {}",
        style(total).bold(),
        if total == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} resolved", total - errors)).green(),
        style("|").dim(),
        style(format!("{} failed", errors)).red(),
    );
}

// ── Error summary ────────────────────────────────────────────────────────────

/// Print failed domains grouped by failure category.
pub fn print_error_summary(error_stats: &ErrorStats) {
    if !error_stats.has_errors() {
        return;
    }

    println!();
    println!("  {}", style("Some domains could not be resolved:").yellow());
    for (kind, domains) in &error_stats.by_kind {
        println!(
            "  {} {} {}: {}",
            style("•").dim(),
            domains.len(),
            kind,
            format_list(domains, 5),
        );
    }
}

/// Join domains, truncating after `max_show` with an "and N more" tail.
fn format_list(domains: &[String], max_show: usize) -> String {
    if domains.len() <= max_show {
        domains.join(", ")
    } else {
        let shown = &domains[..max_show];
        let remaining = domains.len() - max_show;
        format!("{}, ... and {} more", shown.join(", "), remaining)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
