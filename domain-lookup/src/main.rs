//! Domain Lookup CLI Application
//!
//! A command-line interface for looking up domain registration data using
//! RDAP and WHOIS. This binary is a thin front-end over domain-lookup-lib:
//! it builds the configuration, runs the lookups and prints the records.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_lookup_lib::{
    load_env_config, parse_attempt_timeout, parse_timeout_string, popular_domains,
    CanonicalRecord, ConfigManager, DomainLookup, EnvConfig, ErrorKind, FileConfig, LookupConfig,
    LookupMode, ServerRegistry,
};
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-lookup
#[derive(Parser, Debug)]
#[command(name = "domain-lookup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Look up domain registration data using RDAP with WHOIS fallback")]
#[command(
    long_about = "Look up who registered a domain, when it expires and where it is hosted.\n\nQueries RDAP first and falls back to WHOIS, or races both. URLs and mixed-case input are accepted."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names or URLs to look up
    #[arg(value_name = "DOMAINS", help_heading = "Domain Selection")]
    pub domains: Vec<String>,

    /// Read domains from a file (one per line, '#' starts a comment)
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Domain Selection")]
    pub file: Option<String>,

    /// List TLDs with a built-in server mapping and exit
    #[arg(long = "list-tlds", help_heading = "Domain Selection")]
    pub list_tlds: bool,

    /// Lookup strategy: auto, rdap, whois or race
    #[arg(short = 'm', long = "mode", value_name = "MODE", value_parser = parse_mode, help_heading = "Protocol")]
    pub mode: Option<LookupMode>,

    /// Answer popular domains from the built-in table (may be stale)
    #[arg(long = "static-table", help_heading = "Protocol")]
    pub static_table: bool,

    /// Do not append the generic rdap.org redirector
    #[arg(long = "no-generic-rdap", help_heading = "Protocol")]
    pub no_generic_rdap: bool,

    /// Per-attempt RDAP timeout, 1s to 2m (e.g. "10s")
    #[arg(long = "rdap-timeout", value_name = "DURATION", value_parser = parse_rdap_timeout, help_heading = "Protocol")]
    pub rdap_timeout: Option<Duration>,

    /// WHOIS timeout, 1s to 2m (e.g. "10s")
    #[arg(long = "whois-timeout", value_name = "DURATION", value_parser = parse_whois_timeout, help_heading = "Protocol")]
    pub whois_timeout: Option<Duration>,

    /// Overall deadline per domain (e.g. "30s")
    #[arg(long = "deadline", value_name = "DURATION", value_parser = parse_deadline, help_heading = "Protocol")]
    pub deadline: Option<Duration>,

    /// Output results as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Include the raw RDAP/WHOIS response in text output
    #[arg(long = "raw", help_heading = "Output Format")]
    pub raw: bool,

    /// Number of domains looked up at once
    #[arg(
        short = 'c',
        long = "concurrency",
        default_value = "4",
        value_parser = clap::value_parser!(u16).range(1..=64),
        help_heading = "Performance"
    )]
    pub concurrency: u16,

    /// Use a specific config file instead of discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed progress on stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

fn parse_mode(value: &str) -> Result<LookupMode, String> {
    value.parse::<LookupMode>().map_err(|e| e.to_string())
}

fn parse_rdap_timeout(value: &str) -> Result<Duration, String> {
    parse_attempt_timeout("rdap_timeout", value).map_err(|e| e.to_string())
}

fn parse_whois_timeout(value: &str) -> Result<Duration, String> {
    parse_attempt_timeout("whois_timeout", value).map_err(|e| e.to_string())
}

/// Any positive duration; the deadline spans every attempt for a domain.
fn parse_deadline(value: &str) -> Result<Duration, String> {
    match parse_timeout_string(value) {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(format!(
            "Invalid deadline '{}'. Use format like '5s', '30s', '2m'",
            value
        )),
    }
}

/// Error records grouped by failure category, for the closing summary.
#[derive(Debug, Default)]
pub(crate) struct ErrorStats {
    pub(crate) by_kind: BTreeMap<String, Vec<String>>,
}

impl ErrorStats {
    fn add_record(&mut self, record: &CanonicalRecord) {
        if !record.is_error() {
            return;
        }
        let kind = record.failure.map(describe_kind).unwrap_or("other errors");
        self.by_kind
            .entry(kind.to_string())
            .or_default()
            .push(record.domain.clone());
    }

    fn has_errors(&self) -> bool {
        !self.by_kind.is_empty()
    }

    fn error_count(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }
}

fn describe_kind(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidDomainSyntax => "invalid inputs",
        ErrorKind::UnsupportedTld => "unsupported TLDs",
        ErrorKind::NotFound => "not found",
        ErrorKind::Timeout => "timeouts",
        ErrorKind::RateLimited => "rate limited",
        ErrorKind::ConnectFailed | ErrorKind::NetworkError | ErrorKind::HttpStatus => {
            "network errors"
        }
        ErrorKind::EmptyResponse | ErrorKind::ParseFailure => "unreadable responses",
        _ => "other errors",
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(2);
    }

    if args.list_tlds {
        print_tlds();
        return;
    }

    match run_lookups(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the stderr log subscriber. `DL_LOG` wins over `RUST_LOG`;
/// `-v` raises the default from warn to debug.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("DL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.list_tlds {
        return Ok(());
    }

    if args.domains.is_empty() && args.file.is_none() {
        return Err("You must specify at least one domain or use --file".to_string());
    }

    if args.json && args.raw {
        return Err("--raw only applies to text output; the JSON output always carries rawPayload".to_string());
    }

    Ok(())
}

fn print_tlds() {
    let registry = ServerRegistry::builtin();
    let tlds = registry.known_tlds();
    println!("Built-in server mappings ({} TLDs):", tlds.len());
    for tld in tlds {
        println!("  .{}", tld);
    }
    println!();
    println!("Static table entries: {}", popular_domains().join(", "));
}

/// Look up every requested domain and print the records.
///
/// Returns `Ok(false)` when at least one record is an error record.
async fn run_lookups(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let (config, registry) = build_config(&args)?;
    let mode = config.default_mode;
    let deadline = args.deadline;

    let domains = get_domains_to_lookup(&args)?;
    tracing::debug!(count = domains.len(), %mode, "starting lookups");

    let engine = DomainLookup::builder()
        .config(config)
        .registry(registry)
        .build()?;

    let started = Instant::now();
    let engine = &engine;
    let records: Vec<CanonicalRecord> = stream::iter(domains)
        .map(|domain| async move {
            match deadline {
                Some(deadline) => engine.lookup_with_deadline(&domain, mode, deadline).await,
                None => engine.lookup(&domain, mode).await,
            }
        })
        .buffered(usize::from(args.concurrency))
        .collect()
        .await;

    let mut error_stats = ErrorStats::default();
    for record in &records {
        error_stats.add_record(record);
    }

    display_results(&records, &args, &error_stats, started.elapsed())?;
    Ok(!error_stats.has_errors())
}

/// Build the engine configuration.
///
/// Precedence, lowest to highest: defaults, config file(s), `DL_*`
/// environment variables, command line flags.
fn build_config(
    args: &Args,
) -> Result<(LookupConfig, ServerRegistry), Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config(args.verbose);

    let file_config = if let Some(explicit_config_path) = &args.config {
        tracing::info!(path = %explicit_config_path, "using config file from --config");
        config_manager.load_file(explicit_config_path).map_err(|e| {
            format!("Failed to load config file '{}': {}", explicit_config_path, e)
        })?
    } else if let Some(env_config_path) = &env_config.config {
        tracing::info!(path = %env_config_path, "using config file from DL_CONFIG");
        config_manager
            .load_file(env_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", env_config_path, e))?
    } else {
        config_manager.discover_and_load()?
    };

    let config = resolve_config(args, &file_config, &env_config)?;
    let registry = file_config.build_registry()?;
    Ok((config, registry))
}

fn resolve_config(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
) -> Result<LookupConfig, Box<dyn std::error::Error>> {
    let mut config = LookupConfig::default();
    file_config.apply_to(&mut config)?;
    env_config.apply_to(&mut config);
    apply_cli_args_to_config(&mut config, args);
    Ok(config)
}

/// Apply CLI arguments to config (highest precedence).
///
/// Boolean flags only ever switch a feature in their own direction, so an
/// absent flag never overrides the file or environment.
fn apply_cli_args_to_config(config: &mut LookupConfig, args: &Args) {
    if let Some(mode) = args.mode {
        config.default_mode = mode;
    }
    if args.static_table {
        config.use_static_table = true;
    }
    if args.no_generic_rdap {
        config.generic_rdap_fallback = false;
    }
    if let Some(timeout) = args.rdap_timeout {
        config.rdap_timeout = timeout;
    }
    if let Some(timeout) = args.whois_timeout {
        config.whois_timeout = timeout;
    }
}

/// Domains from the command line followed by those from `--file`.
fn get_domains_to_lookup(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut domains = args.domains.clone();
    if let Some(path) = &args.file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read domain file '{}': {}", path, e))?;
        domains.extend(parse_domain_list(&content));
    }

    if domains.is_empty() {
        return Err("No domains to look up.".into());
    }
    Ok(domains)
}

/// One entry per line; blank lines and `#` comments are skipped.
fn parse_domain_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn display_results(
    records: &[CanonicalRecord],
    args: &Args,
    error_stats: &ErrorStats,
    duration: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.json {
        display_json_results(records)?;
        return Ok(());
    }

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            println!();
        }
        ui::print_record(record, args.raw);
    }

    if records.len() > 1 {
        println!();
        ui::print_summary(records.len(), error_stats.error_count(), duration);
    }
    ui::print_error_summary(error_stats);

    Ok(())
}

/// A single record prints as an object, several as an array.
fn display_json_results(records: &[CanonicalRecord]) -> Result<(), Box<dyn std::error::Error>> {
    let json = match records {
        [single] => serde_json::to_string_pretty(single)?,
        all => serde_json::to_string_pretty(all)?,
    };
    println!("{}", json);
    Ok(())
}
