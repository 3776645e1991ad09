//! Utility functions for domain input processing and validation.
//!
//! Users paste URLs, hostnames with ports, and mixed-case names. Everything
//! is reduced to a bare lowercase registrable name before any lookup.

use crate::error::LookupError;
use lazy_static::lazy_static;
use regex::Regex;
use std::net::IpAddr;

lazy_static! {
    /// Any URL scheme, e.g. `https://` or `ftp://`
    static ref SCHEME: Regex = Regex::new(r"^[a-z][a-z0-9+.\-]*://").unwrap();
    /// Trailing `:port`
    static ref PORT_SUFFIX: Regex = Regex::new(r":\d{1,5}$").unwrap();
}

/// Maximum length of a full domain name.
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

/// Normalize user input into a validated, lowercase domain name.
///
/// Strips scheme, `www.`, path, query, fragment, port and the root dot.
/// IP literals and names that fail the label syntax are rejected.
///
/// # Examples
///
/// ```rust
/// use domain_lookup_lib::normalize_domain_input;
///
/// let domain = normalize_domain_input("https://www.Example.com/path?q=1").unwrap();
/// assert_eq!(domain, "example.com");
/// assert!(normalize_domain_input("192.168.1.1").is_err());
/// ```
pub fn normalize_domain_input(input: &str) -> Result<String, LookupError> {
    let lowered = input.trim().to_lowercase();
    if lowered.is_empty() {
        return Err(LookupError::invalid_domain(input, "Domain name cannot be empty"));
    }

    let without_scheme = SCHEME.replace(&lowered, "");
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    // user:pass@host
    let host = host.rsplit('@').next().unwrap_or(host);

    if is_ip_literal(host) {
        return Err(LookupError::invalid_domain(
            input,
            "IP addresses are not supported, enter a domain name",
        ));
    }

    let host = PORT_SUFFIX.replace(host, "");
    let host = host.trim_end_matches('.');
    let host = match host.strip_prefix("www.") {
        Some(rest) if rest.contains('.') => rest,
        _ => host,
    };

    validate_domain(host).map_err(|e| match e {
        LookupError::InvalidDomainSyntax { reason, .. } => {
            LookupError::invalid_domain(input, reason)
        }
        other => other,
    })?;

    Ok(host.to_string())
}

/// Check whether a host string is a bare or bracketed IP address.
fn is_ip_literal(host: &str) -> bool {
    let bare = host.trim_start_matches('[');
    let bare = match bare.find(']') {
        Some(end) => &bare[..end],
        None => bare,
    };
    if bare.parse::<IpAddr>().is_ok() {
        return true;
    }
    // IPv4 with a port
    match bare.rsplit_once(':') {
        Some((addr, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
            addr.parse::<IpAddr>().is_ok()
        }
        _ => false,
    }
}

/// Validate a domain name format.
///
/// Requires `label(.label)+` where each label is 1-63 ASCII alphanumerics
/// or hyphens (no leading or trailing hyphen) and the TLD is at least two
/// letters.
pub fn validate_domain(domain: &str) -> Result<(), LookupError> {
    if domain.is_empty() {
        return Err(LookupError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(LookupError::invalid_domain(
            domain,
            format!("Domain name longer than {} characters", MAX_DOMAIN_LEN),
        ));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(LookupError::invalid_domain(
            domain,
            "Domain must have at least two labels (e.g. example.com)",
        ));
    }

    for label in &labels {
        if label.is_empty() {
            return Err(LookupError::invalid_domain(domain, "Empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(LookupError::invalid_domain(
                domain,
                format!("Label '{}' longer than {} characters", label, MAX_LABEL_LEN),
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(LookupError::invalid_domain(
                domain,
                format!("Label '{}' cannot start or end with a hyphen", label),
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(LookupError::invalid_domain(
                domain,
                format!("Label '{}' contains invalid characters", label),
            ));
        }
    }

    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LookupError::invalid_domain(
            domain,
            format!("'{}' is not a valid top-level domain", tld),
        ));
    }

    Ok(())
}

/// Extract the TLD (last label) from a domain name.
pub fn extract_tld(domain: &str) -> Result<String, LookupError> {
    match domain.rsplit_once('.') {
        Some((_, tld)) if !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(LookupError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        )),
    }
}
