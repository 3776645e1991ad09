//! WHOIS protocol client and response normalizer.
//!
//! WHOIS is a plain TCP exchange on port 43: one query line, then the server
//! streams free-form text and closes the connection. Registries disagree on
//! labels and layout, so extraction is driven by a table of label variants.

use crate::error::LookupError;
use crate::types::{clean_field, CanonicalRecord, SourceProtocol, WhoisServer};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Responses at or below this many bytes carry no registration data.
pub const MIN_RESPONSE_BYTES: usize = 50;

/// Upper bound on how much of a response is kept.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Raw WHOIS transport.
///
/// Implemented by [`WhoisClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait WhoisQuery: Send + Sync {
    /// Send `domain` to `server` and return the full response text.
    async fn query(
        &self,
        domain: &str,
        server: &WhoisServer,
        timeout: Duration,
    ) -> Result<String, LookupError>;
}

/// WHOIS client speaking the protocol directly over TCP.
#[derive(Debug, Clone, Default)]
pub struct WhoisClient;

impl WhoisClient {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(&self, domain: &str, server: &WhoisServer) -> Result<String, LookupError> {
        let label = server.to_string();

        let stream = TcpStream::connect((server.host.as_str(), server.port))
            .await
            .map_err(|e| LookupError::connect(&label, e.to_string()))?;
        let (reader, mut writer) = stream.into_split();

        writer
            .write_all(format!("{}\r\n", domain).as_bytes())
            .await
            .map_err(|e| LookupError::network(&label, e.to_string()))?;

        let mut buf = Vec::new();
        reader
            .take(MAX_RESPONSE_BYTES as u64)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| LookupError::network(&label, e.to_string()))?;

        if buf.len() <= MIN_RESPONSE_BYTES {
            return Err(LookupError::EmptyResponse {
                server: label,
                bytes: buf.len(),
            });
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl WhoisQuery for WhoisClient {
    /// Query a WHOIS server.
    ///
    /// The whole exchange (connect, write, read to EOF) shares one budget.
    /// On expiry the socket is dropped and `Timeout` is returned.
    ///
    /// # Errors
    ///
    /// - `ConnectFailed` if the TCP connection cannot be opened
    /// - `NetworkError` if the connection breaks mid-exchange
    /// - `EmptyResponse` if the server closes after 50 bytes or fewer
    /// - `Timeout` if the server does not finish in time
    async fn query(
        &self,
        domain: &str,
        server: &WhoisServer,
        timeout: Duration,
    ) -> Result<String, LookupError> {
        tracing::debug!(domain, server = %server, "whois query");
        match tokio::time::timeout(timeout, self.exchange(domain, server)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::timeout(server.to_string(), timeout)),
        }
    }
}

/// Record fields a WHOIS line can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhoisField {
    Registrar,
    RegistrationDate,
    ExpiryDate,
    NameServer,
    Registrant,
    Status,
}

/// One extraction rule: any of `labels` (compared case-insensitively against
/// the text before the first colon) feeds `field`.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub labels: &'static [&'static str],
    pub field: WhoisField,
    pub multi_valued: bool,
}

/// Label variants seen across registries.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        labels: &[
            "registrar",
            "registrar name",
            "sponsoring registrar",
            "registrar organization",
        ],
        field: WhoisField::Registrar,
        multi_valued: false,
    },
    FieldRule {
        labels: &[
            "creation date",
            "created",
            "created on",
            "registered on",
            "registration date",
            "registration time",
            "domain registration date",
            "registered",
        ],
        field: WhoisField::RegistrationDate,
        multi_valued: false,
    },
    FieldRule {
        labels: &[
            "registry expiry date",
            "registrar registration expiration date",
            "expiry date",
            "expiration date",
            "expiration time",
            "expires on",
            "expires",
            "paid-till",
            "renewal date",
        ],
        field: WhoisField::ExpiryDate,
        multi_valued: false,
    },
    FieldRule {
        labels: &[
            "name server",
            "name servers",
            "nameserver",
            "nameservers",
            "nserver",
        ],
        field: WhoisField::NameServer,
        multi_valued: true,
    },
    FieldRule {
        labels: &["registrant", "registrant name", "registrant organization"],
        field: WhoisField::Registrant,
        multi_valued: false,
    },
    FieldRule {
        labels: &["domain status", "status", "state"],
        field: WhoisField::Status,
        multi_valued: false,
    },
];

fn rule_for_label(label: &str) -> Option<&'static FieldRule> {
    let label = label.trim().to_lowercase();
    FIELD_RULES
        .iter()
        .find(|rule| rule.labels.iter().any(|l| *l == label))
}

/// Split `Label: value` at the first colon, if the label is a known one.
fn split_labelled(line: &str) -> Option<(&'static FieldRule, &str)> {
    let (label, value) = line.split_once(':')?;
    rule_for_label(label).map(|rule| (rule, value.trim()))
}

/// `Label: value` or `Label:` for any label, known or not. IPv6 glue such
/// as `2001:db8::1` has no space after its first colon.
fn looks_labelled(line: &str) -> bool {
    match line.split_once(':') {
        Some((label, rest)) => {
            !label.trim().is_empty() && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        }
        None => false,
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>")
}

/// Turn WHOIS text into a canonical record.
///
/// Singular fields keep the first value seen; name servers accumulate.
/// A known label with an empty value opens a continuation block. Its values
/// are the following lines indented deeper than the label; a blank line, a
/// shallower line or any other `Label:` line closes it.
pub fn normalize_whois(text: &str, domain: &str, server: &WhoisServer) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(domain, SourceProtocol::Whois, &server.host);
    record.raw_payload = text.to_string();

    // Rule and indentation of the label that opened the block.
    let mut open_block: Option<(&'static FieldRule, usize)> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            open_block = None;
            continue;
        }
        if is_comment(line) {
            continue;
        }
        let indent = raw_line.len() - raw_line.trim_start().len();

        if let Some((rule, value)) = split_labelled(line) {
            if value.is_empty() {
                open_block = Some((rule, indent));
            } else {
                open_block = None;
                apply_value(&mut record, rule, value);
            }
            continue;
        }

        match open_block {
            Some((rule, opener)) if indent > opener && !looks_labelled(line) => {
                apply_value(&mut record, rule, line);
                if !rule.multi_valued {
                    open_block = None;
                }
            }
            _ => open_block = None,
        }
    }

    record
}

fn apply_value(record: &mut CanonicalRecord, rule: &FieldRule, value: &str) {
    let slot = match rule.field {
        WhoisField::NameServer => {
            if let Some(host) = value.split_whitespace().next() {
                record.name_servers.insert(host);
            }
            return;
        }
        WhoisField::Registrar => &mut record.registrar,
        WhoisField::RegistrationDate => &mut record.registration_date,
        WhoisField::ExpiryDate => &mut record.expiry_date,
        WhoisField::Registrant => &mut record.registrant,
        WhoisField::Status => &mut record.status,
    };

    if slot.is_some() {
        return;
    }

    *slot = match rule.field {
        WhoisField::Status => clean_field(strip_epp_url(value)),
        _ => clean_field(value),
    };
}

/// `clientTransferProhibited https://icann.org/epp#clientTransferProhibited`
/// becomes `clientTransferProhibited`.
fn strip_epp_url(value: &str) -> &str {
    match value.find(" http") {
        Some(idx) => &value[..idx],
        None => value,
    }
}

/// Check whether the text is a registry's "no such domain" answer.
pub fn indicates_unregistered(text: &str) -> bool {
    let lower = text.to_lowercase();
    let available_patterns = [
        "no match for",
        "no match",
        "not found",
        "no data found",
        "no entries found",
        "domain not found",
        "domain available",
        "status: available",
        "status: free",
        "not registered",
        "no matching record",
        "domain status: no object found",
        "the queried object does not exist",
        "object does not exist",
        "no matching entry",
        "domain name not found",
        "this domain name has not been registered",
    ];

    available_patterns.iter().any(|p| lower.contains(p))
}

/// Check whether the text is a rate-limit refusal.
pub fn indicates_rate_limited(text: &str) -> bool {
    let lower = text.to_lowercase();
    let rate_limit_patterns = [
        "rate limit exceeded",
        "too many requests",
        "try again later",
        "quota exceeded",
        "limit exceeded",
        "throttled",
        "rate-limited",
        "query rate",
    ];

    rate_limit_patterns.iter().any(|p| lower.contains(p))
}
