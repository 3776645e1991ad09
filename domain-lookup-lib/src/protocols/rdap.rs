//! RDAP (Registration Data Access Protocol) client and normalizer.
//!
//! RDAP is the structured successor to WHOIS: an HTTP GET against
//! `{base}/domain/{name}` returning JSON with entities, events, nameservers
//! and status codes.

use crate::error::LookupError;
use crate::types::{clean_field, CanonicalRecord, LookupConfig, SourceProtocol};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Media type registries expect on RDAP requests.
pub const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// RDAP transport.
///
/// Implemented by [`RdapClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait RdapQuery: Send + Sync {
    /// Fetch the domain object for `domain` from the RDAP service at `base`.
    async fn query(&self, domain: &str, base: &str, timeout: Duration)
        -> Result<Value, LookupError>;
}

/// RDAP client backed by a shared `reqwest` connection pool.
#[derive(Clone)]
pub struct RdapClient {
    http_client: reqwest::Client,
}

impl RdapClient {
    /// Create an RDAP client from the engine configuration.
    ///
    /// Sets the `User-Agent` and RDAP `Accept` header on every request.
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(RDAP_MEDIA_TYPE));

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.rdap_timeout)
            .build()
            .map_err(|e| {
                LookupError::config(format!("Failed to create RDAP HTTP client: {}", e))
            })?;

        Ok(Self { http_client })
    }

    async fn fetch(&self, url: &str, base: &str, timeout: Duration) -> Result<Value, LookupError> {
        let response = self
            .http_client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(base, timeout, e))?;

        match response.status() {
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| map_transport_error(base, timeout, e))?;
                serde_json::from_slice(&body).map_err(|e| {
                    LookupError::parse(format!("{} returned invalid JSON: {}", base, e))
                })
            }
            StatusCode::NOT_FOUND => Err(LookupError::not_found(base)),
            status => Err(LookupError::HttpStatus {
                server: base.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl RdapQuery for RdapClient {
    async fn query(
        &self,
        domain: &str,
        base: &str,
        timeout: Duration,
    ) -> Result<Value, LookupError> {
        let url = domain_url(base, domain);
        tracing::debug!(domain, url = %url, "rdap query");
        self.fetch(&url, base, timeout).await
    }
}

/// `{base}/domain/{domain}`, tolerating a trailing slash on the base.
pub fn domain_url(base: &str, domain: &str) -> String {
    format!("{}/domain/{}", base.trim_end_matches('/'), domain)
}

fn map_transport_error(server: &str, timeout: Duration, err: reqwest::Error) -> LookupError {
    if err.is_timeout() {
        LookupError::timeout(server, timeout)
    } else if err.is_connect() {
        LookupError::connect(server, err.to_string())
    } else {
        LookupError::network(server, err.to_string())
    }
}

/// Turn an RDAP domain object into a canonical record.
///
/// # Errors
///
/// - `ParseFailure` if the body is not a JSON object
/// - `NotFound` / `HttpStatus` if the body is an RDAP error object
pub fn normalize_rdap(json: &Value, domain: &str, base: &str) -> Result<CanonicalRecord, LookupError> {
    let object = json
        .as_object()
        .ok_or_else(|| LookupError::parse(format!("{} returned a non-object RDAP body", base)))?;

    if let Some(code) = object.get("errorCode").and_then(Value::as_u64) {
        return Err(match code {
            404 => LookupError::not_found(base),
            other => LookupError::HttpStatus {
                server: base.to_string(),
                status: u16::try_from(other).unwrap_or(u16::MAX),
            },
        });
    }

    let mut record = CanonicalRecord::new(domain, SourceProtocol::Rdap, base);
    record.raw_payload = serde_json::to_string_pretty(json)?;

    let entities = json
        .get("entities")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let registrars: Vec<&Value> = entities
        .iter()
        .filter(|e| has_role(e, "registrar"))
        .collect();
    record.registrar = registrars
        .iter()
        .find_map(|e| extract_vcard_name(e))
        .or_else(|| registrars.first().and_then(|e| extract_entity_identifier(e)));

    record.registrant = entities
        .iter()
        .filter(|e| has_role(e, "registrant"))
        .find_map(extract_vcard_name);

    // Later events of the same kind overwrite earlier ones
    if let Some(events) = json.get("events").and_then(Value::as_array) {
        for event in events {
            let action = event.get("eventAction").and_then(Value::as_str);
            let date = event.get("eventDate").and_then(Value::as_str).and_then(clean_field);
            match (action, date) {
                (Some("registration"), Some(date)) => record.registration_date = Some(date),
                (Some("expiration"), Some(date)) => record.expiry_date = Some(date),
                _ => {}
            }
        }
    }

    if let Some(nameservers) = json.get("nameservers").and_then(Value::as_array) {
        for ns in nameservers {
            let name = ns
                .get("ldhName")
                .and_then(Value::as_str)
                .filter(|n| !n.trim().is_empty())
                .or_else(|| ns.get("unicodeName").and_then(Value::as_str));
            if let Some(name) = name {
                record.name_servers.insert(name);
            }
        }
    }

    if let Some(statuses) = json.get("status").and_then(Value::as_array) {
        let joined = statuses
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        record.status = clean_field(&joined);
    }

    Ok(record)
}

fn has_role(entity: &Value, role: &str) -> bool {
    entity
        .get("roles")
        .and_then(Value::as_array)
        .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some(role)))
}

/// The `fn` property of an entity's jCard (`vcardArray[1]`).
fn extract_vcard_name(entity: &Value) -> Option<String> {
    entity
        .get("vcardArray")
        .and_then(|v| v.get(1))
        .and_then(Value::as_array)?
        .iter()
        .filter_map(Value::as_array)
        .find(|item| item.first().and_then(Value::as_str) == Some("fn"))
        .and_then(|item| item.get(3))
        .and_then(Value::as_str)
        .and_then(clean_field)
}

fn extract_entity_identifier(entity: &Value) -> Option<String> {
    entity
        .get("handle")
        .and_then(Value::as_str)
        .and_then(clean_field)
        .or_else(|| {
            entity
                .get("publicIds")
                .and_then(Value::as_array)
                .and_then(|ids| ids.first())
                .and_then(|id| id.get("identifier"))
                .and_then(Value::as_str)
                .and_then(clean_field)
        })
}
