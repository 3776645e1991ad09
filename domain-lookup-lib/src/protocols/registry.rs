//! TLD to server mappings.
//!
//! This module maps top-level domains to their RDAP base URLs and WHOIS
//! servers. The built-in table is compiled in; configuration can override
//! or extend it before the registry is shared with the engine.

use crate::types::{ServerMapping, WhoisServer};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Generic RDAP redirector, used when configured as a last resort.
pub const GENERIC_RDAP_BASE: &str = "https://rdap.org";

/// (tld, RDAP bases in priority order, WHOIS host)
type BuiltinEntry = (&'static str, &'static [&'static str], Option<&'static str>);

const IDENTITY_DIGITAL: &str = "https://rdap.identitydigital.services/rdap";
const GOOGLE_REGISTRY: &str = "https://pubapi.registry.google/rdap";

#[rustfmt::skip]
const BUILTIN_SERVERS: &[BuiltinEntry] = &[
    // Generic TLDs
    ("com", &["https://rdap.verisign.com/com/v1"], Some("whois.verisign-grs.com")),
    ("net", &["https://rdap.verisign.com/net/v1"], Some("whois.verisign-grs.com")),
    ("org", &["https://rdap.publicinterestregistry.org/rdap"], Some("whois.pir.org")),
    ("info", &[IDENTITY_DIGITAL], Some("whois.afilias.net")),
    ("biz", &["https://rdap.nic.biz"], Some("whois.nic.biz")),
    ("name", &[], Some("whois.nic.name")),
    ("mobi", &[], Some("whois.dotmobiregistry.net")),
    ("xyz", &["https://rdap.centralnic.com/xyz"], Some("whois.nic.xyz")),
    ("app", &[GOOGLE_REGISTRY], Some("whois.nic.google")),
    ("dev", &[GOOGLE_REGISTRY], Some("whois.nic.google")),
    ("page", &[GOOGLE_REGISTRY], Some("whois.nic.google")),
    // ccTLDs run as generics
    ("io", &[IDENTITY_DIGITAL], Some("whois.nic.io")),
    ("ai", &[IDENTITY_DIGITAL], Some("whois.nic.ai")),
    ("me", &[IDENTITY_DIGITAL], Some("whois.nic.me")),
    ("co", &[], Some("whois.nic.co")),
    ("tv", &["https://rdap.nic.tv"], Some("whois.nic.tv")),
    ("cc", &["https://tld-rdap.verisign.com/cc/v1"], Some("whois.nic.cc")),
    ("ly", &[], Some("whois.nic.ly")),
    // Asia-Pacific
    ("cn", &[], Some("whois.cnnic.cn")),
    ("tw", &[], Some("whois.twnic.net.tw")),
    ("hk", &[], Some("whois.hkirc.hk")),
    ("jp", &[], Some("whois.jprs.jp")),
    ("kr", &[], Some("whois.kr")),
    ("sg", &[], Some("whois.sgnic.sg")),
    ("my", &[], Some("whois.mynic.my")),
    ("th", &[], Some("whois.thnic.co.th")),
    ("in", &["https://rdap.nixiregistry.in/rdap"], Some("whois.registry.in")),
    ("au", &["https://rdap.cctld.au/rdap"], Some("whois.auda.org.au")),
    ("nz", &[], Some("whois.srs.net.nz")),
    // Europe
    ("uk", &["https://rdap.nominet.uk"], Some("whois.nic.uk")),
    ("de", &["https://rdap.denic.de"], Some("whois.denic.de")),
    ("fr", &["https://rdap.nic.fr"], Some("whois.nic.fr")),
    ("it", &[], Some("whois.nic.it")),
    ("es", &[], Some("whois.nic.es")),
    ("nl", &["https://rdap.sidn.nl"], Some("whois.domain-registry.nl")),
    ("be", &[], Some("whois.dns.be")),
    ("ch", &[], Some("whois.nic.ch")),
    ("at", &[], Some("whois.nic.at")),
    ("pl", &[], Some("whois.dns.pl")),
    ("ru", &[], Some("whois.tcinet.ru")),
    // Americas
    ("us", &["https://rdap.nic.us"], Some("whois.nic.us")),
    ("ca", &["https://rdap.ca.fury.ca/rdap"], Some("whois.cira.ca")),
    ("mx", &[], Some("whois.mx")),
    ("br", &["https://rdap.registro.br"], Some("whois.registro.br")),
    ("ar", &[], Some("whois.nic.ar")),
    ("cl", &[], Some("whois.nic.cl")),
];

lazy_static! {
    static ref BUILTIN_MAPPINGS: HashMap<String, ServerMapping> = BUILTIN_SERVERS
        .iter()
        .map(|(tld, rdap, whois)| {
            let mapping = ServerMapping {
                rdap_bases: rdap.iter().map(|base| base.to_string()).collect(),
                whois: whois.map(WhoisServer::new),
            };
            (tld.to_string(), mapping)
        })
        .collect();
}

/// Read-only table of per-TLD servers.
///
/// Build it once (built-in table plus overrides), wrap it in an `Arc` and
/// hand it to the engine; it is never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    mappings: HashMap<String, ServerMapping>,
}

impl ServerRegistry {
    /// Registry with the built-in table.
    pub fn builtin() -> Self {
        Self {
            mappings: BUILTIN_MAPPINGS.clone(),
        }
    }

    /// Registry without any TLDs (useful for tests and custom deployments).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the full mapping for a TLD, replacing any existing entry.
    pub fn insert<T: AsRef<str>>(&mut self, tld: T, mapping: ServerMapping) {
        self.mappings.insert(normalize_tld(tld.as_ref()), mapping);
    }

    /// Override parts of a TLD's mapping.
    ///
    /// `None` keeps the existing value; unknown TLDs are added.
    pub fn apply_override<T: AsRef<str>>(
        &mut self,
        tld: T,
        rdap_bases: Option<Vec<String>>,
        whois: Option<WhoisServer>,
    ) {
        let entry = self.mappings.entry(normalize_tld(tld.as_ref())).or_default();
        if let Some(bases) = rdap_bases {
            entry.rdap_bases = bases
                .into_iter()
                .map(|base| base.trim().trim_end_matches('/').to_string())
                .collect();
        }
        if let Some(server) = whois {
            entry.whois = Some(server);
        }
    }

    /// Look up the servers for a TLD.
    pub fn resolve(&self, tld: &str) -> Option<&ServerMapping> {
        self.mappings.get(&normalize_tld(tld))
    }

    /// RDAP bases to try for a TLD, in order.
    ///
    /// With `generic_fallback`, the generic redirector is appended (once),
    /// which also covers TLDs missing from the table.
    pub fn rdap_candidates(&self, tld: &str, generic_fallback: bool) -> Vec<String> {
        let mut bases = self
            .resolve(tld)
            .map(|m| m.rdap_bases.clone())
            .unwrap_or_default();
        if generic_fallback && !bases.iter().any(|b| b == GENERIC_RDAP_BASE) {
            bases.push(GENERIC_RDAP_BASE.to_string());
        }
        bases
    }

    /// WHOIS server for a TLD, if any.
    pub fn whois_server(&self, tld: &str) -> Option<&WhoisServer> {
        self.resolve(tld).and_then(|m| m.whois.as_ref())
    }

    /// All TLDs with a mapping, sorted alphabetically.
    pub fn known_tlds(&self) -> Vec<String> {
        let mut tlds: Vec<String> = self.mappings.keys().cloned().collect();
        tlds.sort();
        tlds
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

fn normalize_tld(tld: &str) -> String {
    tld.trim().trim_start_matches('.').to_lowercase()
}
