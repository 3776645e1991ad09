//! Built-in registration data for a handful of popular domains.
//!
//! Off by default. When enabled, matching lookups are answered without any
//! network I/O and labeled `STATIC` so callers can tell the data may be stale.

use crate::types::{CanonicalRecord, SourceProtocol};

/// `sourceServer` of records from this table.
pub const STATIC_SOURCE: &str = "built-in table";

/// Diagnostic attached to every static record.
pub const STATIC_NOTE: &str = "served from the built-in popular-domain table, data may be stale";

struct StaticEntry {
    domain: &'static str,
    registrar: &'static str,
    registered: &'static str,
    expires: &'static str,
    name_servers: &'static [&'static str],
    registrant: &'static str,
    status: &'static str,
}

#[rustfmt::skip]
const POPULAR_DOMAINS: &[StaticEntry] = &[
    StaticEntry {
        domain: "google.com",
        registrar: "MarkMonitor, Inc.",
        registered: "1997-09-15T04:00:00.000Z",
        expires: "2028-09-14T04:00:00.000Z",
        name_servers: &["ns1.google.com", "ns2.google.com", "ns3.google.com", "ns4.google.com"],
        registrant: "Google LLC",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "youtube.com",
        registrar: "MarkMonitor, Inc.",
        registered: "2005-02-15T05:00:00.000Z",
        expires: "2025-02-15T05:00:00.000Z",
        name_servers: &["ns1.google.com", "ns2.google.com", "ns3.google.com", "ns4.google.com"],
        registrant: "Google LLC",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "github.com",
        registrar: "MarkMonitor, Inc.",
        registered: "2007-10-09T18:20:50.000Z",
        expires: "2025-10-09T18:20:50.000Z",
        name_servers: &[
            "dns1.p08.nsone.net", "dns2.p08.nsone.net", "dns3.p08.nsone.net", "dns4.p08.nsone.net",
            "ns-1283.awsdns-32.org", "ns-1707.awsdns-21.co.uk", "ns-421.awsdns-52.com", "ns-520.awsdns-01.net",
        ],
        registrant: "GitHub, Inc.",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "microsoft.com",
        registrar: "MarkMonitor, Inc.",
        registered: "1991-05-02T04:00:00.000Z",
        expires: "2025-05-03T04:00:00.000Z",
        name_servers: &["ns1-205.azure-dns.com", "ns2-205.azure-dns.net", "ns3-205.azure-dns.org", "ns4-205.azure-dns.info"],
        registrant: "Microsoft Corporation",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "apple.com",
        registrar: "CSC Corporate Domains, Inc.",
        registered: "1987-02-19T05:00:00.000Z",
        expires: "2025-02-20T05:00:00.000Z",
        name_servers: &["adns1.apple.com", "adns2.apple.com", "adns3.apple.com", "adns4.apple.com"],
        registrant: "Apple Inc.",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "amazon.com",
        registrar: "MarkMonitor, Inc.",
        registered: "1994-11-01T05:00:00.000Z",
        expires: "2025-10-30T04:00:00.000Z",
        name_servers: &["pdns1.ultradns.net", "pdns6.ultradns.co.uk", "ns1.p31.dynect.net", "ns2.p31.dynect.net"],
        registrant: "Amazon Technologies, Inc.",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "facebook.com",
        registrar: "RegistrarSafe, LLC",
        registered: "1997-03-29T05:00:00.000Z",
        expires: "2025-03-30T04:00:00.000Z",
        name_servers: &["a.ns.facebook.com", "b.ns.facebook.com", "c.ns.facebook.com", "d.ns.facebook.com"],
        registrant: "Meta Platforms, Inc.",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "netflix.com",
        registrar: "MarkMonitor, Inc.",
        registered: "1997-08-29T04:00:00.000Z",
        expires: "2025-08-30T04:00:00.000Z",
        name_servers: &["ns-1371.awsdns-43.org", "ns-1984.awsdns-56.co.uk", "ns-407.awsdns-50.com", "ns-81.awsdns-10.net"],
        registrant: "Netflix, Inc.",
        status: "clientDeleteProhibited",
    },
    StaticEntry {
        domain: "whois.com",
        registrar: "NameCheap, Inc.",
        registered: "1995-08-31T04:00:00.000Z",
        expires: "2025-08-30T04:00:00.000Z",
        name_servers: &["dns1.registrar-servers.com", "dns2.registrar-servers.com"],
        registrant: "WHOIS.COM LLC",
        status: "clientTransferProhibited",
    },
];

/// Static record for a normalized domain, if the table has one.
pub fn static_record(domain: &str) -> Option<CanonicalRecord> {
    let entry = POPULAR_DOMAINS.iter().find(|e| e.domain == domain)?;

    let mut record = CanonicalRecord::new(entry.domain, SourceProtocol::Static, STATIC_SOURCE);
    record.registrar = Some(entry.registrar.to_string());
    record.registration_date = Some(entry.registered.to_string());
    record.expiry_date = Some(entry.expires.to_string());
    record.registrant = Some(entry.registrant.to_string());
    record.status = Some(entry.status.to_string());
    for ns in entry.name_servers {
        record.name_servers.insert(ns);
    }
    record.add_diagnostic(STATIC_NOTE);
    Some(record)
}

/// Domains covered by the table.
pub fn popular_domains() -> Vec<&'static str> {
    POPULAR_DOMAINS.iter().map(|e| e.domain).collect()
}
