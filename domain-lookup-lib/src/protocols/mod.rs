//! Protocol implementations for registration lookups.
//!
//! This module contains the RDAP and WHOIS clients, their response
//! normalizers, and the per-TLD server registry.

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// WHOIS protocol implementation
pub mod whois;

/// TLD to server mappings
pub mod registry;

pub use rdap::{normalize_rdap, RdapClient, RdapQuery};
pub use registry::{ServerRegistry, GENERIC_RDAP_BASE};
pub use whois::{
    indicates_rate_limited, indicates_unregistered, normalize_whois, WhoisClient, WhoisQuery,
};
