//! The lookup engine.
//!
//! `DomainLookup` turns a user-supplied domain into one canonical record:
//! normalize the input, consult the cache, resolve the TLD's servers, query
//! them according to the chosen mode, score the candidates and cache the
//! outcome. It never returns an error; failures become `ERROR` records.

use crate::cache::ResultCache;
use crate::concurrent::{race_first, RaceOutcome};
use crate::error::LookupError;
use crate::popular::static_record;
use crate::protocols::{
    indicates_rate_limited, indicates_unregistered, normalize_rdap, normalize_whois, RdapClient,
    RdapQuery, ServerRegistry, WhoisClient, WhoisQuery,
};
use crate::score::{is_informative, pick_best, score};
use crate::types::{CanonicalRecord, LookupConfig, LookupMode, WhoisServer};
use crate::utils::{extract_tld, normalize_domain_input};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Failures and notes collected while querying sources.
#[derive(Debug, Default)]
struct Attempts {
    errors: Vec<LookupError>,
    notes: Vec<String>,
    /// Servers that answered with a record holding no registration data.
    empty_answers: usize,
}

impl Attempts {
    fn failed(&mut self, protocol: &str, server: &str, error: LookupError) {
        warn!(protocol, server, error = %error, "attempt failed");
        self.notes.push(format!("{} {}: {}", protocol, server, error));
        self.errors.push(error);
    }

    fn note(&mut self, note: String) {
        self.notes.push(note);
    }

    fn empty_answer(&mut self, note: String) {
        self.empty_answers += 1;
        self.notes.push(note);
    }

    fn extend(&mut self, other: Attempts) {
        self.errors.extend(other.errors);
        self.notes.extend(other.notes);
        self.empty_answers += other.empty_answers;
    }

    /// The error a terminal record reports.
    ///
    /// `NotFound` only when every server that was asked answered 404.
    /// Anything else means the sources ran out.
    fn terminal_error(&self) -> LookupError {
        let all_not_found = self.empty_answers == 0
            && !self.errors.is_empty()
            && self.errors.iter().all(LookupError::is_not_found);
        match self.errors.last() {
            Some(last) if all_not_found => last.clone(),
            _ => LookupError::AllSourcesExhausted {
                attempts: self.notes.clone(),
            },
        }
    }
}

/// What one source (RDAP chain, WHOIS, static table) produced.
#[derive(Debug, Default)]
struct SourceOutcome {
    record: Option<CanonicalRecord>,
    attempts: Attempts,
}

/// Domain registration lookup engine.
///
/// Cheap to share: clients, registry and cache are all behind `Arc`s.
///
/// # Example
///
/// ```rust,no_run
/// use domain_lookup_lib::{DomainLookup, LookupMode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = DomainLookup::new()?;
///     let record = engine.lookup("https://www.example.com/", LookupMode::Auto).await;
///     println!("{} via {}", record.domain, record.source_protocol);
///     Ok(())
/// }
/// ```
pub struct DomainLookup {
    config: LookupConfig,
    registry: Arc<ServerRegistry>,
    cache: Arc<ResultCache>,
    rdap: Arc<dyn RdapQuery>,
    whois: Arc<dyn WhoisQuery>,
}

impl DomainLookup {
    /// Engine with default configuration, the built-in server table and the
    /// real network clients.
    pub fn new() -> Result<Self, LookupError> {
        Self::builder().build()
    }

    /// Engine with custom configuration.
    pub fn with_config(config: LookupConfig) -> Result<Self, LookupError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> DomainLookupBuilder {
        DomainLookupBuilder::default()
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Drop every cached record.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Look up a domain.
    ///
    /// Accepts URLs and mixed-case input. Never fails: invalid input,
    /// unsupported TLDs and exhausted sources all come back as records with
    /// `source_protocol == Error` and a diagnostic.
    ///
    /// Records for rejected input carry the trimmed input as their `domain`.
    /// Blank input has nothing to echo and uses [`EMPTY_INPUT`].
    pub async fn lookup(&self, input: &str, mode: LookupMode) -> CanonicalRecord {
        self.run(input, mode, true).await
    }

    /// Like [`lookup`](Self::lookup) but ignores any cached record. The
    /// fresh result still replaces the cache entry.
    pub async fn lookup_uncached(&self, input: &str, mode: LookupMode) -> CanonicalRecord {
        self.run(input, mode, false).await
    }

    /// Look up a domain with an overall deadline.
    ///
    /// When the deadline passes, all in-flight attempts are cancelled and a
    /// `Timeout` record is returned. That record is not cached.
    pub async fn lookup_with_deadline(
        &self,
        input: &str,
        mode: LookupMode,
        deadline: Duration,
    ) -> CanonicalRecord {
        match tokio::time::timeout(deadline, self.run(input, mode, true)).await {
            Ok(record) => record,
            Err(_) => {
                let domain = normalize_domain_input(input)
                    .unwrap_or_else(|_| rejected_label(input).to_lowercase());
                warn!(domain = %domain, ?deadline, "lookup deadline expired");
                CanonicalRecord::error(domain, &LookupError::timeout("caller deadline", deadline))
            }
        }
    }

    async fn run(&self, input: &str, mode: LookupMode, read_cache: bool) -> CanonicalRecord {
        let domain = match normalize_domain_input(input) {
            Ok(domain) => domain,
            Err(e) => {
                debug!(input, error = %e, "rejected input");
                return CanonicalRecord::error(rejected_label(input), &e);
            }
        };

        if read_cache {
            if let Some(hit) = self.cache.get(&domain) {
                debug!(domain = %domain, "cache hit");
                return hit;
            }
            debug!(domain = %domain, "cache miss");
        }

        let started = Instant::now();
        let record = self.resolve_and_query(&domain, mode).await;
        info!(
            domain = %domain,
            %mode,
            protocol = %record.source_protocol,
            score = score(&record),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lookup finished"
        );

        self.cache.put(&domain, record.clone());
        record
    }

    async fn resolve_and_query(&self, domain: &str, mode: LookupMode) -> CanonicalRecord {
        if self.config.use_static_table && mode != LookupMode::Race {
            if let Some(record) = static_record(domain) {
                debug!(domain, "answered from static table");
                return record;
            }
        }

        let tld = match extract_tld(domain) {
            Ok(tld) => tld,
            Err(e) => return CanonicalRecord::error(domain, &e),
        };
        let rdap_bases = self
            .registry
            .rdap_candidates(&tld, self.config.generic_rdap_fallback);
        let whois = self.registry.whois_server(&tld).cloned();

        let unsupported = match mode {
            LookupMode::RdapOnly => rdap_bases.is_empty(),
            LookupMode::WhoisOnly => whois.is_none(),
            LookupMode::Auto | LookupMode::Race => rdap_bases.is_empty() && whois.is_none(),
        };
        if unsupported {
            return CanonicalRecord::error(domain, &LookupError::unsupported_tld(tld));
        }

        match mode {
            LookupMode::RdapOnly => self.rdap_only(domain, &rdap_bases).await,
            LookupMode::WhoisOnly => match whois {
                Some(server) => self.whois_only(domain, &server).await,
                None => CanonicalRecord::error(domain, &LookupError::unsupported_tld(tld)),
            },
            LookupMode::Auto => self.auto(domain, &tld, &rdap_bases, whois.as_ref()).await,
            LookupMode::Race => self.race(domain, &rdap_bases, whois.as_ref()).await,
        }
    }

    async fn rdap_only(&self, domain: &str, bases: &[String]) -> CanonicalRecord {
        let mut outcome = self.rdap_source(domain, bases).await;
        match outcome.record.take() {
            Some(record) if is_informative(&record) => finish(record, outcome.attempts),
            _ => terminal(domain, &outcome.attempts),
        }
    }

    async fn whois_only(&self, domain: &str, server: &WhoisServer) -> CanonicalRecord {
        let outcome = self.whois_source(domain, server).await;
        if let Some(record) = outcome.record {
            return finish(record, outcome.attempts);
        }
        // A single attempt: report its own failure.
        match outcome.attempts.errors.as_slice() {
            [only] => CanonicalRecord::error(domain, only),
            _ => terminal(domain, &outcome.attempts),
        }
    }

    /// RDAP in priority order, then WHOIS if RDAP gave nothing useful.
    async fn auto(
        &self,
        domain: &str,
        tld: &str,
        bases: &[String],
        whois: Option<&WhoisServer>,
    ) -> CanonicalRecord {
        let mut attempts = Attempts::default();

        let rdap_record = if bases.is_empty() {
            attempts.note(format!("rdap: no RDAP service for .{}", tld));
            None
        } else {
            let outcome = self.rdap_source(domain, bases).await;
            attempts.extend(outcome.attempts);
            outcome.record
        };

        if let Some(record) = rdap_record.as_ref().filter(|r| is_informative(r)) {
            return finish(record.clone(), attempts);
        }

        debug!(domain, "rdap gave no registration data, trying whois");
        let whois_record = match whois {
            Some(server) => {
                let outcome = self.whois_source(domain, server).await;
                attempts.extend(outcome.attempts);
                outcome.record
            }
            None => {
                attempts.note(format!("whois: no WHOIS server for .{}", tld));
                None
            }
        };

        let chosen = match (rdap_record, whois_record) {
            (Some(rdap), Some(whois)) if score(&whois) > score(&rdap) => Some(whois),
            (Some(rdap), _) => Some(rdap),
            (None, whois) => whois,
        };

        match chosen {
            Some(record) => finish(record, attempts),
            None => terminal(domain, &attempts),
        }
    }

    /// Every source at once; the first informative answer wins.
    async fn race(
        &self,
        domain: &str,
        bases: &[String],
        whois: Option<&WhoisServer>,
    ) -> CanonicalRecord {
        let mut sources: Vec<BoxFuture<'_, SourceOutcome>> = Vec::new();

        if self.config.use_static_table {
            let domain = domain.to_string();
            sources.push(
                async move {
                    SourceOutcome {
                        record: static_record(&domain),
                        attempts: Attempts::default(),
                    }
                }
                .boxed(),
            );
        }
        if !bases.is_empty() {
            sources.push(self.rdap_source(domain, bases).boxed());
        }
        if let Some(server) = whois {
            sources.push(self.whois_source(domain, server).boxed());
        }

        let accept = |o: &SourceOutcome| o.record.as_ref().is_some_and(is_informative);
        match race_first(sources, accept).await {
            RaceOutcome::Winner { value, .. } => {
                let mut attempts = value.attempts;
                let record = match value.record {
                    Some(record) => record,
                    None => return terminal(domain, &attempts),
                };
                debug!(domain, protocol = %record.source_protocol, "race won");
                attempts.note(format!("race won by {}", record.source_protocol));
                finish(record, attempts)
            }
            RaceOutcome::Exhausted(outcomes) => {
                let mut attempts = Attempts::default();
                let mut records = Vec::new();
                for (_, outcome) in outcomes {
                    attempts.extend(outcome.attempts);
                    records.extend(outcome.record);
                }
                match pick_best(records) {
                    Some(record) => finish(record, attempts),
                    None => terminal(domain, &attempts),
                }
            }
        }
    }

    /// Walk the RDAP bases in order, each with a fresh budget.
    ///
    /// Stops at the first informative record. Otherwise returns the first
    /// empty-but-valid record seen, if any.
    async fn rdap_source(&self, domain: &str, bases: &[String]) -> SourceOutcome {
        let mut outcome = SourceOutcome::default();
        let budget = self.config.rdap_timeout;

        for base in bases {
            debug!(domain, server = %base, protocol = "rdap", "attempt started");
            let result = match tokio::time::timeout(budget, self.rdap.query(domain, base, budget))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(LookupError::timeout(base.as_str(), budget)),
            };

            match result.and_then(|json| normalize_rdap(&json, domain, base)) {
                Ok(record) if is_informative(&record) => {
                    outcome.record = Some(record);
                    return outcome;
                }
                Ok(record) => {
                    outcome
                        .attempts
                        .empty_answer(format!("rdap {}: response carried no registration data", base));
                    outcome.record.get_or_insert(record);
                }
                Err(e) => outcome.attempts.failed("rdap", base, e),
            }
        }

        outcome
    }

    /// One WHOIS attempt against the TLD's server.
    async fn whois_source(&self, domain: &str, server: &WhoisServer) -> SourceOutcome {
        let mut outcome = SourceOutcome::default();
        let budget = self.config.whois_timeout;
        let label = server.to_string();

        debug!(domain, server = %label, protocol = "whois", "attempt started");
        let result = match tokio::time::timeout(budget, self.whois.query(domain, server, budget))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LookupError::timeout(label.as_str(), budget)),
        };

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                outcome.attempts.failed("whois", &label, e);
                return outcome;
            }
        };

        let record = normalize_whois(&text, domain, server);
        if !is_informative(&record) {
            if indicates_rate_limited(&text) {
                let error = LookupError::RateLimited {
                    server: label.clone(),
                };
                outcome.attempts.failed("whois", &label, error);
                return outcome;
            }
            if indicates_unregistered(&text) {
                outcome
                    .attempts
                    .failed("whois", &label, LookupError::not_found(label.as_str()));
                return outcome;
            }
            outcome
                .attempts
                .empty_answer(format!("whois {}: no recognizable registration fields", label));
        }

        outcome.record = Some(record);
        outcome
    }
}

/// `domain` of the error record for blank input.
pub const EMPTY_INPUT: &str = "(empty)";

fn rejected_label(input: &str) -> &str {
    match input.trim() {
        "" => EMPTY_INPUT,
        trimmed => trimmed,
    }
}

/// Attach the attempt notes to a successful record.
fn finish(mut record: CanonicalRecord, attempts: Attempts) -> CanonicalRecord {
    if !attempts.notes.is_empty() {
        record.add_diagnostic(attempts.notes.join("; "));
    }
    record
}

/// Terminal error record listing every attempt.
fn terminal(domain: &str, attempts: &Attempts) -> CanonicalRecord {
    let error = attempts.terminal_error();
    let mut record = CanonicalRecord::error(domain, &error);
    if !matches!(error, LookupError::AllSourcesExhausted { .. }) && attempts.notes.len() > 1 {
        record.diagnostic = Some(attempts.notes.join("; "));
    }
    record
}

/// Builder for [`DomainLookup`], used to inject clients, cache and registry.
#[derive(Default)]
pub struct DomainLookupBuilder {
    config: LookupConfig,
    registry: Option<Arc<ServerRegistry>>,
    cache: Option<Arc<ResultCache>>,
    rdap: Option<Arc<dyn RdapQuery>>,
    whois: Option<Arc<dyn WhoisQuery>>,
}

impl DomainLookupBuilder {
    pub fn config(mut self, config: LookupConfig) -> Self {
        self.config = config;
        self
    }

    /// Server table to use instead of the built-in one.
    pub fn registry(mut self, registry: ServerRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Share a cache between engines.
    pub fn cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn rdap_client<R: RdapQuery + 'static>(mut self, client: R) -> Self {
        self.rdap = Some(Arc::new(client));
        self
    }

    pub fn whois_client<W: WhoisQuery + 'static>(mut self, client: W) -> Self {
        self.whois = Some(Arc::new(client));
        self
    }

    /// Build the engine, creating real network clients where none were
    /// injected.
    pub fn build(self) -> Result<DomainLookup, LookupError> {
        let rdap: Arc<dyn RdapQuery> = match self.rdap {
            Some(client) => client,
            None => Arc::new(RdapClient::new(&self.config)?),
        };
        let whois: Arc<dyn WhoisQuery> = match self.whois {
            Some(client) => client,
            None => Arc::new(WhoisClient::new()),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ResultCache::new(self.config.cache_ttl)));
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ServerRegistry::builtin()));

        Ok(DomainLookup {
            config: self.config,
            registry,
            cache,
            rdap,
            whois,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{ServerMapping, SourceProtocol};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type RdapReply = Arc<dyn Fn(&str) -> Result<Value, LookupError> + Send + Sync>;
    type WhoisReply = Arc<dyn Fn() -> Result<String, LookupError> + Send + Sync>;

    /// Scripted RDAP client. `delay == None` hangs forever.
    #[derive(Clone)]
    struct FakeRdap {
        calls: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
        delay: Option<Duration>,
        reply: RdapReply,
    }

    impl FakeRdap {
        fn new(reply: impl Fn(&str) -> Result<Value, LookupError> + Send + Sync + 'static) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                completed: Arc::new(AtomicUsize::new(0)),
                delay: Some(Duration::ZERO),
                reply: Arc::new(reply),
            }
        }

        fn hanging() -> Self {
            Self {
                delay: None,
                ..Self::new(|_| Ok(json!({})))
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl RdapQuery for FakeRdap {
        async fn query(&self, _: &str, base: &str, _: Duration) -> Result<Value, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => std::future::pending::<()>().await,
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            (self.reply)(base)
        }
    }

    /// Scripted WHOIS client. `delay == None` hangs forever.
    #[derive(Clone)]
    struct FakeWhois {
        calls: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
        delay: Option<Duration>,
        reply: WhoisReply,
    }

    impl FakeWhois {
        fn new(reply: impl Fn() -> Result<String, LookupError> + Send + Sync + 'static) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                completed: Arc::new(AtomicUsize::new(0)),
                delay: Some(Duration::ZERO),
                reply: Arc::new(reply),
            }
        }

        fn text(text: &'static str) -> Self {
            Self::new(move || Ok(text.to_string()))
        }

        fn hanging() -> Self {
            Self {
                delay: None,
                ..Self::text(FULL_WHOIS)
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl WhoisQuery for FakeWhois {
        async fn query(&self, _: &str, _: &WhoisServer, _: Duration) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => std::future::pending::<()>().await,
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    const FULL_WHOIS: &str = "\
Domain Name: EXAMPLE.COM
Registrar: Example Registrar, LLC
Creation Date: 1995-08-14T04:00:00Z
Registry Expiry Date: 2030-08-13T04:00:00Z
Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited
Name Server: NS1.EXAMPLE.NET
Name Server: NS2.EXAMPLE.NET
";

    const RDAP_A: &str = "https://rdap-a.test";
    const RDAP_B: &str = "https://rdap-b.test/";

    fn full_rdap() -> Value {
        json!({
            "entities": [{
                "roles": ["registrar"],
                "vcardArray": ["vcard", [["fn", {}, "text", "Example Registrar"]]]
            }],
            "events": [
                {"eventAction": "registration", "eventDate": "2001-01-01"},
                {"eventAction": "expiration", "eventDate": "2031-01-01"}
            ],
            "nameservers": [{"ldhName": "ns1.example.com"}],
            "status": ["active"]
        })
    }

    fn registry() -> ServerRegistry {
        let mut registry = ServerRegistry::empty();
        registry.insert(
            "com",
            ServerMapping {
                rdap_bases: vec![RDAP_A.to_string(), RDAP_B.to_string()],
                whois: Some(WhoisServer::new("whois.test")),
            },
        );
        registry.insert(
            "rdaponly",
            ServerMapping {
                rdap_bases: vec![RDAP_A.to_string()],
                whois: None,
            },
        );
        registry
    }

    fn config() -> LookupConfig {
        LookupConfig::default().with_generic_rdap_fallback(false)
    }

    fn test_engine(rdap: FakeRdap, whois: FakeWhois) -> DomainLookup {
        engine_with(config(), rdap, whois)
    }

    fn engine_with(config: LookupConfig, rdap: FakeRdap, whois: FakeWhois) -> DomainLookup {
        DomainLookup::builder()
            .config(config)
            .registry(registry())
            .rdap_client(rdap)
            .whois_client(whois)
            .build()
            .unwrap()
    }

    fn calls(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_invalid_input_never_touches_the_network() {
        let rdap = FakeRdap::new(|_| Ok(full_rdap()));
        let whois = FakeWhois::text(FULL_WHOIS);
        let engine = test_engine(rdap.clone(), whois.clone());

        let long_label = format!("{}.com", "a".repeat(64));
        for input in ["192.168.1.1", "localhost", long_label.as_str()] {
            let record = engine.lookup(input, LookupMode::Auto).await;
            assert!(record.is_error());
            assert_eq!(record.failure, Some(ErrorKind::InvalidDomainSyntax));
        }

        assert_eq!(calls(&rdap.calls), 0);
        assert_eq!(calls(&whois.calls), 0);
        assert!(engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_gets_placeholder_domain() {
        let engine = test_engine(FakeRdap::new(|_| Ok(full_rdap())), FakeWhois::text(FULL_WHOIS));

        for input in ["", "   \t"] {
            let record = engine.lookup(input, LookupMode::Auto).await;
            assert_eq!(record.domain, EMPTY_INPUT);
            assert_eq!(record.failure, Some(ErrorKind::InvalidDomainSyntax));
        }

        let record = engine.lookup("  not_valid ", LookupMode::Auto).await;
        assert_eq!(record.domain, "not_valid");
    }

    #[tokio::test]
    async fn test_cached_lookups_skip_io_and_are_identical() {
        let rdap = FakeRdap::new(|_| Ok(full_rdap()));
        let whois = FakeWhois::text(FULL_WHOIS);
        let engine = test_engine(rdap.clone(), whois.clone());

        let first = engine.lookup("https://www.Example.com/x", LookupMode::Auto).await;
        let second = engine.lookup("example.com", LookupMode::Auto).await;

        assert_eq!(calls(&rdap.calls), 1);
        assert_eq!(calls(&whois.calls), 0);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        engine.lookup_uncached("example.com", LookupMode::Auto).await;
        assert_eq!(calls(&rdap.calls), 2);

        engine.clear_cache();
        engine.lookup("example.com", LookupMode::Auto).await;
        assert_eq!(calls(&rdap.calls), 3);
    }

    #[tokio::test]
    async fn test_auto_prefers_informative_rdap() {
        let rdap = FakeRdap::new(|_| Ok(full_rdap()));
        let whois = FakeWhois::text(FULL_WHOIS);
        let engine = test_engine(rdap.clone(), whois.clone());

        let record = engine.lookup("example.com", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Rdap);
        assert_eq!(record.source_server, RDAP_A);
        assert_eq!(record.registrar.as_deref(), Some("Example Registrar"));
        assert_eq!(calls(&whois.calls), 0);
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_whois_when_rdap_is_empty() {
        let rdap = FakeRdap::new(|_| Ok(json!({"objectClassName": "domain"})));
        let whois = FakeWhois::text(FULL_WHOIS);
        let engine = test_engine(rdap.clone(), whois.clone());

        let record = engine.lookup("example.com", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Whois);
        assert_eq!(record.registrar.as_deref(), Some("Example Registrar, LLC"));
        assert_eq!(record.status.as_deref(), Some("clientTransferProhibited"));
        assert_eq!(calls(&rdap.calls), 2);
        assert_eq!(calls(&whois.calls), 1);
        assert!(record.diagnostic.unwrap().contains("no registration data"));
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_whois_when_rdap_fails() {
        let rdap = FakeRdap::new(|base| {
            Err(LookupError::HttpStatus {
                server: base.to_string(),
                status: 503,
            })
        });
        let whois = FakeWhois::text(FULL_WHOIS);
        let engine = test_engine(rdap, whois);

        let record = engine.lookup("example.com", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Whois);
        let diagnostic = record.diagnostic.unwrap();
        assert!(diagnostic.contains("rdap https://rdap-a.test: HTTP 503"));
        assert!(diagnostic.contains("rdap https://rdap-b.test/: HTTP 503"));
    }

    #[tokio::test]
    async fn test_auto_keeps_empty_rdap_record_on_tie() {
        let rdap = FakeRdap::new(|_| Ok(json!({})));
        let whois = FakeWhois::text(
            "This is a long registry banner without any labelled registration fields at all.\n",
        );
        let engine = test_engine(rdap, whois);

        let record = engine.lookup("example.com", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Rdap);
        assert_eq!(score(&record), 0);
    }

    #[tokio::test]
    async fn test_auto_terminal_error_combines_both_protocols() {
        let rdap = FakeRdap::new(|base| Err(LookupError::connect(base, "refused")));
        let whois = FakeWhois::new(|| {
            Err(LookupError::EmptyResponse {
                server: "whois.test:43".into(),
                bytes: 0,
            })
        });
        let engine = test_engine(rdap, whois);

        let record = engine.lookup("example.com", LookupMode::Auto).await;
        assert!(record.is_error());
        assert_eq!(record.failure, Some(ErrorKind::AllSourcesExhausted));
        let diagnostic = record.diagnostic.unwrap();
        assert!(diagnostic.contains("rdap https://rdap-a.test"));
        assert!(diagnostic.contains("whois whois.test:43"));
        assert!(record.registrar.is_none());
    }

    #[tokio::test]
    async fn test_rdap_only_walks_bases_in_order() {
        let rdap = FakeRdap::new(|base| {
            if base == RDAP_A {
                Err(LookupError::HttpStatus {
                    server: base.to_string(),
                    status: 500,
                })
            } else {
                Ok(full_rdap())
            }
        });
        let whois = FakeWhois::text(FULL_WHOIS);
        let engine = test_engine(rdap.clone(), whois.clone());

        let record = engine.lookup("example.com", LookupMode::RdapOnly).await;
        assert_eq!(record.source_server, RDAP_B);
        assert_eq!(calls(&rdap.calls), 2);
        assert_eq!(calls(&whois.calls), 0);
        assert!(record.diagnostic.unwrap().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_rdap_only_all_404_is_not_found() {
        let rdap = FakeRdap::new(|base| Err(LookupError::not_found(base)));
        let engine = test_engine(rdap, FakeWhois::text(FULL_WHOIS));

        let record = engine.lookup("nope-123.com", LookupMode::RdapOnly).await;
        assert_eq!(record.failure, Some(ErrorKind::NotFound));
        assert!(record.diagnostic.unwrap().contains("rdap-b.test"));
    }

    #[tokio::test]
    async fn test_rdap_only_empty_records_are_terminal() {
        let rdap = FakeRdap::new(|_| Ok(json!({})));
        let engine = test_engine(rdap, FakeWhois::text(FULL_WHOIS));

        let record = engine.lookup("example.com", LookupMode::RdapOnly).await;
        assert!(record.is_error());
        assert_eq!(record.failure, Some(ErrorKind::AllSourcesExhausted));
    }

    #[tokio::test]
    async fn test_rdap_only_empty_answer_then_404_is_exhausted() {
        let rdap = FakeRdap::new(|base| {
            if base == RDAP_A {
                Ok(json!({}))
            } else {
                Err(LookupError::not_found(base))
            }
        });
        let engine = test_engine(rdap.clone(), FakeWhois::text(FULL_WHOIS));

        let record = engine.lookup("example.com", LookupMode::RdapOnly).await;
        assert_eq!(calls(&rdap.calls), 2);
        assert_eq!(record.failure, Some(ErrorKind::AllSourcesExhausted));
        let diagnostic = record.diagnostic.unwrap();
        assert!(diagnostic.contains("no registration data"));
        assert!(diagnostic.contains("rdap-b.test"));
    }

    #[tokio::test]
    async fn test_rdap_only_single_base_failure_is_exhausted() {
        let rdap = FakeRdap::new(|base| Err(LookupError::connect(base, "refused")));
        let engine = test_engine(rdap.clone(), FakeWhois::text(FULL_WHOIS));

        let record = engine.lookup("example.rdaponly", LookupMode::RdapOnly).await;
        assert_eq!(calls(&rdap.calls), 1);
        assert_eq!(record.failure, Some(ErrorKind::AllSourcesExhausted));
        assert!(record.diagnostic.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_whois_only() {
        let rdap = FakeRdap::new(|_| Ok(full_rdap()));
        let whois = FakeWhois::text(FULL_WHOIS);
        let engine = test_engine(rdap.clone(), whois.clone());

        let record = engine.lookup("example.com", LookupMode::WhoisOnly).await;
        assert_eq!(record.source_protocol, SourceProtocol::Whois);
        assert_eq!(record.source_server, "whois.test");
        assert_eq!(
            record.name_servers.as_slice(),
            &["ns1.example.net", "ns2.example.net"]
        );
        assert_eq!(calls(&rdap.calls), 0);
    }

    #[tokio::test]
    async fn test_whois_text_signals() {
        let no_match = FakeWhois::text("No match for \"NOPE-123.COM\".\r\n>>> Last update of whois database <<<\r\n");
        let engine = test_engine(FakeRdap::new(|_| Ok(full_rdap())), no_match);
        let record = engine.lookup("nope-123.com", LookupMode::WhoisOnly).await;
        assert_eq!(record.failure, Some(ErrorKind::NotFound));

        let limited = FakeWhois::text("Query rate exceeded. Too many requests, try again later.\r\n");
        let engine = engine_with(config(), FakeRdap::new(|_| Ok(full_rdap())), limited);
        let record = engine.lookup("example.com", LookupMode::WhoisOnly).await;
        assert_eq!(record.failure, Some(ErrorKind::RateLimited));
    }

    #[tokio::test]
    async fn test_unsupported_tld() {
        let engine = test_engine(FakeRdap::new(|_| Ok(full_rdap())), FakeWhois::text(FULL_WHOIS));

        let record = engine.lookup("example.zz", LookupMode::Auto).await;
        assert_eq!(record.failure, Some(ErrorKind::UnsupportedTld));

        let record = engine.lookup("example.rdaponly", LookupMode::WhoisOnly).await;
        assert_eq!(record.failure, Some(ErrorKind::UnsupportedTld));

        let record = engine.lookup("example.rdaponly", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Rdap);
    }

    #[tokio::test]
    async fn test_generic_fallback_serves_unknown_tlds() {
        let rdap = FakeRdap::new(|_| Ok(full_rdap()));
        let engine = engine_with(
            LookupConfig::default(),
            rdap.clone(),
            FakeWhois::text(FULL_WHOIS),
        );

        let record = engine.lookup("example.zz", LookupMode::Auto).await;
        assert_eq!(record.source_server, crate::protocols::GENERIC_RDAP_BASE);
        assert_eq!(calls(&rdap.calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_sources_are_bounded_by_attempt_budgets() {
        let config = config()
            .with_rdap_timeout(Duration::from_secs(10))
            .with_whois_timeout(Duration::from_secs(8));
        let rdap = FakeRdap::hanging();
        let whois = FakeWhois::hanging();
        let engine = engine_with(config, rdap.clone(), whois.clone());

        let started = Instant::now();
        let record = engine.lookup("example.com", LookupMode::Auto).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(28));
        assert!(elapsed <= Duration::from_secs(29));
        assert_eq!(calls(&rdap.calls), 2);
        assert_eq!(calls(&whois.calls), 1);
        assert_eq!(record.failure, Some(ErrorKind::AllSourcesExhausted));
        assert!(record.diagnostic.unwrap().contains("Timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_and_is_not_cached() {
        let rdap = FakeRdap::hanging();
        let engine = test_engine(rdap.clone(), FakeWhois::hanging());

        let started = Instant::now();
        let record = engine
            .lookup_with_deadline("example.com", LookupMode::Auto, Duration::from_secs(3))
            .await;

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(record.failure, Some(ErrorKind::Timeout));
        assert_eq!(record.domain, "example.com");
        assert!(engine.cache().is_empty());
        assert_eq!(calls(&rdap.completed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_returns_first_informative_and_cancels_losers() {
        let rdap = FakeRdap::new(|_| Ok(full_rdap())).delayed(Duration::from_secs(5));
        let whois = FakeWhois::text(FULL_WHOIS).delayed(Duration::from_millis(100));
        let engine = test_engine(rdap.clone(), whois.clone());

        let record = engine.lookup("example.com", LookupMode::Race).await;
        assert_eq!(record.source_protocol, SourceProtocol::Whois);
        assert!(record.diagnostic.unwrap().contains("race won by WHOIS"));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls(&rdap.calls), 1);
        assert_eq!(calls(&rdap.completed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_without_informative_answers() {
        let rdap = FakeRdap::new(|_| Ok(json!({})));
        let whois = FakeWhois::new(|| Err(LookupError::network("whois.test:43", "reset")));
        let engine = test_engine(rdap, whois);

        let record = engine.lookup("example.com", LookupMode::Race).await;
        assert_eq!(record.source_protocol, SourceProtocol::Rdap);
        assert!(record.diagnostic.unwrap().contains("whois whois.test:43"));

        let failing = FakeRdap::new(|base| Err(LookupError::not_found(base)));
        let whois = FakeWhois::new(|| Err(LookupError::network("whois.test:43", "reset")));
        let engine = test_engine(failing, whois);
        let record = engine.lookup("example.com", LookupMode::Race).await;
        assert_eq!(record.failure, Some(ErrorKind::AllSourcesExhausted));
    }

    #[tokio::test]
    async fn test_static_table_when_enabled() {
        let rdap = FakeRdap::new(|_| Ok(full_rdap()));
        let engine = engine_with(
            config().with_static_table(true),
            rdap.clone(),
            FakeWhois::text(FULL_WHOIS),
        );

        let record = engine.lookup("google.com", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Static);
        assert_eq!(calls(&rdap.calls), 0);

        let record = engine.lookup("example.com", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Rdap);

        let disabled = test_engine(rdap.clone(), FakeWhois::text(FULL_WHOIS));
        let record = disabled.lookup("google.com", LookupMode::Auto).await;
        assert_eq!(record.source_protocol, SourceProtocol::Rdap);
    }
}
