use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mailverify_lib::cache::{CacheKey, ManualClock};
use mailverify_lib::config::{LEVEL_KEY, VERIFY_EMAIL_KEY};
use mailverify_lib::{
    CacheStore, EmailAddress, INVALID_TTL, MemoryStore, MxError, MxLookup, MxRecord, Outcome,
    Pipeline, ProbeRequest, Sender, SmtpDetails, SmtpProber, StaticConfig, VALID_TTL,
    VerificationCache, VerificationLogger,
};
use parking_lot::Mutex;

struct FixedMx(Vec<MxRecord>);

impl MxLookup for FixedMx {
    fn lookup_mx(&self, _domain: &str) -> Result<Vec<MxRecord>, MxError> {
        Ok(self.0.clone())
    }
}

struct FixedProbe {
    details: SmtpDetails,
    calls: Arc<AtomicUsize>,
    last_sender: Arc<Mutex<Option<String>>>,
}

impl SmtpProber for FixedProbe {
    fn probe(&self, request: &ProbeRequest<'_>) -> SmtpDetails {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Sender::Address(sender) = request.sender {
            *self.last_sender.lock() = Some(sender.to_string());
        }
        self.details.clone()
    }
}

#[derive(Clone, Default)]
struct Messages(Arc<Mutex<Vec<String>>>);

impl VerificationLogger for Messages {
    fn error(&self, message: &str, _context: Option<&serde_json::Value>) {
        self.0.lock().push(message.to_string());
    }
}

struct Setup {
    pipeline: Pipeline,
    store: Arc<MemoryStore>,
    messages: Messages,
    probes: Arc<AtomicUsize>,
    last_sender: Arc<Mutex<Option<String>>>,
}

fn setup(level: &str, records: Vec<MxRecord>, details: SmtpDetails) -> Setup {
    let store = Arc::new(MemoryStore::with_clock(Arc::new(ManualClock::default())));
    let messages = Messages::default();
    let probes = Arc::new(AtomicUsize::new(0));
    let last_sender = Arc::new(Mutex::new(None));
    let config = StaticConfig::new()
        .with(LEVEL_KEY, level)
        .with(VERIFY_EMAIL_KEY, "checker@example.org");
    let pipeline = Pipeline::new(
        config,
        FixedMx(records),
        FixedProbe {
            details,
            calls: Arc::clone(&probes),
            last_sender: Arc::clone(&last_sender),
        },
        VerificationCache::from_shared(store.clone()),
    )
    .with_logger(messages.clone());
    Setup {
        pipeline,
        store,
        messages,
        probes,
        last_sender,
    }
}

fn mx() -> Vec<MxRecord> {
    vec![MxRecord::new(10, "mx.example.com")]
}

fn deliverable() -> SmtpDetails {
    SmtpDetails {
        can_connect: true,
        is_deliverable: true,
        ..SmtpDetails::default()
    }
}

fn ttl(store: &MemoryStore, key: &CacheKey) -> Option<std::time::Duration> {
    store.remaining_ttl(key.as_str())
}

#[test]
fn malformed_domain_is_rejected_without_caching() {
    let s = setup("smtp", mx(), deliverable());
    assert!(!s.pipeline.validate_email("foo@bar.invalidtld"));
    assert!(s.store.is_empty());
    assert_eq!(s.probes.load(Ordering::SeqCst), 0);
}

#[test]
fn domain_without_mx_is_cached_negative() {
    let s = setup("smtp", Vec::new(), deliverable());
    assert!(!s.pipeline.validate_email("user@example.com"));

    let key = CacheKey::domain("example.com");
    assert_eq!(s.store.get(key.as_str()).expect("get"), Some("false".to_string()));
    assert_eq!(ttl(&s.store, &key), Some(INVALID_TTL));
    assert!(s.messages.0.lock()[0].contains("no mx records"));
}

#[test]
fn dns_level_accepts_routable_domain() {
    let s = setup("", mx(), SmtpDetails::default());
    let verification = s.pipeline.verify("user@example.com");
    assert!(verification.is_valid());
    assert!(matches!(verification.outcome, Outcome::ConfiguredSkip { .. }));
    assert!(s.store.is_empty());
}

#[test]
fn deliverable_mailbox_is_cached_for_a_day() {
    let s = setup("smtp", mx(), deliverable());
    assert!(s.pipeline.validate_email("user@example.com"));

    let address = CacheKey::address(&EmailAddress::new("user@example.com"));
    assert_eq!(ttl(&s.store, &address), Some(VALID_TTL));
    assert_eq!(ttl(&s.store, &CacheKey::domain("example.com")), Some(VALID_TTL));
    assert_eq!(s.last_sender.lock().as_deref(), Some("checker@example.org"));

    // second call is a cache hit
    assert!(s.pipeline.validate_email("USER@example.com"));
    assert_eq!(s.probes.load(Ordering::SeqCst), 1);
}

#[test]
fn full_inbox_is_cached_negative_for_an_hour() {
    let details = SmtpDetails {
        has_full_inbox: true,
        ..deliverable()
    };
    let s = setup("smtp", mx(), details);
    assert!(!s.pipeline.validate_email("user@example.com"));

    let address = CacheKey::address(&EmailAddress::new("user@example.com"));
    assert_eq!(s.store.get(address.as_str()).expect("get"), Some("false".to_string()));
    assert_eq!(ttl(&s.store, &address), Some(INVALID_TTL));
    assert_eq!(s.messages.0.lock().len(), 1);
}
