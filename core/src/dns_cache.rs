//! # DNS answer cache
//!
//! Short-lived ip→hostname mappings taken from observed DNS response
//! traffic. Entries expire after [`MAX_ANSWER_AGE`]; the cache is consulted
//! opportunistically when a host is created and never retried.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::host::Host;

/// Answers older than this are evicted before every cache operation.
pub const MAX_ANSWER_AGE: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct DnsAnswer {
    ip: String,
    hostname: String,
    seen_at: Instant,
}

#[derive(Debug, Default)]
pub struct DnsAnswerCache {
    answers: Vec<DnsAnswer>,
}

impl DnsAnswerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observed answer. Empty fields are ignored; an unexpired
    /// entry for the same ip wins over later answers.
    pub fn record(&mut self, ip: &str, hostname: &str) {
        self.record_at(ip, hostname, Instant::now());
    }

    pub fn lookup(&mut self, ip: &str) -> Option<&str> {
        self.lookup_at(ip, Instant::now())
    }

    /// First unexpired answer matching any of the host's addresses.
    pub fn lookup_for_host(&mut self, host: &Host) -> Option<&str> {
        self.lookup_for_host_at(host, Instant::now())
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    fn record_at(&mut self, ip: &str, hostname: &str, now: Instant) {
        if ip.is_empty() || hostname.is_empty() {
            return;
        }

        self.evict_expired(now);

        if self.answers.iter().any(|a| a.ip == ip) {
            return;
        }

        trace!("caching dns answer {ip} -> {hostname}");
        self.answers.push(DnsAnswer {
            ip: ip.to_string(),
            hostname: hostname.to_string(),
            seen_at: now,
        });
    }

    fn lookup_at(&mut self, ip: &str, now: Instant) -> Option<&str> {
        self.evict_expired(now);

        self.answers
            .iter()
            .find(|a| a.ip == ip)
            .map(|a| a.hostname.as_str())
    }

    fn lookup_for_host_at(&mut self, host: &Host, now: Instant) -> Option<&str> {
        if !host.has_any_ip() {
            return None;
        }

        self.evict_expired(now);

        self.answers
            .iter()
            .find(|a| host.has_addr_str(&a.ip))
            .map(|a| a.hostname.as_str())
    }

    fn evict_expired(&mut self, now: Instant) {
        self.answers
            .retain(|a| now.duration_since(a.seen_at) < MAX_ANSWER_AGE);
    }
}
