//! A single upstream endpoint and its live request metrics.
//!
//! [`Target`] identity (resolved address, optional base-URI) is
//! immutable after startup; the request path only touches the metric
//! counters. Health state lives in the group's supervisor, never here.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// EWMA smoothing factor for the time-to-first-byte average.
pub const TTFB_ALPHA: f64 = 0.2;

#[derive(Debug)]
pub struct Target {
    id: String,
    addr: SocketAddr,
    base_uri: String,
    weight: u32,

    active_connections: AtomicUsize,
    ttfb: Mutex<TtfbEwma>,
}

#[derive(Debug, Default, Clone, Copy)]
struct TtfbEwma {
    avg_ms: f64,
    samples: u64,
}

impl Target {
    /// `base_uri` is normalized to no trailing slash, so joining with a
    /// `/`-rooted remainder never doubles the separator.
    #[must_use]
    pub fn new(addr: SocketAddr, base_uri: Option<&str>, weight: u32) -> Self {
        let base_uri = match base_uri {
            None | Some("/") | Some("") => String::new(),
            Some(base) => base.trim_end_matches('/').to_string(),
        };

        Self {
            id: addr.to_string(),
            addr,
            base_uri,
            weight,
            active_connections: AtomicUsize::new(0),
            ttfb: Mutex::new(TtfbEwma::default()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }

    /// Full upstream URI for an already-rewritten path remainder. An
    /// empty remainder forwards as the base-URI alone, or `/` when the
    /// target has none.
    #[must_use]
    pub fn uri_for(&self, remainder: &str, query: Option<&str>) -> String {
        let path = if remainder.is_empty() {
            if self.base_uri.is_empty() {
                "/"
            } else {
                &self.base_uri
            }
            .to_string()
        } else {
            format!("{}{remainder}", self.base_uri)
        };

        match query {
            Some(q) => format!("http://{}{path}?{q}", self.addr),
            None => format!("http://{}{path}", self.addr),
        }
    }

    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn begin_request(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// `ttfb_ms` is `None` when the upstream errored before responding;
    /// the connection count still drops but no sample is recorded.
    pub fn end_request(&self, ttfb_ms: Option<f64>) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);

        if let Some(observed) = ttfb_ms {
            let mut ewma = self.ttfb.lock().expect("ttfb lock poisoned");
            if ewma.samples == 0 {
                ewma.avg_ms = observed;
            } else {
                ewma.avg_ms = TTFB_ALPHA * observed + (1.0 - TTFB_ALPHA) * ewma.avg_ms;
            }
            ewma.samples += 1;
        }
    }

    #[must_use]
    pub fn avg_ttfb_ms(&self) -> f64 {
        self.ttfb.lock().expect("ttfb lock poisoned").avg_ms
    }

    /// Least-response-time metric: `active_connections × avg_ttfb_ms`.
    /// A target with no samples scores 0, so cold targets are preferred
    /// until they acquire samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn load_score(&self) -> f64 {
        let ewma = *self.ttfb.lock().expect("ttfb lock poisoned");
        if ewma.samples == 0 {
            return 0.0;
        }
        self.active_connections() as f64 * ewma.avg_ms
    }
}
