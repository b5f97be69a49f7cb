//! Client identifier generation.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of one client registration.
///
/// Two connections logged in as the same account get different ids, so
/// logging one out leaves the other registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientId(u64);

static CLIENT_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ClientId {
    /// Generate the next unique id.
    pub fn next() -> Self {
        Self(CLIENT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", base36(self.0))
    }
}

/// Encode a number in lower-case base36.
fn base36(mut n: u64) -> String {
    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(13);
    while n > 0 {
        out.push(CHARS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
