//! Anti-forgery nonces for AJAX follow-up requests.
//!
//! Nonces are stateless: an HMAC-SHA256 over the action name and a time
//! tick. A tick lasts half the configured lifetime and a nonce verifies
//! during its own tick and the next one, so every nonce stays valid for
//! at least half and at most the full lifetime.

use anyhow::{Context, Result, bail};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Hex characters kept from the MAC.
const NONCE_LEN: usize = 20;

/// Shortest accepted secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Issues and verifies action-bound nonces.
#[derive(Clone)]
pub struct NonceService {
    secret: Vec<u8>,
    lifetime_secs: i64,
}

impl std::fmt::Debug for NonceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceService")
            .field("secret", &"[redacted]")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

impl NonceService {
    /// Create a service. The secret must be at least [`MIN_SECRET_LEN`]
    /// bytes and the lifetime at least two seconds.
    pub fn new(secret: impl Into<Vec<u8>>, lifetime_secs: i64) -> Result<Self> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            bail!("nonce secret must be at least {MIN_SECRET_LEN} bytes");
        }
        if lifetime_secs < 2 {
            bail!("nonce lifetime must be at least 2 seconds");
        }
        // Reject secrets the MAC cannot key up front, so signing never fails later.
        Hmac::<Sha256>::new_from_slice(&secret).context("invalid nonce secret")?;
        Ok(Self {
            secret,
            lifetime_secs,
        })
    }

    /// Issue a nonce for `action` now.
    pub fn create(&self, action: &str) -> String {
        self.create_at(action, chrono::Utc::now().timestamp())
    }

    /// Verify a nonce for `action` now.
    pub fn verify(&self, nonce: &str, action: &str) -> bool {
        self.verify_at(nonce, action, chrono::Utc::now().timestamp())
    }

    /// Issue a nonce for `action` at Unix time `now`.
    pub fn create_at(&self, action: &str, now: i64) -> String {
        self.sign(self.tick(now), action)
    }

    /// Verify a nonce for `action` at Unix time `now`.
    pub fn verify_at(&self, nonce: &str, action: &str, now: i64) -> bool {
        if nonce.len() != NONCE_LEN {
            return false;
        }
        let tick = self.tick(now);
        [tick, tick - 1]
            .into_iter()
            .any(|t| bool::from(self.sign(t, action).as_bytes().ct_eq(nonce.as_bytes())))
    }

    /// Half-lifetime window index containing `now`.
    fn tick(&self, now: i64) -> i64 {
        let half = self.lifetime_secs / 2;
        now.div_euclid(half) + i64::from(now.rem_euclid(half) != 0)
    }

    fn sign(&self, tick: i64, action: &str) -> String {
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&self.secret) else {
            // Unreachable: the key was validated in `new`.
            return String::new();
        };
        mac.update(tick.to_string().as_bytes());
        mac.update(b"|");
        mac.update(action.as_bytes());
        let mut signature = hex::encode(mac.finalize().into_bytes());
        signature.truncate(NONCE_LEN);
        signature
    }
}
