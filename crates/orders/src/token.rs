//! Lookup tokens for unauthenticated order retrieval.
//!
//! Without a secret the token is a plain SHA-256 digest of the order id, which
//! anyone who knows the id can recompute. Configure a secret to get an
//! HMAC-SHA256 token instead.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use common::OrderId;
use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Generates and verifies order lookup tokens.
#[derive(Clone, Default)]
pub struct HashToken {
    mac: Option<HmacSha256>,
}

impl HashToken {
    /// Token derived from the order id alone.
    pub fn unkeyed() -> Self {
        Self { mac: None }
    }

    /// Token authenticated with `secret`.
    pub fn keyed(secret: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: Some(HmacSha256::new_from_slice(secret.as_ref())?),
        })
    }

    pub fn is_keyed(&self) -> bool {
        self.mac.is_some()
    }

    /// Returns the URL-safe token for an order.
    pub fn generate(&self, order_id: &OrderId) -> String {
        let message = order_id.to_string();
        match &self.mac {
            Some(mac) => {
                let mut mac = mac.clone();
                mac.update(message.as_bytes());
                URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
            }
            None => URL_SAFE_NO_PAD.encode(Sha256::digest(message.as_bytes())),
        }
    }

    /// Returns true if `token` was generated for `order_id`. Never errors.
    pub fn verify(&self, order_id: &OrderId, token: &str) -> bool {
        let Ok(presented) = URL_SAFE_NO_PAD.decode(token) else {
            return false;
        };
        let message = order_id.to_string();
        match &self.mac {
            Some(mac) => {
                let mut mac = mac.clone();
                mac.update(message.as_bytes());
                mac.verify_slice(&presented).is_ok()
            }
            None => Sha256::digest(message.as_bytes()).as_slice() == presented.as_slice(),
        }
    }
}

impl std::fmt::Debug for HashToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashToken")
            .field("keyed", &self.is_keyed())
            .finish()
    }
}
