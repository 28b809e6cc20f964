//! URL signing
//!
//! The string to sign is six newline-terminated fields, in this order:
//!
//! ```text
//! file \n resource_id \n issued_at \n valid_for \n adjusted_format \n client_id \n
//! ```
//!
//! signed with HMAC-SHA256 under the client secret and hex encoded.
//! Reordering the fields invalidates every URL already issued.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

pub mod clients;
pub mod clock;

pub use clients::ClientRegistry;
pub use clock::{Clock, FixedClock, SystemClock};

type HmacSha256 = Hmac<Sha256>;

/// Inputs of one signature
#[derive(Clone, Copy)]
pub struct SigningContext<'a> {
    pub file: &'a str,
    pub resource_id: &'a str,
    pub issued_at: i64,
    pub valid_for: u64,
    pub adjusted_format: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a [u8],
}

impl fmt::Debug for SigningContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("file", &self.file)
            .field("resource_id", &self.resource_id)
            .field("issued_at", &self.issued_at)
            .field("valid_for", &self.valid_for)
            .field("adjusted_format", &self.adjusted_format)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl SigningContext<'_> {
    pub fn string_to_sign(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n",
            self.file,
            self.resource_id,
            self.issued_at,
            self.valid_for,
            self.adjusted_format,
            self.client_id
        )
    }

    fn mac(&self) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(self.client_secret).expect("HMAC can take key of any size");
        mac.update(self.string_to_sign().as_bytes());
        mac
    }
}

/// Compute the hex-encoded signature
pub fn sign(ctx: &SigningContext<'_>) -> String {
    hex::encode(ctx.mac().finalize().into_bytes())
}

/// Check a candidate signature in constant time
pub fn verify(ctx: &SigningContext<'_>, candidate: &str) -> bool {
    let Ok(candidate) = hex::decode(candidate) else {
        return false;
    };
    ctx.mac().verify_slice(&candidate).is_ok()
}

/// `issued_at + valid_for < now`; the last second of the window is still valid
pub fn is_expired(issued_at: i64, valid_for: u64, now: i64) -> bool {
    let valid_for = i64::try_from(valid_for).unwrap_or(i64::MAX);
    issued_at.saturating_add(valid_for) < now
}
