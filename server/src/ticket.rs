//! JWT ticket issuance and validation.

use crate::now_secs;
use collab_kit_protocol::{Identity, TicketClaims};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

/// Ticket manager for JWT operations.
pub struct TicketManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_secs: u64,
}

impl TicketManager {
    pub fn new(secret: &[u8], expiry_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_secs,
        }
    }

    /// Issue a ticket binding an identity to its bearer.
    pub fn issue(&self, identity: Identity) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = TicketClaims {
            exp: now_secs() + self.expiry_secs,
            identity,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a ticket and recover the identity it carries.
    pub fn validate(&self, token: &str) -> Result<Identity, jsonwebtoken::errors::Error> {
        let data = decode::<TicketClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims.identity)
    }
}
