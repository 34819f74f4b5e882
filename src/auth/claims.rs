use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub email: String, // user email at issuance
    pub iat: i64,      // issued at (unix timestamp)
    pub exp: i64,      // expires at (unix timestamp)
    pub iss: String,   // issuer
    pub aud: String,   // audience
}

impl Claims {
    /// Expired once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
