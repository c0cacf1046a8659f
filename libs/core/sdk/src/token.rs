// [libs/core/sdk/src/token.rs]
//! Remaining-lifetime extraction for the bearer token reported by
//! `/healthz` (`token_remaining_seconds`): decode the JWT payload
//! segment and read its `exp` claim without validating the signature —
//! the broker already validated it on issuance.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

pub fn remaining_seconds(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    Some((claims.exp - Utc::now().timestamp()).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let payload = URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{exp}}}"));
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn reads_remaining_time_from_a_future_expiry() {
        let exp = Utc::now().timestamp() + 120;
        let remaining = remaining_seconds(&token_with_exp(exp)).unwrap();
        assert!((115..=120).contains(&remaining));
    }

    #[test]
    fn clamps_an_already_expired_token_to_zero() {
        let exp = Utc::now().timestamp() - 60;
        assert_eq!(remaining_seconds(&token_with_exp(exp)), Some(0));
    }

    #[test]
    fn malformed_tokens_yield_none() {
        assert_eq!(remaining_seconds("not-a-jwt"), None);
    }
}
