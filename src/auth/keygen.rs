// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Credential generation.
//!
//! Tokens carry a class prefix so operators can tell keys from secrets at a
//! glance and secret scanners can match leaked values in logs.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};

use super::AuthError;

pub const API_KEY_PREFIX: &str = "sb_live_";
pub const API_SECRET_PREFIX: &str = "sb_secret_";

const API_KEY_BYTES: usize = 24;
const API_SECRET_BYTES: usize = 36;
const WEBHOOK_SECRET_BYTES: usize = 32;

fn random_token(len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::Internal("system RNG unavailable".to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// `sb_live_` followed by 32 URL-safe characters.
pub fn generate_api_key() -> Result<String, AuthError> {
    Ok(format!("{API_KEY_PREFIX}{}", random_token(API_KEY_BYTES)?))
}

/// `sb_secret_` followed by 48 URL-safe characters.
pub fn generate_api_secret() -> Result<String, AuthError> {
    Ok(format!("{API_SECRET_PREFIX}{}", random_token(API_SECRET_BYTES)?))
}

/// Shared secret for signing outbound webhook deliveries (256 bits).
pub fn generate_webhook_secret() -> Result<String, AuthError> {
    random_token(WEBHOOK_SECRET_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn api_keys_have_prefix_and_length() {
        let key = generate_api_key().unwrap();
        assert!(key.starts_with("sb_live_"));
        assert_eq!(key.len(), API_KEY_PREFIX.len() + 32);
    }

    #[test]
    fn api_secrets_have_prefix_and_length() {
        let secret = generate_api_secret().unwrap();
        assert!(secret.starts_with("sb_secret_"));
        assert_eq!(secret.len(), API_SECRET_PREFIX.len() + 48);
    }

    #[test]
    fn tokens_are_url_safe() {
        let key = generate_api_key().unwrap();
        let body = &key[API_KEY_PREFIX.len()..];
        assert!(body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn successive_generations_do_not_collide() {
        let keys: HashSet<_> = (0..256).map(|_| generate_api_key().unwrap()).collect();
        assert_eq!(keys.len(), 256);

        let secrets: HashSet<_> = (0..256).map(|_| generate_webhook_secret().unwrap()).collect();
        assert_eq!(secrets.len(), 256);
    }
}
