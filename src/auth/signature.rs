// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! HMAC-SHA256 webhook signatures.
//!
//! Signatures are computed over the exact body bytes on the wire. Never sign
//! or verify a re-serialized value: key order and whitespace may differ.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex signature against `payload` and `secret`.
///
/// Empty payload, signature or secret is a failed verification. The digest
/// comparison is constant-time; a length mismatch fails the same way as a
/// content mismatch.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    if payload.is_empty() || signature.is_empty() || secret.is_empty() {
        return false;
    }

    let expected = sign_payload(payload, secret);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = br#"{"event":"payment.success","platform":"hostsblue","data":{"transactionId":"tx_1"}}"#;
    const SECRET: &str = "whsec_3J9x0fQ";

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign_payload(b"what do ya want for nothing?", "Jefe"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn valid_signature_verifies() {
        let sig = sign_payload(PAYLOAD, SECRET);
        assert!(verify_signature(PAYLOAD, &sig, SECRET));
    }

    #[test]
    fn flipping_a_payload_byte_fails() {
        let sig = sign_payload(PAYLOAD, SECRET);
        for i in 0..PAYLOAD.len() {
            let mut tampered = PAYLOAD.to_vec();
            tampered[i] ^= 0x01;
            assert!(!verify_signature(&tampered, &sig, SECRET), "byte {i}");
        }
    }

    #[test]
    fn flipping_a_signature_byte_fails() {
        let sig = sign_payload(PAYLOAD, SECRET);
        for i in 0..sig.len() {
            let mut tampered = sig.clone().into_bytes();
            tampered[i] ^= 0x01;
            let tampered = String::from_utf8(tampered).unwrap();
            assert!(!verify_signature(PAYLOAD, &tampered, SECRET), "byte {i}");
        }
    }

    #[test]
    fn flipping_a_secret_byte_fails() {
        let sig = sign_payload(PAYLOAD, SECRET);
        for i in 0..SECRET.len() {
            let mut tampered = SECRET.as_bytes().to_vec();
            tampered[i] ^= 0x01;
            let tampered = String::from_utf8(tampered).unwrap();
            assert!(!verify_signature(PAYLOAD, &sig, &tampered), "byte {i}");
        }
    }

    #[test]
    fn length_mismatch_fails() {
        let sig = sign_payload(PAYLOAD, SECRET);
        assert!(!verify_signature(PAYLOAD, &sig[..sig.len() - 1], SECRET));
        assert!(!verify_signature(PAYLOAD, &format!("{sig}0"), SECRET));
    }

    #[test]
    fn empty_inputs_fail_without_panicking() {
        let sig = sign_payload(PAYLOAD, SECRET);
        assert!(!verify_signature(b"", &sig, SECRET));
        assert!(!verify_signature(PAYLOAD, "", SECRET));
        assert!(!verify_signature(PAYLOAD, &sig, ""));
    }

    #[test]
    fn uppercase_hex_is_rejected() {
        let sig = sign_payload(PAYLOAD, SECRET).to_uppercase();
        assert!(!verify_signature(PAYLOAD, &sig, SECRET));
    }
}
