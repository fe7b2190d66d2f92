//! Request signing for the Atlantic.Net Cloud API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::hmac;

/// Signs a request: base64 of HMAC-SHA256 over `timestamp || rndguid`,
/// keyed with the account's API secret.
#[must_use]
pub fn sign(secret: &str, timestamp: &str, rndguid: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let mut context = hmac::Context::with_key(&key);
    context.update(timestamp.as_bytes());
    context.update(rndguid.as_bytes());
    STANDARD.encode(context.sign().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "SECRET",
        "1700000000",
        "3c7e2f9a-1b4d-4e8f-9a6c-2d5b7e0f1a3c",
        "/tpTCRh2RyAhFtG+/jDveTD/7e4WRPLHaPe8exEiOGo="
    )]
    #[case("", "", "", "thNnmggU2ex3L5XXeMNfxf8Wl8STcVZTxscSFEKSxa0=")]
    fn signature_matches_reference_vectors(
        #[case] secret: &str,
        #[case] timestamp: &str,
        #[case] rndguid: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(sign(secret, timestamp, rndguid), expected);
    }
}
