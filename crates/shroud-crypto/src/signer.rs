use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use shroud_types::{SignedToken, SigningKey, SIGNING_KEY_SIZE};

pub const LINK_SIGNING_CONTEXT: &str = "shroud-v1 proxied link signing";

pub fn derive_signing_key(secret: &[u8]) -> SigningKey {
    SigningKey::from_bytes(blake3::derive_key(LINK_SIGNING_CONTEXT, secret))
}

/// Random hex secret for deployments that did not configure one.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SIGNING_KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Signs fully resolved URLs so the proxy and image endpoints only ever fetch
/// what this process emitted into a rewritten page.
///
/// The token is the keyed BLAKE3 digest of the URL's exact string form,
/// base64url encoded without padding. Verification recomputes it; nothing
/// is stored.
#[derive(Clone, Debug)]
pub struct LinkSigner {
    key: SigningKey,
}

impl LinkSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn from_secret(secret: impl AsRef<[u8]>) -> Self {
        Self::new(derive_signing_key(secret.as_ref()))
    }

    pub fn sign(&self, url: &str) -> SignedToken {
        let digest = self.digest(url);
        SignedToken::new(URL_SAFE_NO_PAD.encode(digest.as_bytes()))
    }

    pub fn verify(&self, url: &str, token: &str) -> bool {
        let decoded = match URL_SAFE_NO_PAD.decode(token.as_bytes()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let expected: [u8; blake3::OUT_LEN] = match decoded.try_into() {
            Ok(arr) => arr,
            Err(_) => return false,
        };

        // blake3::Hash equality is constant time
        self.digest(url) == blake3::Hash::from(expected)
    }

    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    fn digest(&self, url: &str) -> blake3::Hash {
        blake3::keyed_hash(self.key.as_bytes(), url.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signer() -> LinkSigner {
        LinkSigner::new(SigningKey::from_bytes([0x42; SIGNING_KEY_SIZE]))
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = signer();
        let url = "https://ex.com/a/foo/bar.png";
        assert_eq!(signer.sign(url), signer.sign(url));

        let again = LinkSigner::new(SigningKey::from_bytes([0x42; SIGNING_KEY_SIZE]));
        assert_eq!(signer.sign(url), again.sign(url));
    }

    #[test]
    fn test_token_shape() {
        let token = signer().sign("https://ex.com/");
        // 32 bytes, base64url without padding
        assert_eq!(token.as_str().len(), 43);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_token_matches_keyed_blake3() {
        let key = [0x42; SIGNING_KEY_SIZE];
        let url = "https://ex.com/page";
        let expected = URL_SAFE_NO_PAD.encode(blake3::keyed_hash(&key, url.as_bytes()).as_bytes());
        assert_eq!(signer().sign(url).as_str(), expected);
    }

    #[test]
    fn test_key_separation() {
        let a = LinkSigner::from_secret("first secret");
        let b = LinkSigner::from_secret("second secret");
        assert_ne!(a.sign("https://ex.com/"), b.sign("https://ex.com/"));
    }

    #[test]
    fn test_verify() {
        let signer = signer();
        let url = "https://ex.com/a?b=c";
        let token = signer.sign(url);

        assert!(signer.verify(url, token.as_str()));
        assert!(!signer.verify("https://ex.com/a?b=d", token.as_str()));
        assert!(!signer.verify(url, "not base64 !!"));
        assert!(!signer.verify(url, "c2hvcnQ"));
        assert!(!signer.verify(url, ""));

        let other = LinkSigner::from_secret("other");
        assert!(!other.verify(url, token.as_str()));
    }

    #[test]
    fn test_generate_secret() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), SIGNING_KEY_SIZE * 2);
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_distinct_urls_distinct_tokens(
            a in "https://[a-z]{1,12}\\.(com|org|net)/[a-zA-Z0-9/._-]{0,32}",
            b in "https://[a-z]{1,12}\\.(com|org|net)/[a-zA-Z0-9/._-]{0,32}",
        ) {
            prop_assume!(a != b);
            let signer = signer();
            prop_assert_ne!(signer.sign(&a), signer.sign(&b));
        }

        #[test]
        fn prop_sign_then_verify(url in "https?://[a-z0-9.-]{1,24}/[ -~]{0,48}") {
            let signer = signer();
            let token = signer.sign(&url);
            prop_assert!(signer.verify(&url, token.as_str()));
        }
    }
}
