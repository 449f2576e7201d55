use serde::{Deserialize, Serialize};
use shroud_crypto::{generate_secret, LinkSigner};
use tracing::warn;

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Never written back out by `save`.
    #[serde(skip_serializing)]
    pub signing_secret: Option<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SecurityConfig {
    pub fn has_secret(&self) -> bool {
        self.signing_secret.as_deref().map_or(false, |s| !s.is_empty())
    }

    /// Builds the process-wide signer. Without a configured secret a random
    /// one is generated, so links stop verifying after a restart.
    pub fn signer(&self) -> LinkSigner {
        match self.signing_secret.as_deref() {
            Some(secret) if !secret.is_empty() => LinkSigner::from_secret(secret),
            _ => {
                let secret = generate_secret();
                warn!("No signing_secret configured. Generated an ephemeral one for this run.");
                warn!("Set SHROUD_SIGNING_SECRET or security.signing_secret to keep links valid across restarts");
                LinkSigner::from_secret(secret)
            }
        }
    }
}
