//! Code generation on top of a [`VerifyCodeStore`]

use crate::store::mask_id;
use crate::{VerifyCodeSettings, VerifyCodeStore};
use rand::Rng;
use tracing::{info, warn};

/// Generates codes and records them; delivery (SMS, email) is up to the caller.
#[derive(Clone)]
pub struct VerifyCodeIssuer<S> {
    store: S,
    settings: VerifyCodeSettings,
}

impl<S: VerifyCodeStore> VerifyCodeIssuer<S> {
    pub fn new(store: S, settings: VerifyCodeSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issue a fresh code for `id`. `None` if it could not be stored.
    pub async fn issue(&self, id: &str) -> Option<String> {
        let code = self.generate_code();

        if !self.store.set(id, &code).await {
            warn!(id = %mask_id(id), "Failed to store verify code");
            return None;
        }

        info!(id = %mask_id(id), local = self.settings.local, "Verify code issued");
        Some(code)
    }

    /// Check and consume the code for `id`.
    pub async fn check_answer(&self, id: &str, answer: &str) -> bool {
        self.store.verify(id, answer, true).await
    }

    fn generate_code(&self) -> String {
        if self.settings.local {
            return self.settings.debug_code.clone();
        }

        let mut rng = rand::thread_rng();
        (0..self.settings.code_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}
