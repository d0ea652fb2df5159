use russh::client::Handler;
use russh::keys::PublicKeyBase64;
use tracing::{info, warn};

/// russh client handler. Host keys are checked against the endpoint's
/// configured fingerprint whitelist when one is present; without a whitelist
/// any key is accepted and its fingerprint logged.
pub(crate) struct Client {
    pub allowed_fingerprints: Option<Vec<String>>, // OpenSSH SHA256 base64 or raw base64 keys
}

impl Handler for Client {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let fp_sha256 = server_public_key
            .fingerprint(russh::keys::HashAlg::Sha256)
            .to_string();
        if let Some(allowed) = &self.allowed_fingerprints {
            let key_b64 = server_public_key.public_key_base64();
            let ok = allowed.iter().any(|s| s == &fp_sha256 || s == &key_b64);
            if !ok {
                warn!("server key {fp_sha256} not in the configured whitelist");
            }
            return Ok(ok);
        }
        info!("accepting server key (no whitelist configured): {fp_sha256}");
        Ok(true)
    }
}
