//! Manual DNS-01: an operator creates the TXT record by hand.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;

use super::{ChallengeSolver, DNS_01};
use crate::acme::error::AcmeError;
use crate::acme::helpers::b64;

/// FQDN of the TXT record proving control of `domain`. Wildcards share the base name's record.
pub fn dns_record_name(domain: &str) -> String {
    format!("_acme-challenge.{}.", domain.trim_start_matches("*."))
}

pub fn dns_record_value(key_authorization: &str) -> String {
    b64(&openssl::sha::sha256(key_authorization.as_bytes()))
}

// EOF means nobody is there to confirm, so the record was never created.
async fn wait_for_confirmation<R: AsyncRead + Unpin>(
    reader: R,
    domain: &str,
) -> Result<(), AcmeError> {
    let mut line = String::new();
    match BufReader::new(reader).read_line(&mut line).await? {
        0 => Err(AcmeError::ConfirmationAborted(domain.to_string())),
        _ => Ok(()),
    }
}

/// Prints the record to create and blocks until the operator presses Enter. There is
/// no timeout. Prompts from concurrent issuances are serialized on `prompt`.
pub struct ManualDnsSolver {
    prompt: Arc<Mutex<()>>,
}

impl ManualDnsSolver {
    pub fn new(prompt: Arc<Mutex<()>>) -> Self {
        Self { prompt }
    }
}

#[async_trait]
impl ChallengeSolver for ManualDnsSolver {
    fn challenge_kind(&self) -> &'static str {
        DNS_01
    }

    async fn present(
        &self,
        domain: &str,
        _token: &str,
        key_authorization: &str,
    ) -> Result<(), AcmeError> {
        let _guard = self.prompt.lock().await;
        log::info!(
            "Please create the following TXT record for {domain}:\n{} IN TXT \"{}\"\nPress 'Enter' once the record is visible.",
            dns_record_name(domain),
            dns_record_value(key_authorization)
        );

        wait_for_confirmation(tokio::io::stdin(), domain).await
    }

    async fn clean_up(
        &self,
        domain: &str,
        _token: &str,
        key_authorization: &str,
    ) -> Result<(), AcmeError> {
        log::info!(
            "You can now remove the TXT record {} IN TXT \"{}\"",
            dns_record_name(domain),
            dns_record_value(key_authorization)
        );
        Ok(())
    }
}
