use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::pkey::Private;
use openssl::stack::Stack;
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::X509Name;
use openssl::x509::X509Req;
use openssl::x509::X509;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::acme::account::AcmeAccount;
use crate::acme::error::*;
use crate::acme::helpers::*;

const PEM_CHAIN_CONTENT_TYPE: &str = "application/pem-certificate-chain";
const MAX_COMMON_NAME_LEN: usize = 64;

#[derive(Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Ready,
    Processing,
    Valid,
    Invalid,
}

impl OrderStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, OrderStatus::Valid | OrderStatus::Invalid)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub r#type: String,
    pub value: String,
}

impl Identifier {
    pub fn dns(value: &str) -> Self {
        Self {
            r#type: "dns".to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(skip)]
    pub url: String,
    pub status: OrderStatus,
    pub expires: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub error: Option<ServerProblem>,
    #[serde(rename = "authorizations")]
    pub authorization_urls: Vec<String>,
    #[serde(rename = "finalize")]
    pub finalize_url: String,
    #[serde(rename = "certificate")]
    pub certificate_url: Option<String>,
}

impl Order {
    fn failure(&self, expected: &str) -> AcmeError {
        match &self.error {
            Some(problem) => AcmeError::Server(problem.clone()),
            None => AcmeError::General(format!(
                "Order {} is {:?}, expected {}",
                self.url, self.status, expected
            )),
        }
    }
}

/// CSR for `domains`. The subject CN is only set when the first name fits the
/// 64 character X.520 limit; every name is listed in the SAN extension.
pub(crate) fn gen_csr(
    key_pair: &PKey<openssl::pkey::Private>,
    domains: &[String],
) -> Result<X509Req, AcmeError> {
    let first = domains.first().ok_or_else(|| {
        AcmeError::General("At least one domain name needs to be supplied".into())
    })?;

    let mut builder = X509Req::builder()?;
    if first.len() <= MAX_COMMON_NAME_LEN {
        let mut name = X509Name::builder()?;
        name.append_entry_by_text("CN", first)?;
        builder.set_subject_name(&name.build())?;
    }

    let san_extension = {
        let mut san = SubjectAlternativeName::new();
        for domain in domains.iter() {
            san.dns(domain);
        }
        san.build(&builder.x509v3_context(None))?
    };
    let mut stack = Stack::new()?;
    stack.push(san_extension)?;
    builder.add_extensions(&stack)?;

    builder.set_pubkey(key_pair)?;
    builder.sign(key_pair, MessageDigest::sha256())?;

    Ok(builder.build())
}

impl AcmeAccount {
    pub(crate) async fn new_order(&self, domains: &[String]) -> Result<Order, AcmeError> {
        let identifiers: Vec<Identifier> = domains.iter().map(|d| Identifier::dns(d)).collect();

        let response = self
            .directory
            .authenticated_request(
                &self.directory.urls.new_order_url,
                Some(json!({ "identifiers": identifiers })),
                &self.key,
                Some(self.kid()),
            )
            .await?;

        let mut order: Order = response.json()?;
        order.url = response.location()?;
        Ok(order)
    }

    pub(crate) async fn poll_order(&self, url: &str) -> Result<Order, AcmeError> {
        let response = self
            .directory
            .authenticated_request(url, None, &self.key, Some(self.kid()))
            .await?;

        let mut order: Order = response.json()?;
        order.url = url.to_string();
        Ok(order)
    }

    /// Polls until the CA has moved the order out of `pending`. The order must then be `ready`.
    pub(crate) async fn wait_ready(&self, order: Order) -> Result<Order, AcmeError> {
        let mut order = order;
        let mut i: usize = 0;

        while order.status.is_pending() {
            if i >= self.poll.attempts {
                return Err(AcmeError::PollTimeout(order.url));
            }
            tokio::time::sleep(self.poll.interval).await;
            order = self.poll_order(&order.url).await?;
            i += 1;
        }

        match order.status {
            OrderStatus::Ready | OrderStatus::Valid => Ok(order),
            _ => Err(order.failure("ready")),
        }
    }

    pub(crate) async fn wait_done(&self, order: Order) -> Result<Order, AcmeError> {
        let mut order = order;
        let mut i: usize = 0;

        while !order.status.is_done() {
            if i >= self.poll.attempts {
                return Err(AcmeError::PollTimeout(order.url));
            }
            tokio::time::sleep(self.poll.interval).await;
            order = self.poll_order(&order.url).await?;
            i += 1;
        }

        match order.status {
            OrderStatus::Valid => Ok(order),
            _ => Err(order.failure("valid")),
        }
    }

    /// `domains` is the requested list; the order's identifiers may come back reordered.
    pub(crate) async fn finalize_order(
        &self,
        order: &Order,
        domains: &[String],
        pkey: &PKey<Private>,
    ) -> Result<Order, AcmeError> {
        let csr = gen_csr(pkey, domains)?;
        let csr_b64 = b64(&csr.to_der()?);

        let response = self
            .directory
            .authenticated_request(
                &order.finalize_url,
                Some(json!({ "csr": csr_b64 })),
                &self.key,
                Some(self.kid()),
            )
            .await?;

        let mut finalized: Order = response.json()?;
        finalized.url.clone_from(&order.url);
        Ok(finalized)
    }

    /// Downloads the PEM chain for a valid order.
    pub(crate) async fn download_certificate(&self, order: &Order) -> Result<Vec<u8>, AcmeError> {
        let certificate_url = order
            .certificate_url
            .as_deref()
            .ok_or_else(|| AcmeError::FieldNotFound("certificate".into()))?;

        let response = self
            .directory
            .download(certificate_url, &self.key, self.kid(), PEM_CHAIN_CONTENT_TYPE)
            .await?;

        let chain = X509::stack_from_pem(&response.body)?;
        if chain.is_empty() {
            return Err(AcmeError::General(format!(
                "Empty certificate chain at {certificate_url}"
            )));
        }

        Ok(response.body.to_vec())
    }
}
