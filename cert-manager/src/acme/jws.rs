use crate::acme::error::*;
use crate::acme::helpers::*;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::pkey::Private;
use openssl::sign::Signer;
use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize, Deserialize, Clone, Default)]
struct JwsHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    alg: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jwk: Option<Jwk>,
}

/// Public half of an RSA account key. Fields are declared in lexical order so the
/// serialized form doubles as the RFC 7638 thumbprint input.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Jwk {
    e: String,
    kty: String,
    n: String,
}

impl Jwk {
    pub fn new(pkey: &PKey<Private>) -> Result<Jwk, AcmeError> {
        let rsa = pkey.rsa()?;
        Ok(Jwk {
            e: b64(&rsa.e().to_vec()),
            kty: "RSA".to_string(),
            n: b64(&rsa.n().to_vec()),
        })
    }

    pub fn thumbprint(&self) -> Result<String, AcmeError> {
        let serialized = serde_json::to_vec(self)?;
        Ok(b64(&openssl::sha::sha256(&serialized)))
    }
}

/// `token || '.' || base64url(thumbprint(accountKey))`
pub fn key_authorization(token: &str, pkey: &PKey<Private>) -> Result<String, AcmeError> {
    let thumbprint = Jwk::new(pkey)?.thumbprint()?;
    Ok(format!("{}.{}", token, thumbprint))
}

#[derive(Serialize, Debug, Clone)]
pub struct JwsResult {
    protected: String,
    payload: String,
    signature: String,
}

/// Flattened JWS as required for every ACME POST. An empty payload produces a POST-as-GET.
pub fn jws(
    url: &str,
    nonce: Option<String>,
    payload: &str,
    pkey: &PKey<Private>,
    account_id: Option<String>,
) -> Result<JwsResult, AcmeError> {
    let payload_b64 = b64(payload.as_bytes());

    let mut header = JwsHeader {
        nonce,
        alg: "RS256".to_string(),
        url: url.to_string(),
        ..Default::default()
    };

    if let Some(kid) = account_id {
        header.kid = kid.into();
    } else {
        header.jwk = Some(Jwk::new(pkey)?);
    }

    let protected_b64 = b64(&serde_json::to_string(&header)?.into_bytes());

    let signature_b64 = {
        let mut signer = Signer::new(MessageDigest::sha256(), pkey)?;
        signer.update(&format!("{}.{}", protected_b64, payload_b64).into_bytes())?;
        b64(&signer.sign_to_vec()?)
    };

    Ok(JwsResult {
        protected: protected_b64,
        payload: payload_b64,
        signature: signature_b64,
    })
}
