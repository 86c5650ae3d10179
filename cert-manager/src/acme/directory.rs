use std::sync::Arc;
use std::sync::Mutex;

use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Body, StatusCode};
use openssl::pkey::{PKey, Private};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::acme::error::*;
use crate::acme::jws::jws;
use crate::acme::transport::HttpTransport;

const JOSE_CONTENT_TYPE: &str = "application/jose+json";

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUrls {
    #[serde(rename = "newNonce")]
    pub new_nonce_url: String,
    #[serde(rename = "newAccount")]
    pub new_account_url: String,
    #[serde(rename = "newOrder")]
    pub new_order_url: String,
    #[serde(rename = "revokeCert")]
    pub revoke_cert_url: Option<String>,
    #[serde(rename = "keyChange")]
    pub key_change_url: Option<String>,
    pub meta: Option<DirectoryMeta>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMeta {
    pub terms_of_service: Option<String>,
    pub website: Option<String>,
    pub caa_identities: Option<Vec<String>>,
    pub external_account_required: Option<bool>,
}

/// A fully buffered CA response.
#[derive(Debug)]
pub struct AcmeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl AcmeResponse {
    pub fn location(&self) -> Result<String, AcmeError> {
        let location = self
            .headers
            .get(hyper::header::LOCATION)
            .ok_or(AcmeError::MissingLocationHeader)?
            .to_str()?
            .to_string();
        Ok(location)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AcmeError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub struct Directory {
    pub urls: DirectoryUrls,
    transport: Arc<dyn HttpTransport>,
    nonce: Mutex<Option<String>>,
}

fn extract_nonce(headers: &HeaderMap) -> Result<Option<String>, AcmeError> {
    headers
        .get("replay-nonce")
        .map(|nonce| {
            nonce
                .to_str()
                .map(|s| s.to_string())
                .map_err(AcmeError::HeaderConversionError)
        })
        .transpose()
}

impl Directory {
    pub fn new(urls: DirectoryUrls, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            urls,
            transport,
            nonce: Mutex::new(None),
        }
    }

    pub async fn fetch_directory(
        url: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Arc<Directory>, AcmeError> {
        let request = hyper::Request::builder()
            .method("GET")
            .uri(url)
            .body(Body::empty())?;

        let resp = transport.send(request).await?;
        if !resp.status().is_success() {
            return Err(AcmeError::FailedRequest(resp.status()));
        }

        let resp_bytes = hyper::body::to_bytes(resp.into_body()).await?;
        let urls: DirectoryUrls = serde_json::from_slice(&resp_bytes)?;

        Ok(Arc::new(Directory::new(urls, transport)))
    }

    pub async fn get_nonce(&self) -> Result<String, AcmeError> {
        if let Some(nonce) = self.take_nonce()? {
            return Ok(nonce);
        }

        let new_nonce_request = hyper::Request::builder()
            .method("HEAD")
            .uri(&self.urls.new_nonce_url)
            .body(Body::empty())?;

        let resp = self.transport.send(new_nonce_request).await?;
        extract_nonce(resp.headers())?.ok_or(AcmeError::NoNonce)
    }

    fn take_nonce(&self) -> Result<Option<String>, AcmeError> {
        let mut guard = self
            .nonce
            .lock()
            .map_err(|err| AcmeError::General(err.to_string()))?;
        Ok(guard.take())
    }

    fn store_nonce(&self, headers: &HeaderMap) -> Result<(), AcmeError> {
        if let Some(nonce) = extract_nonce(headers)? {
            let mut guard = self
                .nonce
                .lock()
                .map_err(|err| AcmeError::General(err.to_string()))?;
            *guard = Some(nonce);
        }
        Ok(())
    }

    /// Signs and POSTs `payload` to `url`. `None` sends a POST-as-GET.
    pub async fn authenticated_request(
        &self,
        url: &str,
        payload: Option<Value>,
        key: &PKey<Private>,
        kid: Option<&str>,
    ) -> Result<AcmeResponse, AcmeError> {
        self.signed_post(url, payload, key, kid, None).await
    }

    pub async fn download(
        &self,
        url: &str,
        key: &PKey<Private>,
        kid: &str,
        accept: &str,
    ) -> Result<AcmeResponse, AcmeError> {
        self.signed_post(url, None, key, Some(kid), Some(accept))
            .await
    }

    async fn signed_post(
        &self,
        url: &str,
        payload: Option<Value>,
        key: &PKey<Private>,
        kid: Option<&str>,
        accept: Option<&str>,
    ) -> Result<AcmeResponse, AcmeError> {
        let payload = match payload {
            Some(value) => serde_json::to_string(&value)?,
            None => String::new(),
        };

        // One retry when the CA rejects a stale nonce.
        let mut retried = false;
        loop {
            let nonce = self.get_nonce().await?;
            let signed = jws(url, Some(nonce), &payload, key, kid.map(str::to_string))?;

            let mut builder = hyper::Request::builder()
                .method("POST")
                .uri(url)
                .header(hyper::header::CONTENT_TYPE, JOSE_CONTENT_TYPE);
            if let Some(accept) = accept {
                builder = builder.header(hyper::header::ACCEPT, accept);
            }
            let request = builder.body(Body::from(serde_json::to_vec(&signed)?))?;

            let resp = self.transport.send(request).await?;
            self.store_nonce(resp.headers())?;

            let status = resp.status();
            let headers = resp.headers().clone();
            let body = hyper::body::to_bytes(resp.into_body()).await?;

            if status.is_success() {
                return Ok(AcmeResponse {
                    status,
                    headers,
                    body,
                });
            }

            match serde_json::from_slice::<ServerProblem>(&body) {
                Ok(problem) if problem.is_bad_nonce() && !retried => {
                    log::debug!("CA rejected nonce for {url}, retrying");
                    retried = true;
                }
                Ok(problem) => return Err(AcmeError::Server(problem)),
                Err(_) => return Err(AcmeError::FailedRequest(status)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acme::helpers::gen_rsa_private_key;
    use crate::acme::mocks::transport_mock::MockHttpTransport;

    fn test_urls() -> DirectoryUrls {
        DirectoryUrls {
            new_nonce_url: "https://example.com/acme/new-nonce".into(),
            new_account_url: "https://example.com/acme/new-account".into(),
            new_order_url: "https://example.com/acme/new-order".into(),
            revoke_cert_url: Some("https://example.com/acme/revoke-cert".into()),
            key_change_url: None,
            meta: None,
        }
    }

    fn nonce_response(nonce: &str) -> hyper::Response<Body> {
        hyper::Response::builder()
            .status(200)
            .header("replay-nonce", nonce)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_directory_fetch() {
        let mut mock_transport = MockHttpTransport::new();
        mock_transport.expect_send().times(1).returning(|_| {
            let resp = hyper::Response::builder()
                .status(200)
                .body(Body::from(
                    r#"{
                        "newNonce": "https://example.com/acme/new-nonce",
                        "newAccount": "https://example.com/acme/new-account",
                        "newOrder": "https://example.com/acme/new-order",
                        "revokeCert": "https://example.com/acme/revoke-cert",
                        "keyChange": "https://example.com/acme/key-change",
                        "meta": {
                            "termsOfService": "https://example.com/acme/terms/2017-12-01",
                            "website": "https://example.com/",
                            "caaIdentities": ["example.com"]
                        }
                    }"#,
                ))
                .unwrap();
            Ok(resp)
        });

        let directory = Directory::fetch_directory(
            "https://example.com/acme/directory",
            Arc::new(mock_transport),
        )
        .await
        .unwrap();

        assert_eq!(directory.urls.new_nonce_url, test_urls().new_nonce_url);
        assert_eq!(directory.urls.new_account_url, test_urls().new_account_url);
        assert_eq!(directory.urls.new_order_url, test_urls().new_order_url);
        assert_eq!(
            directory.urls.key_change_url.as_deref(),
            Some("https://example.com/acme/key-change")
        );
        assert_eq!(
            directory.urls.meta.as_ref().unwrap().terms_of_service.as_deref(),
            Some("https://example.com/acme/terms/2017-12-01")
        );
    }

    #[tokio::test]
    async fn test_directory_fetch_failure_status() {
        let mut mock_transport = MockHttpTransport::new();
        mock_transport.expect_send().returning(|_| {
            Ok(hyper::Response::builder()
                .status(503)
                .body(Body::empty())
                .unwrap())
        });

        let result = Directory::fetch_directory(
            "https://example.com/acme/directory",
            Arc::new(mock_transport),
        )
        .await;

        assert!(matches!(
            result,
            Err(AcmeError::FailedRequest(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn test_get_nonce_first_time() {
        let mut mock_transport = MockHttpTransport::new();
        mock_transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(nonce_response("1234567890")));

        let directory = Directory::new(test_urls(), Arc::new(mock_transport));

        assert_eq!(directory.get_nonce().await.unwrap(), "1234567890");
    }

    #[tokio::test]
    async fn test_authenticated_request_reuses_replay_nonce() {
        let mut mock_transport = MockHttpTransport::new();
        let mut seq = mockall::Sequence::new();
        mock_transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(nonce_response("first")));
        mock_transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert_eq!(req.method(), "POST");
                assert_eq!(
                    req.headers().get(hyper::header::CONTENT_TYPE).unwrap(),
                    JOSE_CONTENT_TYPE
                );
                Ok(hyper::Response::builder()
                    .status(201)
                    .header("replay-nonce", "second")
                    .body(Body::from("{}"))
                    .unwrap())
            });

        let directory = Directory::new(test_urls(), Arc::new(mock_transport));
        let key = gen_rsa_private_key().unwrap();

        let resp = directory
            .authenticated_request("https://example.com/acme/new-order", None, &key, Some("kid"))
            .await
            .unwrap();

        assert_eq!(resp.status, StatusCode::CREATED);
        // The nonce from the response is cached for the next request.
        assert_eq!(directory.get_nonce().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_authenticated_request_retries_bad_nonce_once() {
        let mut mock_transport = MockHttpTransport::new();
        let mut seq = mockall::Sequence::new();
        mock_transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(nonce_response("stale")));
        mock_transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(hyper::Response::builder()
                    .status(400)
                    .header("replay-nonce", "fresh")
                    .body(Body::from(
                        r#"{"type":"urn:ietf:params:acme:error:badNonce","detail":"stale"}"#,
                    ))
                    .unwrap())
            });
        mock_transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(hyper::Response::builder().status(200).body(Body::from("{}")).unwrap()));

        let directory = Directory::new(test_urls(), Arc::new(mock_transport));
        let key = gen_rsa_private_key().unwrap();

        let resp = directory
            .authenticated_request("https://example.com/acme/order/1", None, &key, Some("kid"))
            .await
            .unwrap();

        assert_eq!(resp.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_authenticated_request_surfaces_problem_document() {
        let mut mock_transport = MockHttpTransport::new();
        mock_transport.expect_send().returning(|req| {
            if req.method() == "HEAD" {
                return Ok(nonce_response("n"));
            }
            Ok(hyper::Response::builder()
                .status(403)
                .body(Body::from(
                    r#"{"type":"urn:ietf:params:acme:error:unauthorized","detail":"no","status":403}"#,
                ))
                .unwrap())
        });

        let directory = Directory::new(test_urls(), Arc::new(mock_transport));
        let key = gen_rsa_private_key().unwrap();

        let err = directory
            .authenticated_request("https://example.com/acme/new-order", None, &key, Some("kid"))
            .await
            .unwrap_err();

        match err {
            AcmeError::Server(problem) => {
                assert_eq!(problem.r#type, "urn:ietf:params:acme:error:unauthorized");
                assert_eq!(problem.status, Some(403));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
