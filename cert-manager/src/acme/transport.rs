use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, Response};
use hyper_rustls::HttpsConnector;

use crate::acme::error::AcmeError;

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, AcmeError>;
}

#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    pub fn new() -> Self {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Self {
            client: Client::builder().build(connector),
        }
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, AcmeError> {
        let response = self.client.request(request).await?;
        Ok(response)
    }
}
