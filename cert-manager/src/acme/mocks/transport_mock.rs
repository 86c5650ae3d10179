use crate::acme::error::AcmeError;
use crate::acme::transport::HttpTransport;
use async_trait::async_trait;
use hyper::{Body, Request, Response};
use mockall::mock;

mock! {
    pub HttpTransport {}
    #[async_trait]
    impl HttpTransport for HttpTransport {
        async fn send(&self, request: Request<Body>) -> Result<Response<Body>, AcmeError>;
    }
}
