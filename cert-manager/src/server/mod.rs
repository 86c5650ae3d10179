use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::manager::LifecycleManager;

pub mod access_log;
pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::TokenVerifier;

/// API routes. `verifier` of `None` disables bearer authentication.
pub fn router(manager: LifecycleManager, verifier: Option<Arc<TokenVerifier>>) -> Router {
    let api = Router::new()
        .route("/accounts", post(handlers::create_account))
        .route("/accounts/:id", get(handlers::get_account))
        .route("/accounts/:id/certificates", post(handlers::create_certificate))
        .route("/certificates/:id", get(handlers::get_certificate));

    let api = match verifier {
        Some(verifier) => api.route_layer(middleware::from_fn_with_state(
            verifier,
            auth::require_bearer,
        )),
        None => api,
    };

    api.route("/healthz", get(handlers::healthz))
        .layer(middleware::from_fn(access_log::log_request))
        .with_state(manager)
}

pub async fn run_server(addr: SocketAddr, router: Router) -> hyper::Result<()> {
    log::info!("API listening on {addr}");
    axum::Server::bind(&addr)
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::Registration;
    use crate::challenge::http::ChallengeManager;
    use crate::challenge::ChallengeConfigurator;
    use crate::directory::MemoryAccountDirectory;
    use crate::mocks::authority_mock::{MockAcmeAccountInterface, MockAcmeClientInterface};
    use crate::mocks::fixtures::issued_bundle;
    use crate::server::auth::tests::{hs256_token, SECRET};
    use crate::server::handlers::{AccountView, CertificateView};
    use axum::http::{Request, StatusCode};
    use hyper::Body;
    use serde_json::{json, Value};
    use shared::storage::memory::MemoryStorageClient;
    use tower::ServiceExt;

    fn manager() -> LifecycleManager {
        let mut authority = MockAcmeClientInterface::new();
        authority.expect_register_or_load_account().returning(|_, _| {
            let mut client = MockAcmeAccountInterface::new();
            client
                .expect_registration()
                .returning(Registration::default);
            client.expect_set_challenge_provider().returning(|_| Ok(()));
            client
                .expect_obtain_certificate()
                .returning(|domains| Ok(issued_bundle(domains)));
            Ok(Arc::new(client))
        });

        LifecycleManager::new(
            Arc::new(MemoryAccountDirectory::new()),
            Arc::new(MemoryStorageClient::new()),
            Arc::new(authority),
            ChallengeConfigurator::with_defaults(ChallengeManager::new()),
        )
    }

    fn authenticated_router() -> Router {
        let verifier = TokenVerifier::from_key_material(SECRET.as_bytes()).unwrap();
        router(manager(), Some(Arc::new(verifier)))
    }

    async fn send(
        router: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_healthz_is_unauthenticated() {
        let response = authenticated_router()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (status, body) = send(
            authenticated_router(),
            "POST",
            "/accounts",
            None,
            Some(json!({"email": "ops@example.com"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let (status, _) = send(
            authenticated_router(),
            "GET",
            &format!("/accounts/{}", uuid::Uuid::new_v4()),
            Some(&hs256_token("wrong")),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_email_is_bad_request() {
        let (status, _) = send(
            authenticated_router(),
            "POST",
            "/accounts",
            Some(&hs256_token(SECRET)),
            Some(json!({"email": "not-an-email"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_account_and_certificate_flow() {
        let router = authenticated_router();
        let token = hs256_token(SECRET);

        let (status, body) = send(
            router.clone(),
            "POST",
            "/accounts",
            Some(&token),
            Some(json!({"email": "ops@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let account: AccountView = serde_json::from_value(body).unwrap();
        assert_eq!(account.email, "ops@example.com");

        let (status, body) = send(
            router.clone(),
            "GET",
            &format!("/accounts/{}", account.id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_value::<AccountView>(body).unwrap(), account);

        let (status, body) = send(
            router.clone(),
            "POST",
            "/accounts",
            Some(&token),
            Some(json!({"email": "ops@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_value::<AccountView>(body).unwrap(), account);

        let (status, body) = send(
            router.clone(),
            "POST",
            &format!("/accounts/{}/certificates", account.id),
            Some(&token),
            Some(json!({"domains": ["example.com", "www.example.com"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let certificate: CertificateView = serde_json::from_value(body).unwrap();
        assert_eq!(certificate.domains, vec!["example.com", "www.example.com"]);
        assert_eq!(certificate.challenge_type, "http");

        let (status, body) = send(
            router,
            "GET",
            &format!("/certificates/{}", certificate.id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_value::<CertificateView>(body).unwrap(),
            certificate
        );
    }

    #[tokio::test]
    async fn test_unknown_records_are_not_found() {
        let router = router(manager(), None);

        let (status, _) = send(
            router.clone(),
            "GET",
            &format!("/certificates/{}", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            router,
            "POST",
            &format!("/accounts/{}/certificates", uuid::Uuid::new_v4()),
            None,
            Some(json!({"domains": ["example.com"]})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsupported_challenge_is_bad_request() {
        let router = router(manager(), None);
        let (_, body) = send(
            router.clone(),
            "POST",
            "/accounts",
            None,
            Some(json!({"email": "ops@example.com"})),
        )
        .await;
        let account: AccountView = serde_json::from_value(body).unwrap();

        let (status, _) = send(
            router,
            "POST",
            &format!("/accounts/{}/certificates", account.id),
            None,
            Some(json!({"domains": ["example.com"], "challenge_type": "smtp"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
