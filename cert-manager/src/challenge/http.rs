//! HTTP-01 responder on `/.well-known/acme-challenge/:token`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::{http::StatusCode, response::Response, routing::get, Router};
use dashmap::DashMap;
use hyper::Body;

use super::{ChallengeSolver, HTTP_01};
use crate::acme::error::AcmeError;

const CHALLENGE_PATH: &str = "/.well-known/acme-challenge/:token";

/// Token to key authorization map shared between solvers and the responder.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ChallengeManager {
    challenges: Arc<DashMap<String, String>>,
}

impl ChallengeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_challenge(&self, token: &str, key_authorization: &str) {
        log::debug!("Registering HTTP-01 challenge token {token}");
        self.challenges
            .insert(token.to_string(), key_authorization.to_string());
    }

    pub fn remove_challenge(&self, token: &str) {
        if self.challenges.remove(token).is_some() {
            log::debug!("Removed HTTP-01 challenge token {token}");
        }
    }

    pub fn get_response(&self, token: &str) -> Option<String> {
        self.challenges.get(token).map(|v| v.value().clone())
    }

    pub fn pending_count(&self) -> usize {
        self.challenges.len()
    }
}

pub struct HttpChallengeSolver {
    manager: ChallengeManager,
}

impl HttpChallengeSolver {
    pub fn new(manager: ChallengeManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ChallengeSolver for HttpChallengeSolver {
    fn challenge_kind(&self) -> &'static str {
        HTTP_01
    }

    async fn present(
        &self,
        domain: &str,
        token: &str,
        key_authorization: &str,
    ) -> Result<(), AcmeError> {
        log::info!("Serving HTTP-01 challenge for {domain}");
        self.manager.add_challenge(token, key_authorization);
        Ok(())
    }

    async fn clean_up(&self, _domain: &str, token: &str, _: &str) -> Result<(), AcmeError> {
        self.manager.remove_challenge(token);
        Ok(())
    }
}

pub fn challenge_router(manager: ChallengeManager) -> Router {
    Router::new()
        .route(CHALLENGE_PATH, get(handle_get_challenge))
        .with_state(manager)
}

pub async fn run_challenge_server(addr: SocketAddr, manager: ChallengeManager) -> hyper::Result<()> {
    log::info!("HTTP-01 challenge responder listening on {addr}");
    axum::Server::bind(&addr)
        .serve(challenge_router(manager).into_make_service())
        .await
}

async fn handle_get_challenge(
    Path(token): Path<String>,
    State(manager): State<ChallengeManager>,
) -> Response<Body> {
    log::info!("Received request for challenge token: {token}");
    match manager.get_response(&token) {
        Some(key_authorization) => build_infallible_response(key_authorization, StatusCode::OK),
        None => build_infallible_response("Not Found".to_string(), StatusCode::NOT_FOUND),
    }
}

fn build_infallible_response(body: String, status_code: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status_code;
    response
}
