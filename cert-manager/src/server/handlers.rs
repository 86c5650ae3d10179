use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::UserClaims;
use super::error::ServerError;
use crate::certificate::CertificateConfig;
use crate::manager::LifecycleManager;
use crate::models::{AccountRecord, Certificate, CertificateStatus};

#[derive(Debug, Deserialize)]
pub struct NewAccountRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewCertificateRequest {
    pub domains: Vec<String>,
    #[serde(flatten)]
    pub config: CertificateConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&AccountRecord> for AccountView {
    fn from(record: &AccountRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateView {
    pub id: Uuid,
    pub account_id: Uuid,
    pub domains: Vec<String>,
    pub challenge_type: String,
    pub status: CertificateStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Certificate> for CertificateView {
    fn from(certificate: Certificate) -> Self {
        Self {
            id: certificate.id,
            account_id: certificate.account_id,
            domains: certificate.domains,
            challenge_type: certificate.challenge_type,
            status: certificate.status,
            issued_at: certificate.issued_at,
            expires_at: certificate.expires_at,
        }
    }
}

fn caller(claims: &Option<Extension<UserClaims>>) -> &str {
    claims
        .as_ref()
        .map(|Extension(claims)| claims.id.as_str())
        .unwrap_or("anonymous")
}

pub async fn healthz() -> &'static str {
    "OK"
}

pub async fn create_account(
    State(manager): State<LifecycleManager>,
    claims: Option<Extension<UserClaims>>,
    Json(body): Json<NewAccountRequest>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    log::info!("Account requested by {}", caller(&claims));
    let account = manager.new_account(&body.email).await?;
    let status = if account.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AccountView::from(&account.record))))
}

pub async fn get_account(
    State(manager): State<LifecycleManager>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let record = manager.account_record(id).await?;
    Ok(Json(AccountView::from(&record)))
}

pub async fn create_certificate(
    State(manager): State<LifecycleManager>,
    Path(id): Path<Uuid>,
    claims: Option<Extension<UserClaims>>,
    Json(body): Json<NewCertificateRequest>,
) -> Result<(StatusCode, Json<CertificateView>), ServerError> {
    log::info!(
        "Certificate for {:?} requested by {}",
        body.domains,
        caller(&claims)
    );
    let account = manager.account(id).await?;
    let certificate = manager
        .new_certificate_with_config(&body.domains, &account, &body.config)
        .await?;
    Ok((StatusCode::CREATED, Json(certificate.into())))
}

pub async fn get_certificate(
    State(manager): State<LifecycleManager>,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificateView>, ServerError> {
    let certificate = manager.certificate(id).await?;
    Ok(Json(certificate.into()))
}
