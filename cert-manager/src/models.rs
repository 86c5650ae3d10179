use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Locally persisted account. `private_key_ref` names the key blob in the key store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: Uuid,
    pub email: String,
    pub private_key_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AccountRecord {
    pub fn new(email: String) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            email,
            private_key_ref: id.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Pending,
    Issued,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Order is preserved as requested; the first entry is the primary name.
    pub domains: Vec<String>,
    pub challenge_type: String,
    pub certificate_ref: Option<String>,
    pub status: CertificateStatus,
    pub created_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Certificate {
    pub fn new(account_id: Uuid, domains: Vec<String>, challenge_type: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            domains,
            challenge_type,
            certificate_ref: None,
            status: CertificateStatus::Pending,
            created_at: Utc::now(),
            issued_at: None,
            expires_at: None,
        }
    }

    pub fn mark_issued(&mut self, certificate_ref: String, expires_at: Option<DateTime<Utc>>) {
        self.certificate_ref = Some(certificate_ref);
        self.status = CertificateStatus::Issued;
        self.issued_at = Some(Utc::now());
        self.expires_at = expires_at;
    }
}

pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty() && email.to_string().validate_email()
}

/// DNS hostname check. A single leading `*.` label is accepted for wildcard names.
pub fn is_valid_domain(domain: &str) -> bool {
    let name = domain.strip_prefix("*.").unwrap_or(domain);
    if name.is_empty() || name.len() > MAX_DOMAIN_LEN {
        return false;
    }

    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ops@example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("   "));
    }

    #[test]
    fn test_domain_validation() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("*.example.com"));
        assert!(is_valid_domain("xn--bcher-kva.example"));
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("*."));
        assert!(!is_valid_domain("exa mple.com"));
        assert!(!is_valid_domain("-example.com"));
        assert!(!is_valid_domain("example..com"));
        assert!(!is_valid_domain("foo.*.example.com"));
        assert!(!is_valid_domain(&format!("{}.com", "a".repeat(64))));
    }

    #[test]
    fn test_new_record_references_its_own_key() {
        let record = AccountRecord::new("ops@example.com".into());
        assert_eq!(record.private_key_ref, record.id.to_string());
        assert!(!record.is_deleted());
    }

    #[test]
    fn test_mark_issued() {
        let mut certificate =
            Certificate::new(Uuid::new_v4(), vec!["example.com".into()], "http".into());
        assert_eq!(certificate.status, CertificateStatus::Pending);

        certificate.mark_issued(certificate.id.to_string(), None);

        assert_eq!(certificate.status, CertificateStatus::Issued);
        assert_eq!(certificate.certificate_ref, Some(certificate.id.to_string()));
        assert!(certificate.issued_at.is_some());
    }
}
