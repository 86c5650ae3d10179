use serde::Deserialize;
use serde_json::json;

use crate::acme::account::AcmeAccount;
use crate::acme::error::*;
use crate::acme::jws::key_authorization;
use crate::acme::order::Identifier;
use crate::challenge::ChallengeSolver;

#[derive(Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    Pending,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub identifier: Identifier,
    pub status: AuthorizationStatus,
    pub expires: Option<String>,
    pub challenges: Vec<Challenge>,
    pub wildcard: Option<bool>,
}

#[derive(Deserialize, Debug, Eq, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ChallengeStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub r#type: String,
    pub url: String,
    pub status: ChallengeStatus,
    pub validated: Option<String>,
    pub error: Option<ServerProblem>,
    pub token: Option<String>,
}

impl Authorization {
    pub fn get_challenge(&self, r#type: &str) -> Option<&Challenge> {
        self.challenges
            .iter()
            .find(|&challenge| challenge.r#type == r#type)
    }

    fn failure_detail(&self) -> Option<String> {
        self.challenges
            .iter()
            .find_map(|challenge| challenge.error.as_ref().map(ToString::to_string))
    }
}

impl AcmeAccount {
    pub(crate) async fn fetch_authorization(&self, url: &str) -> Result<Authorization, AcmeError> {
        let response = self
            .directory
            .authenticated_request(url, None, &self.key, Some(self.kid()))
            .await?;
        response.json()
    }

    /// Proves control of the authorization's identifier with `solver`. The solver is
    /// always asked to clean up once it has presented, whatever the outcome.
    pub(crate) async fn solve_authorization(
        &self,
        url: &str,
        solver: &dyn ChallengeSolver,
    ) -> Result<(), AcmeError> {
        let authorization = self.fetch_authorization(url).await?;
        if authorization.status == AuthorizationStatus::Valid {
            return Ok(());
        }

        let domain = authorization.identifier.value.clone();
        let kind = solver.challenge_kind();
        let challenge = authorization.get_challenge(kind).cloned().ok_or_else(|| {
            AcmeError::General(format!("CA offered no {kind} challenge for {domain}"))
        })?;
        let token = challenge
            .token
            .clone()
            .ok_or_else(|| AcmeError::FieldNotFound("token".into()))?;
        let key_auth = key_authorization(&token, &self.key)?;

        log::info!("Presenting {kind} challenge for {domain}");
        solver.present(&domain, &token, &key_auth).await?;

        let outcome = self.validate_challenge(url, &challenge, &domain).await;

        if let Err(err) = solver.clean_up(&domain, &token, &key_auth).await {
            log::warn!("Failed to clean up {kind} challenge for {domain}: {err}");
        }

        outcome
    }

    async fn validate_challenge(
        &self,
        authorization_url: &str,
        challenge: &Challenge,
        domain: &str,
    ) -> Result<(), AcmeError> {
        self.directory
            .authenticated_request(&challenge.url, Some(json!({})), &self.key, Some(self.kid()))
            .await?;

        let mut i: usize = 0;
        loop {
            let authorization = self.fetch_authorization(authorization_url).await?;
            match authorization.status {
                AuthorizationStatus::Valid => {
                    log::info!("{} challenge for {domain} validated", challenge.r#type);
                    return Ok(());
                }
                AuthorizationStatus::Pending => {}
                _ => {
                    log::error!(
                        "{} challenge for {domain} failed: {}",
                        challenge.r#type,
                        authorization.failure_detail().unwrap_or_default()
                    );
                    return Err(AcmeError::ValidationFailed(
                        challenge.r#type.clone(),
                        domain.to_string(),
                    ));
                }
            }

            if i >= self.poll.attempts {
                return Err(AcmeError::PollTimeout(authorization_url.to_string()));
            }
            tokio::time::sleep(self.poll.interval).await;
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wildcard_authorization() {
        let body = r#"{
            "status": "pending",
            "expires": "2026-01-01T00:00:00Z",
            "identifier": {"type": "dns", "value": "example.com"},
            "wildcard": true,
            "challenges": [
                {"type": "dns-01", "url": "https://example.com/acme/chall/1", "status": "pending", "token": "abc"}
            ]
        }"#;

        let authorization: Authorization = serde_json::from_str(body).unwrap();

        assert_eq!(authorization.status, AuthorizationStatus::Pending);
        assert_eq!(authorization.wildcard, Some(true));
        assert_eq!(
            authorization.get_challenge("dns-01").unwrap().token.as_deref(),
            Some("abc")
        );
        assert!(authorization.get_challenge("http-01").is_none());
    }
}
