// crates/repid-access/src/credentials.rs
//
// In-memory API credential registry.
//
// Each credential caches the owner's composite score and the rate limit
// derived from it. The consensus engine calls `refresh_credentials` after
// every score update; request-time checks only read the cache and count
// requests in a per-key sliding window.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use repid_core::traits::CredentialRefresher;
use repid_core::{EntityKey, RepIdError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tier::{rate_limit_for, AccessConfig, RateLimit};

/// An API key owned by a rated entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCredential {
    pub id: Uuid,
    pub owner: EntityKey,
    pub label: Option<String>,
    /// Cached rate limit, including the score snapshot it was derived from.
    pub limit: RateLimit,
    pub issued_at: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiCredential {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u64,
    /// Requests left in the current window after this one.
    pub remaining: u64,
    /// When the oldest counted request leaves the window.
    pub resets_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    credentials: HashMap<Uuid, ApiCredential>,
    by_owner: HashMap<EntityKey, Vec<Uuid>>,
    /// Request timestamps inside the current window, oldest first.
    windows: HashMap<Uuid, VecDeque<DateTime<Utc>>>,
}

#[derive(Debug, Default)]
pub struct CredentialRegistry {
    config: AccessConfig,
    state: RwLock<RegistryState>,
}

impl CredentialRegistry {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            config,
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, RegistryState>, RepIdError> {
        self.state
            .read()
            .map_err(|e| RepIdError::Storage(format!("credential registry lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, RegistryState>, RepIdError> {
        self.state
            .write()
            .map_err(|e| RepIdError::Storage(format!("credential registry lock poisoned: {}", e)))
    }

    /// Issue a new credential for `owner`, priced at its current composite.
    pub fn issue(
        &self,
        owner: EntityKey,
        composite: f64,
        label: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApiCredential, RepIdError> {
        let credential = ApiCredential {
            id: Uuid::now_v7(),
            owner,
            label,
            limit: rate_limit_for(composite, &self.config),
            issued_at: now,
            refreshed_at: now,
            revoked_at: None,
        };

        let mut state = self.write()?;
        state.by_owner.entry(owner).or_default().push(credential.id);
        state.credentials.insert(credential.id, credential.clone());

        tracing::info!(
            key = %credential.id,
            owner = %owner,
            tier = %credential.limit.tier,
            limit = credential.limit.effective_limit,
            "API credential issued"
        );
        Ok(credential)
    }

    pub fn revoke(&self, id: &Uuid, now: DateTime<Utc>) -> Result<(), RepIdError> {
        let mut state = self.write()?;
        let credential = state
            .credentials
            .get_mut(id)
            .ok_or_else(|| RepIdError::NotFound(format!("credential {}", id)))?;
        if credential.revoked_at.is_some() {
            return Err(RepIdError::InvalidState(format!(
                "credential {} already revoked",
                id
            )));
        }
        credential.revoked_at = Some(now);
        state.windows.remove(id);
        tracing::info!(key = %id, "API credential revoked");
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<ApiCredential>, RepIdError> {
        Ok(self.read()?.credentials.get(id).cloned())
    }

    /// All credentials of `owner`, revoked ones included.
    pub fn credentials_for(&self, owner: &EntityKey) -> Result<Vec<ApiCredential>, RepIdError> {
        let state = self.read()?;
        Ok(state
            .by_owner
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|id| state.credentials.get(id).cloned())
            .collect())
    }

    /// Re-derive the cached limit of every active credential of `owner`.
    /// Returns how many were updated.
    pub fn refresh_for_entity(
        &self,
        owner: &EntityKey,
        composite: f64,
        now: DateTime<Utc>,
    ) -> Result<usize, RepIdError> {
        let limit = rate_limit_for(composite, &self.config);
        let mut state = self.write()?;
        let ids = state.by_owner.get(owner).cloned().unwrap_or_default();

        let mut updated = 0;
        for id in ids {
            if let Some(credential) = state.credentials.get_mut(&id) {
                if credential.is_active() {
                    credential.limit = limit;
                    credential.refreshed_at = now;
                    updated += 1;
                }
            }
        }

        if updated > 0 {
            tracing::debug!(
                owner = %owner,
                tier = %limit.tier,
                limit = limit.effective_limit,
                updated,
                "Refreshed credential limits"
            );
        }
        Ok(updated)
    }

    /// Count one request against `id` and decide whether it is allowed.
    ///
    /// Rejected requests are not counted.
    pub fn check_rate_limit(&self, id: &Uuid, now: DateTime<Utc>) -> Result<RateDecision, RepIdError> {
        let window = Duration::seconds(self.config.window_secs.max(1));
        let mut state = self.write()?;

        let limit = match state.credentials.get(id) {
            Some(c) if c.is_active() => c.limit.effective_limit,
            Some(_) => {
                return Err(RepIdError::InvalidState(format!("credential {} is revoked", id)))
            }
            None => return Err(RepIdError::NotFound(format!("credential {}", id))),
        };

        let requests = state.windows.entry(*id).or_default();
        while let Some(oldest) = requests.front() {
            if *oldest <= now - window {
                requests.pop_front();
            } else {
                break;
            }
        }

        let used = requests.len() as u64;
        let allowed = used < limit;
        if allowed {
            requests.push_back(now);
        }
        let counted = requests.len() as u64;
        let resets_at = requests.front().map(|t| *t + window);

        if !allowed {
            tracing::debug!(key = %id, limit, "Rate limit exceeded");
        }

        Ok(RateDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(counted),
            resets_at,
        })
    }
}

#[async_trait]
impl CredentialRefresher for CredentialRegistry {
    async fn refresh_credentials(
        &self,
        entity: &EntityKey,
        composite: f64,
    ) -> Result<usize, RepIdError> {
        self.refresh_for_entity(entity, composite, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::AccessTier;
    use chrono::TimeZone;
    use repid_core::EntityType;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn agent(id: i64) -> EntityKey {
        EntityKey::new(EntityType::Agent, id)
    }

    #[test]
    fn issue_derives_limit_from_score() {
        let registry = CredentialRegistry::default();
        let cred = registry.issue(agent(1), 120.0, Some("ci".into()), t0()).unwrap();
        assert_eq!(cred.limit.tier, AccessTier::Premium);
        assert_eq!(cred.limit.effective_limit, 600);
        assert!(cred.is_active());
        assert_eq!(registry.get(&cred.id).unwrap().unwrap().owner, agent(1));
    }

    #[test]
    fn refresh_updates_only_active_keys_of_owner() {
        let registry = CredentialRegistry::default();
        let a = registry.issue(agent(1), 20.0, None, t0()).unwrap();
        let b = registry.issue(agent(1), 20.0, None, t0()).unwrap();
        let other = registry.issue(agent(2), 20.0, None, t0()).unwrap();
        registry.revoke(&b.id, t0()).unwrap();

        let updated = registry.refresh_for_entity(&agent(1), 75.0, t0()).unwrap();
        assert_eq!(updated, 1);
        assert_eq!(
            registry.get(&a.id).unwrap().unwrap().limit.tier,
            AccessTier::Standard
        );
        assert_eq!(
            registry.get(&b.id).unwrap().unwrap().limit.tier,
            AccessTier::Basic
        );
        assert_eq!(
            registry.get(&other.id).unwrap().unwrap().limit.tier,
            AccessTier::Basic
        );
    }

    #[test]
    fn refresh_for_unknown_owner_is_noop() {
        let registry = CredentialRegistry::default();
        assert_eq!(registry.refresh_for_entity(&agent(9), 80.0, t0()).unwrap(), 0);
    }

    #[test]
    fn double_revoke_is_invalid_state() {
        let registry = CredentialRegistry::default();
        let cred = registry.issue(agent(1), 10.0, None, t0()).unwrap();
        registry.revoke(&cred.id, t0()).unwrap();
        assert!(matches!(
            registry.revoke(&cred.id, t0()),
            Err(RepIdError::InvalidState(_))
        ));
        assert!(matches!(
            registry.revoke(&Uuid::now_v7(), t0()),
            Err(RepIdError::NotFound(_))
        ));
    }

    #[test]
    fn sliding_window_blocks_then_recovers() {
        let config = AccessConfig::default();
        let registry = CredentialRegistry::new(config);
        let cred = registry.issue(agent(1), 10.0, None, t0()).unwrap();

        for i in 0..100 {
            let d = registry
                .check_rate_limit(&cred.id, t0() + Duration::seconds(i))
                .unwrap();
            assert!(d.allowed, "request {} should pass", i);
        }
        let blocked = registry
            .check_rate_limit(&cred.id, t0() + Duration::seconds(200))
            .unwrap();
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);
        assert_eq!(blocked.resets_at, Some(t0() + Duration::hours(1)));

        // The first request has left the window.
        let later = registry
            .check_rate_limit(&cred.id, t0() + Duration::hours(1))
            .unwrap();
        assert!(later.allowed);
        assert_eq!(later.remaining, 0);
    }

    #[test]
    fn revoked_keys_are_rejected() {
        let registry = CredentialRegistry::default();
        let cred = registry.issue(agent(1), 10.0, None, t0()).unwrap();
        registry.revoke(&cred.id, t0()).unwrap();
        assert!(registry.check_rate_limit(&cred.id, t0()).is_err());
    }

    #[tokio::test]
    async fn trait_refresh_reaches_registry() {
        let registry = CredentialRegistry::default();
        let cred = registry.issue(agent(4), 10.0, None, t0()).unwrap();
        let refresher: &dyn CredentialRefresher = &registry;
        assert_eq!(refresher.refresh_credentials(&agent(4), 60.0).await.unwrap(), 1);
        assert_eq!(
            registry.get(&cred.id).unwrap().unwrap().limit.effective_limit,
            250
        );
    }
}
