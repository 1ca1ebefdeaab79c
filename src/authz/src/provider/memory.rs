//! In-memory policy provider
//!
//! Two collections behind async read/write locks: policies keyed by id, and
//! the attachment rows binding them to principals. They are joined at read
//! time. Clones share the same storage.

use super::{PolicyProvider, PolicyQuery, PolicyRecord, PolicySource};
use crate::error::{AuthzError, Result};
use crate::policy::{validate_document, PolicyDocument};
use crate::types::{Attachment, PolicyId, Scope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// In-memory provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryProviderConfig {
    /// TTL applied when `add_policy` is called without one (seconds on the wire)
    #[serde(with = "ttl_secs")]
    pub default_ttl: Option<Duration>,
}

mod ttl_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        ttl.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

#[derive(Debug)]
struct StoredPolicy {
    scope: Scope,
    document: Arc<PolicyDocument>,
    expires_at: Option<Instant>,
}

impl StoredPolicy {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn to_record(&self, id: &str) -> PolicyRecord {
        PolicyRecord::new(id, self.scope.clone(), PolicyDocument::clone(&self.document))
    }
}

/// Reference [`PolicyProvider`] backed by process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicyProvider {
    config: MemoryProviderConfig,
    policies: Arc<RwLock<HashMap<PolicyId, StoredPolicy>>>,
    attachments: Arc<RwLock<Vec<Attachment>>>,
}

impl InMemoryPolicyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MemoryProviderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Drop expired policies together with their attachments
    ///
    /// Returns the number of policies removed. Reads already ignore expired
    /// entries, and every write reclaims them as well.
    pub async fn purge_expired(&self) -> usize {
        let mut policies = self.policies.write().await;
        let mut attachments = self.attachments.write().await;
        purge_locked(&mut policies, &mut attachments, Instant::now())
    }
}

/// Remove expired policies and the attachment rows that point at them
///
/// Callers hold both write locks, policies first.
fn purge_locked(
    policies: &mut HashMap<PolicyId, StoredPolicy>,
    attachments: &mut Vec<Attachment>,
    now: Instant,
) -> usize {
    let expired: HashSet<PolicyId> = policies
        .iter()
        .filter(|(_, stored)| stored.is_expired(now))
        .map(|(id, _)| id.clone())
        .collect();
    if expired.is_empty() {
        return 0;
    }

    policies.retain(|id, _| !expired.contains(id));
    attachments.retain(|attachment| !expired.contains(&attachment.policy_id));

    debug!(count = expired.len(), "purged expired policies");
    expired.len()
}

#[async_trait]
impl PolicyProvider for InMemoryPolicyProvider {
    async fn get_policies(&self, query: &PolicyQuery) -> Result<Vec<PolicySource>> {
        let candidates: HashSet<_> = query.candidates().into_iter().collect();

        let ids: Vec<PolicyId> = {
            let attachments = self.attachments.read().await;
            let mut seen = HashSet::new();
            attachments
                .iter()
                .filter(|a| a.scope == query.scope && candidates.contains(&a.principal))
                .filter(|a| seen.insert(&a.policy_id))
                .map(|a| a.policy_id.clone())
                .collect()
        };

        let now = Instant::now();
        let policies = self.policies.read().await;
        let sources: Vec<PolicySource> = ids
            .into_iter()
            .filter_map(|id| {
                let stored = policies.get(&id)?;
                if stored.scope != query.scope || stored.is_expired(now) {
                    return None;
                }
                Some(PolicySource {
                    document: Arc::clone(&stored.document),
                    id,
                })
            })
            .collect();

        debug!(
            scope = %query.scope,
            principal = %query.principal,
            count = sources.len(),
            "resolved policies"
        );
        Ok(sources)
    }

    async fn add_policy(&self, policy: PolicyRecord, ttl: Option<Duration>) -> Result<()> {
        if policy.id.is_empty() {
            return Err(AuthzError::InvalidInput("policy id must not be empty".to_string()));
        }
        validate_document(&policy.document)?;

        let now = Instant::now();
        let ttl = ttl.or(self.config.default_ttl);
        // A TTL past the clock's range never expires
        let stored = StoredPolicy {
            scope: policy.scope,
            document: Arc::new(policy.document),
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        };

        let mut policies = self.policies.write().await;
        let mut attachments = self.attachments.write().await;
        purge_locked(&mut policies, &mut attachments, now);

        info!(policy_id = %policy.id, scope = %stored.scope, ttl_secs = ttl.map(|d| d.as_secs()), "policy added");
        policies.insert(policy.id, stored);
        Ok(())
    }

    async fn attach_policy(&self, attachment: Attachment) -> Result<()> {
        let mut policies = self.policies.write().await;
        let mut attachments = self.attachments.write().await;
        purge_locked(&mut policies, &mut attachments, Instant::now());

        if attachments.contains(&attachment) {
            return Ok(());
        }

        info!(
            policy_id = %attachment.policy_id,
            scope = %attachment.scope,
            principal = %attachment.principal,
            "policy attached"
        );
        attachments.push(attachment);
        Ok(())
    }

    async fn detach_policy(&self, attachment: &Attachment) -> Result<()> {
        let mut attachments = self.attachments.write().await;
        let before = attachments.len();
        attachments.retain(|a| a != attachment);

        if attachments.len() != before {
            info!(
                policy_id = %attachment.policy_id,
                scope = %attachment.scope,
                principal = %attachment.principal,
                "policy detached"
            );
        }
        Ok(())
    }

    async fn delete_policy(&self, id: &str) -> Result<()> {
        let mut policies = self.policies.write().await;
        if policies.remove(id).is_none() {
            return Err(AuthzError::PolicyNotFound(id.to_string()));
        }

        let mut attachments = self.attachments.write().await;
        let before = attachments.len();
        attachments.retain(|a| a.policy_id != id);

        info!(policy_id = %id, attachments_removed = before - attachments.len(), "policy deleted");
        Ok(())
    }

    async fn get_policy(&self, id: &str) -> Result<Option<PolicyRecord>> {
        let policies = self.policies.read().await;
        Ok(policies
            .get(id)
            .filter(|stored| !stored.is_expired(Instant::now()))
            .map(|stored| stored.to_record(id)))
    }

    async fn list_policies(&self, scope: &Scope) -> Result<Vec<PolicyRecord>> {
        let now = Instant::now();
        let policies = self.policies.read().await;
        let mut records: Vec<PolicyRecord> = policies
            .iter()
            .filter(|(_, stored)| &stored.scope == scope && !stored.is_expired(now))
            .map(|(id, stored)| stored.to_record(id))
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn attach_policies(&self, attachments: Vec<Attachment>) -> Result<()> {
        let mut policies = self.policies.write().await;
        let mut stored = self.attachments.write().await;
        purge_locked(&mut policies, &mut stored, Instant::now());

        let mut added = 0usize;
        for attachment in attachments {
            if !stored.contains(&attachment) {
                stored.push(attachment);
                added += 1;
            }
        }

        info!(count = added, "policies attached");
        Ok(())
    }

    async fn detach_policies(&self, attachments: &[Attachment]) -> Result<()> {
        let mut stored = self.attachments.write().await;
        let before = stored.len();
        stored.retain(|a| !attachments.contains(a));

        info!(count = before - stored.len(), "policies detached");
        Ok(())
    }
}
