//! Team-membership lookups with a per-run cache

use crate::definitions::team::strip_org;
use crate::error::Result;
use crate::platform::PlatformService;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Answers whether a user belongs to a team
#[async_trait]
pub trait TeamMembership: Send + Sync {
    /// Whether `username` is a member of `team` (`slug` or `@org/slug`)
    async fn is_member(&self, username: &str, team: &str) -> Result<bool>;
}

/// Membership lookups against GitHub, cached for the lifetime of the value
pub struct CachedMembership<'a> {
    platform: &'a dyn PlatformService,
    org: String,
    cache: Mutex<HashMap<(String, String), bool>>,
}

impl<'a> CachedMembership<'a> {
    /// New cache for `org`
    pub fn new(platform: &'a dyn PlatformService, org: impl Into<String>) -> Self {
        Self {
            platform,
            org: org.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &(String, String)) -> Option<bool> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).copied())
    }
}

#[async_trait]
impl TeamMembership for CachedMembership<'_> {
    async fn is_member(&self, username: &str, team: &str) -> Result<bool> {
        let key = (username.to_ascii_lowercase(), strip_org(team).to_string());
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let member = self
            .platform
            .is_team_member(&self.org, &key.1, username)
            .await?;
        debug!(username, team = %key.1, member, "resolved team membership");

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, member);
        }
        Ok(member)
    }
}
