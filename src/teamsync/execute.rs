//! Team-sync execution - effectful operations
//!
//! Pushes team definitions to GitHub parent-first, then reconciles direct
//! membership of each team and of its derived sub-teams.

use crate::definitions::{Definitions, Team, TeamType};
use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::progress::ProgressCallback;
use crate::teamsync::plan::{MembershipDelta, plan_membership, sync_order};
use crate::types::{MembershipRole, RemoteTeam, TeamUpsert};
use tracing::{debug, info};

/// Membership change applied (or planned) to one GitHub team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamChange {
    /// GitHub team name
    pub team: String,
    /// Computed delta
    pub delta: MembershipDelta,
}

/// Outcome of syncing one defined team
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamSyncOutcome {
    /// Full name of the defined team
    pub team: String,
    /// GitHub teams upserted, the team itself first
    pub upserted: Vec<String>,
    /// Membership changes per GitHub team
    pub changes: Vec<TeamChange>,
}

/// Result of a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Teams in the order they were synced
    pub teams: Vec<TeamSyncOutcome>,
}

impl SyncReport {
    /// Total membership additions and removals
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.teams
            .iter()
            .flat_map(|t| &t.changes)
            .map(|c| c.delta.add.len() + c.delta.remove.len())
            .sum()
    }
}

/// Per-run team synchronizer.
///
/// Holds the synced flag and remote id of every defined team, so each team
/// is pushed at most once per run and children can link to their parent.
pub struct TeamSyncer<'a> {
    platform: &'a dyn PlatformService,
    definitions: &'a Definitions,
    org: String,
    dry_run: bool,
    synced: Vec<bool>,
    remote: Vec<Option<RemoteTeam>>,
}

impl<'a> TeamSyncer<'a> {
    /// New syncer over `definitions` for `org`
    pub fn new(
        platform: &'a dyn PlatformService,
        definitions: &'a Definitions,
        org: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        let len = definitions.teams.len();
        Self {
            platform,
            definitions,
            org: org.into(),
            dry_run,
            synced: vec![false; len],
            remote: vec![None; len],
        }
    }

    /// Whether the team at `idx` was synced in this run
    #[must_use]
    pub fn is_synced(&self, idx: usize) -> bool {
        self.synced.get(idx).copied().unwrap_or(false)
    }

    /// Sync the named teams, or every team when `names` is empty.
    ///
    /// Ancestors defined locally are synced first even when not named.
    pub async fn sync(
        &mut self,
        names: &[String],
        progress: &dyn ProgressCallback,
    ) -> Result<SyncReport> {
        let teams = &self.definitions.teams;
        let selected: Vec<usize> = if names.is_empty() {
            (0..teams.len()).collect()
        } else {
            names
                .iter()
                .map(|name| {
                    teams
                        .find_index(name)
                        .ok_or_else(|| Error::Config(format!("team '{name}' is not defined")))
                })
                .collect::<Result<_>>()?
        };

        let order = sync_order(teams, &selected)?;
        info!(count = order.len(), dry_run = self.dry_run, "syncing teams");

        let mut report = SyncReport::default();
        for idx in order {
            if self.is_synced(idx) {
                continue;
            }
            let outcome = self.sync_team(idx, progress).await?;
            report.teams.push(outcome);
        }
        Ok(report)
    }

    async fn sync_team(
        &mut self,
        idx: usize,
        progress: &dyn ProgressCallback,
    ) -> Result<TeamSyncOutcome> {
        let definitions = self.definitions;
        let team = definitions.teams.get(idx);
        let full_name = team.full_name();
        progress
            .on_message(&format!("Syncing team {full_name}"))
            .await;

        let parent_id = self.parent_id(idx, team).await?;
        let repo_names: Vec<String> = definitions
            .repo_full_names(team)
            .into_iter()
            .map(|name| format!("{}/{name}", self.org))
            .collect();

        let mut outcome = TeamSyncOutcome {
            team: full_name.clone(),
            ..TeamSyncOutcome::default()
        };

        let upsert = TeamUpsert {
            name: full_name.clone(),
            description: team.description.clone(),
            privacy: team.privacy,
            parent_id,
            maintainers: team.maintainer_logins(),
            repo_names,
        };
        let remote = self.upsert(&upsert).await?;
        outcome.upserted.push(full_name.clone());

        let maintainers = team.maintainer_logins();
        let delta = self
            .reconcile(remote.as_ref(), &full_name, &team.member_logins(), &maintainers)
            .await?;
        outcome.changes.push(TeamChange {
            team: full_name.clone(),
            delta,
        });

        let sub_teams = [
            (TeamType::Maintainers, maintainers.clone(), MembershipRole::Maintainer),
            (TeamType::Reviewers, team.reviewer_logins(), MembershipRole::Member),
        ];
        for (kind, logins, role) in sub_teams {
            if logins.is_empty() {
                continue;
            }
            let name = team.sub_team_name(kind);
            let sub = TeamUpsert {
                name: name.clone(),
                description: format!("{full_name} {kind}"),
                privacy: team.privacy,
                parent_id: remote.as_ref().map(|r| r.id),
                maintainers: if role == MembershipRole::Maintainer {
                    logins.clone()
                } else {
                    Vec::new()
                },
                repo_names: Vec::new(),
            };
            let sub_remote = self.upsert(&sub).await?;
            outcome.upserted.push(name.clone());

            let elevated: &[String] = if role == MembershipRole::Maintainer {
                &logins
            } else {
                &[]
            };
            let delta = self
                .reconcile(sub_remote.as_ref(), &name, &logins, elevated)
                .await?;
            outcome.changes.push(TeamChange { team: name, delta });
        }

        self.synced[idx] = true;
        self.remote[idx] = remote;
        info!(team = %full_name, "synced team");
        Ok(outcome)
    }

    /// Remote id of the parent of the team at `idx`.
    ///
    /// Locally defined parents were synced first; others are looked up on
    /// GitHub and must exist there.
    async fn parent_id(&self, idx: usize, team: &Team) -> Result<Option<u64>> {
        let Some(parent_name) = team.parent.as_deref() else {
            return Ok(None);
        };

        if let Some(parent) = self.definitions.teams.parent_of(idx)
            && self.is_synced(parent)
        {
            let id = self.remote[parent].as_ref().map(|r| r.id);
            if id.is_none() {
                debug!(team = %team.full_name(), parent = parent_name, "parent not created yet (dry run)");
            }
            return Ok(id);
        }

        let lookup = self
            .definitions
            .teams
            .find(parent_name)
            .map_or_else(|| parent_name.to_string(), Team::full_name);
        match self.platform.find_team(&self.org, &lookup).await? {
            Some(remote) => Ok(Some(remote.id)),
            None => Err(Error::TeamNotFound {
                org: self.org.clone(),
                team: lookup,
            }),
        }
    }

    /// Create or update a team; on dry run only look it up
    async fn upsert(&self, team: &TeamUpsert) -> Result<Option<RemoteTeam>> {
        if self.dry_run {
            let existing = self.platform.find_team(&self.org, &team.name).await?;
            info!(
                team = %team.name,
                exists = existing.is_some(),
                parent_id = ?team.parent_id,
                "would upsert team"
            );
            return Ok(existing);
        }
        debug!(team = %team.name, "upserting team");
        self.platform
            .upsert_team(&self.org, team)
            .await
            .map(Some)
    }

    /// Bring a team's direct membership in line with `desired`.
    ///
    /// Users in `elevated` get the maintainer role, everyone else the
    /// member role. Removals run before additions; a failure stops the
    /// reconciliation without undoing earlier changes.
    async fn reconcile(
        &self,
        remote: Option<&RemoteTeam>,
        name: &str,
        desired: &[String],
        elevated: &[String],
    ) -> Result<MembershipDelta> {
        let current = match remote {
            Some(team) => self.platform.list_team_members(&self.org, &team.slug).await?,
            None => Vec::new(),
        };
        let delta = plan_membership(&current, desired);
        debug!(team = name, %delta, "membership delta");

        if self.dry_run {
            if !delta.is_empty() {
                info!(team = name, %delta, "would update membership");
            }
            return Ok(delta);
        }

        let Some(team) = remote else {
            return Err(Error::Internal(format!("team {name} has no remote record")));
        };

        for username in &delta.remove {
            self.platform
                .remove_team_member(&self.org, &team.slug, username)
                .await
                .map_err(|e| Error::Membership {
                    team: name.to_string(),
                    action: "remove",
                    username: username.clone(),
                    source: Box::new(e),
                })?;
        }

        for username in &delta.add {
            let role = if elevated.iter().any(|m| m.eq_ignore_ascii_case(username)) {
                MembershipRole::Maintainer
            } else {
                MembershipRole::Member
            };
            self.platform
                .add_team_member(&self.org, &team.slug, username, role)
                .await
                .map_err(|e| Error::Membership {
                    team: name.to_string(),
                    action: "add",
                    username: username.clone(),
                    source: Box::new(e),
                })?;
        }

        if delta.is_empty() {
            debug!(team = name, "membership up to date");
        } else {
            info!(team = name, %delta, "updated membership");
        }
        Ok(delta)
    }
}
