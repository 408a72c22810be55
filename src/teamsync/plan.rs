//! Team-sync planning - pure functions
//!
//! Sync ordering and membership diffs. No I/O happens here.

use crate::definitions::TeamSet;
use crate::error::{Error, Result};
use std::fmt;

/// Membership changes needed to turn `current` into `desired`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    /// Logins to remove, applied first
    pub remove: Vec<String>,
    /// Logins to add
    pub add: Vec<String>,
}

impl MembershipDelta {
    /// Whether no change is needed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

impl fmt::Display for MembershipDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no changes");
        }
        let mut parts = Vec::new();
        if !self.add.is_empty() {
            parts.push(format!("add {}", self.add.join(", ")));
        }
        if !self.remove.is_empty() {
            parts.push(format!("remove {}", self.remove.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}

/// Diff two login lists, ignoring case.
///
/// `remove = current - desired` and `add = desired - current`, each in
/// the order of its source list and without duplicates.
#[must_use]
pub fn plan_membership<C, D>(current: &[C], desired: &[D]) -> MembershipDelta
where
    C: AsRef<str>,
    D: AsRef<str>,
{
    let contains = |list: &[String], login: &str| list.iter().any(|l| l.eq_ignore_ascii_case(login));

    let mut delta = MembershipDelta::default();
    for login in current.iter().map(AsRef::<str>::as_ref) {
        let wanted = desired.iter().any(|d| d.as_ref().eq_ignore_ascii_case(login));
        if !wanted && !contains(&delta.remove, login) {
            delta.remove.push(login.to_string());
        }
    }
    for login in desired.iter().map(AsRef::<str>::as_ref) {
        let present = current.iter().any(|c| c.as_ref().eq_ignore_ascii_case(login));
        if !present && !contains(&delta.add, login) {
            delta.add.push(login.to_string());
        }
    }
    delta
}

/// Order `selected` teams so that every locally defined ancestor comes
/// before its descendants.
///
/// Ancestors of selected teams are included even when not selected
/// themselves. A parent cycle is a configuration error.
pub fn sync_order(teams: &TeamSet, selected: &[usize]) -> Result<Vec<usize>> {
    let mut placed = vec![false; teams.len()];
    let mut order = Vec::new();

    for &start in selected {
        let mut chain = Vec::new();
        let mut cursor = Some(start);

        while let Some(idx) = cursor {
            if placed[idx] {
                break;
            }
            if chain.contains(&idx) {
                let names: Vec<String> = chain
                    .iter()
                    .chain(std::iter::once(&idx))
                    .map(|&i| teams.get(i).full_name())
                    .collect();
                return Err(Error::Config(format!(
                    "team parent cycle: {}",
                    names.join(" -> ")
                )));
            }
            chain.push(idx);
            cursor = teams.parent_of(idx);
        }

        for idx in chain.into_iter().rev() {
            placed[idx] = true;
            order.push(idx);
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::Team;

    fn team(name: &str, parent: Option<&str>) -> Team {
        let mut team = Team::named(name);
        team.parent = parent.map(str::to_string);
        team
    }

    #[test]
    fn test_plan_membership_is_case_insensitive() {
        let delta = plan_membership(&["Alice", "carol"], &["alice", "bob"]);
        assert_eq!(delta.remove, ["carol"]);
        assert_eq!(delta.add, ["bob"]);
        assert!(!delta.is_empty());
        assert_eq!(delta.to_string(), "add bob; remove carol");
    }

    #[test]
    fn test_plan_membership_no_changes() {
        let delta = plan_membership(&["alice"], &["ALICE", "alice"]);
        assert!(delta.is_empty());
        assert_eq!(delta.to_string(), "no changes");
    }

    #[test]
    fn test_sync_order_puts_ancestors_first() {
        let teams = TeamSet::new(vec![
            team("sig-lwip", Some("sig-net")),
            team("sig-net", Some("sig-core")),
            team("sig-core", None),
            team("sig-docs", None),
        ]);

        let order = sync_order(&teams, &[0, 3]).unwrap();
        let names: Vec<String> = order.iter().map(|&i| teams.get(i).full_name()).collect();
        assert_eq!(names, ["sig-core", "sig-net", "sig-lwip", "sig-docs"]);
    }

    #[test]
    fn test_sync_order_visits_each_team_once() {
        let teams = TeamSet::new(vec![
            team("sig-net", None),
            team("sig-lwip", Some("sig-net")),
            team("sig-virtio", Some("sig-net")),
        ]);
        let order = sync_order(&teams, &[1, 2, 0]).unwrap();
        assert_eq!(order, [0, 1, 2]);
    }

    #[test]
    fn test_sync_order_detects_cycles() {
        let teams = TeamSet::new(vec![team("sig-a", Some("sig-b")), team("sig-b", Some("sig-a"))]);
        let err = sync_order(&teams, &[0]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("cycle")));
    }
}
