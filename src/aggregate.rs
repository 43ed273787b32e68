//! Role aggregation: merge labelled group fetches into role buckets and a
//! per-account group membership index.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::contract::User;
use crate::resolve::EmailIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Managers,
    Contributors,
    Viewers,
}

impl Role {
    /// Render order.
    pub const ALL: [Role; 3] = [Role::Managers, Role::Contributors, Role::Viewers];

    pub fn title(self) -> &'static str {
        match self {
            Role::Managers => "Managers",
            Role::Contributors => "Contributors",
            Role::Viewers => "Viewers",
        }
    }
}

/// Members of one group, tagged with the role they count towards.
#[derive(Debug, Clone)]
pub struct LabelledMembers {
    pub role: Role,
    pub group: String,
    pub users: Vec<User>,
}

/// A user record as it appears in a role bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub account_id: String,
    pub display_name: String,
    pub email: String,
}

impl RosterEntry {
    /// Email, or the account id when no email is known.
    pub fn display_email(&self) -> &str {
        if self.email.is_empty() {
            &self.account_id
        } else {
            &self.email
        }
    }
}

/// Account id to the set of group names it was seen under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembership(BTreeMap<String, BTreeSet<String>>);

impl GroupMembership {
    pub fn groups(&self, account_id: &str) -> Option<&BTreeSet<String>> {
        self.0.get(account_id)
    }

    /// Comma separated group names, empty when the account is unknown.
    pub fn groups_label(&self, account_id: &str) -> String {
        self.groups(account_id)
            .map(|groups| groups.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    buckets: BTreeMap<Role, Vec<RosterEntry>>,
    pub membership: GroupMembership,
}

impl Roster {
    /// Bucket contents in aggregation order.
    pub fn bucket(&self, role: Role) -> &[RosterEntry] {
        self.buckets.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bucket contents sorted by lowercase display name, the render order.
    pub fn sorted(&self, role: Role) -> Vec<&RosterEntry> {
        let mut entries: Vec<&RosterEntry> = self.bucket(role).iter().collect();
        entries.sort_by_cached_key(|entry| entry.display_name.to_lowercase());
        entries
    }

    pub fn count(&self, role: Role) -> usize {
        self.bucket(role).len()
    }
}

/// Concatenate each role's lists in input order (internal and external
/// sub-groups are not deduplicated against each other), attach emails and
/// build the membership index in the same pass.
pub fn aggregate(inputs: &[LabelledMembers], emails: &EmailIndex) -> Roster {
    let mut roster = Roster::default();
    for role in Role::ALL {
        roster.buckets.insert(role, Vec::new());
    }

    for input in inputs {
        let bucket = roster.buckets.entry(input.role).or_default();
        for user in &input.users {
            bucket.push(RosterEntry {
                account_id: user.account_id.clone(),
                display_name: user.display_name.clone(),
                email: emails.email_for(&user.account_id).to_string(),
            });
            if !user.account_id.is_empty() {
                roster
                    .membership
                    .0
                    .entry(user.account_id.clone())
                    .or_default()
                    .insert(input.group.clone());
            }
        }
        debug!(role = ?input.role, group = %input.group, added = input.users.len(), "Aggregated group");
    }

    roster
}
