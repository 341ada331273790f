//! Caller roles and user profiles.
//!
//! Roles are totally ordered `guest < user < admin`. A principal nobody has
//! seen before is a guest. Saving a profile registers the caller as a user;
//! only an admin can hand out roles, and the anonymous principal can never hold
//! anything above guest.

use crate::error::{ClinicError, ClinicResult};
use crate::ids::Timestamp;
use opd_types::{NonEmptyText, Principal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
}

impl Role {
    fn rank(self) -> u8 {
        match self {
            Role::Guest => 0,
            Role::User => 1,
            Role::Admin => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Whether this role meets `minimum`.
    pub fn satisfies(self, minimum: Role) -> bool {
        self >= minimum
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ClinicError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// Self-described profile of a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: NonEmptyText,
    /// Free-text job title such as "Doctor" or "Receptionist". Has no bearing on access.
    pub job_title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub principal: Principal,
    pub role: Role,
    pub role_assigned_at: Timestamp,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

/// Role and profile bookkeeping for every principal that has interacted with the service.
#[derive(Clone, Debug, Default)]
pub struct IdentityRegistry {
    accounts: BTreeMap<Principal, Account>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|account| (account.principal.clone(), account))
                .collect(),
        }
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.values().cloned().collect()
    }

    pub fn account(&self, principal: &Principal) -> Option<&Account> {
        self.accounts.get(principal)
    }

    /// Puts back an account exactly as it was, or forgets the principal when `previous` is `None`.
    pub fn restore_account(&mut self, principal: &Principal, previous: Option<Account>) {
        match previous {
            Some(account) => {
                self.accounts.insert(principal.clone(), account);
            }
            None => {
                self.accounts.remove(principal);
            }
        }
    }

    fn admin_count(&self) -> usize {
        self.accounts
            .values()
            .filter(|account| account.role == Role::Admin)
            .count()
    }

    pub fn role_of(&self, principal: &Principal) -> Role {
        if principal.is_anonymous() {
            return Role::Guest;
        }
        self.accounts
            .get(principal)
            .map_or(Role::Guest, |account| account.role)
    }

    /// # Errors
    ///
    /// Returns [`ClinicError::Unauthorized`] if the caller's role is below `minimum`.
    pub fn require_role(&self, principal: &Principal, minimum: Role) -> ClinicResult<Role> {
        let actual = self.role_of(principal);
        if actual.satisfies(minimum) {
            Ok(actual)
        } else {
            Err(ClinicError::Unauthorized {
                required: minimum,
                actual,
            })
        }
    }

    pub fn profile_of(&self, principal: &Principal) -> Option<UserProfile> {
        self.accounts
            .get(principal)
            .and_then(|account| account.profile.clone())
    }

    /// Creates or replaces the caller's own profile.
    ///
    /// A guest saving a profile becomes a user; any higher role is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::Unauthorized`] for the anonymous principal.
    pub fn save_profile(
        &mut self,
        principal: &Principal,
        profile: UserProfile,
        now: Timestamp,
    ) -> ClinicResult<Role> {
        if principal.is_anonymous() {
            return Err(ClinicError::Unauthorized {
                required: Role::User,
                actual: Role::Guest,
            });
        }

        let account = self
            .accounts
            .entry(principal.clone())
            .or_insert_with(|| Account {
                principal: principal.clone(),
                role: Role::Guest,
                role_assigned_at: now,
                profile: None,
            });

        if account.role == Role::Guest {
            account.role = Role::User;
            account.role_assigned_at = now;
        }
        account.profile = Some(profile);
        Ok(account.role)
    }

    /// Records `role` for `target`. Authorization of the caller is the
    /// facade's job; this only refuses the anonymous principal and the
    /// demotion of the last remaining admin.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::InvalidInput`] when `target` is anonymous and `role` is above guest,
    /// or when `target` is the only admin and `role` is below admin.
    pub fn assign_role(
        &mut self,
        target: &Principal,
        role: Role,
        now: Timestamp,
    ) -> ClinicResult<()> {
        if target.is_anonymous() {
            if role == Role::Guest {
                return Ok(());
            }
            return Err(ClinicError::InvalidInput(
                "the anonymous principal cannot be assigned a role".into(),
            ));
        }

        if role != Role::Admin && self.role_of(target) == Role::Admin && self.admin_count() == 1 {
            return Err(ClinicError::InvalidInput(format!(
                "{target} is the last admin and cannot be demoted"
            )));
        }

        let account = self
            .accounts
            .entry(target.clone())
            .or_insert_with(|| Account {
                principal: target.clone(),
                role,
                role_assigned_at: now,
                profile: None,
            });
        account.role = role;
        account.role_assigned_at = now;
        Ok(())
    }
}
