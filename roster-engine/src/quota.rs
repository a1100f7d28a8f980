use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Required headcount per role for one generation request.
///
/// A role that is missing or mapped to 0 is not filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleQuota(BTreeMap<Role, u32>);

impl RoleQuota {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, role: Role, headcount: u32) -> Self {
        self.set(role, headcount);
        self
    }

    pub fn set(&mut self, role: Role, headcount: u32) {
        self.0.insert(role, headcount);
    }

    pub fn headcount(&self, role: Role) -> u32 {
        self.0.get(&role).copied().unwrap_or(0)
    }

    /// true if at least one role asks for someone
    pub fn has_demand(&self) -> bool {
        self.0.values().any(|n| *n > 0)
    }

    pub fn demanded_roles(&self) -> impl Iterator<Item = (Role, u32)> + '_ {
        self.0
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(role, n)| (*role, *n))
    }
}

impl FromIterator<(Role, u32)> for RoleQuota {
    fn from_iter<I: IntoIterator<Item = (Role, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_headcount_is_not_demand() {
        let quota = RoleQuota::new().with(Role::Drummer, 0);
        assert!(!quota.has_demand());
        assert_eq!(quota.demanded_roles().count(), 0);
    }

    #[test]
    fn missing_role_has_zero_headcount() {
        let quota = RoleQuota::new().with(Role::Vocalist, 2);
        assert_eq!(quota.headcount(Role::Vocalist), 2);
        assert_eq!(quota.headcount(Role::Bassist), 0);
        assert!(quota.has_demand());
    }
}
