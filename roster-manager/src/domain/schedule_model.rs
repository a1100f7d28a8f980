use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use roster_engine::{MemberId, Role};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct AssignmentRow {
    pub id: i64,
    pub member_id: i64,
    pub member_name: String,
    pub service_at: NaiveDateTime,
    pub role: String,
    pub assigned_at: NaiveDateTime,
}

/// A persisted (member, service, role) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub id: i64,
    pub member_id: MemberId,
    pub member_name: String,
    pub service_at: NaiveDateTime,
    pub role: Role,
    pub assigned_at: NaiveDateTime,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = sqlx::Error;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Self {
            id: row.id,
            member_id: row.member_id,
            member_name: row.member_name,
            service_at: row.service_at,
            role,
            assigned_at: row.assigned_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedMember {
    pub member_id: MemberId,
    pub name: String,
}

/// The confirmed roster of one service, grouped by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedService {
    pub service_at: NaiveDateTime,
    pub roles: BTreeMap<Role, Vec<AssignedMember>>,
}

impl SavedService {
    /// Groups assignments of the same service. The input must not mix services.
    pub fn from_assignments(service_at: NaiveDateTime, assignments: Vec<Assignment>) -> Self {
        let mut roles: BTreeMap<Role, Vec<AssignedMember>> = BTreeMap::new();
        for a in assignments {
            roles.entry(a.role).or_default().push(AssignedMember {
                member_id: a.member_id,
                name: a.member_name,
            });
        }
        Self { service_at, roles }
    }

    pub fn headcount(&self) -> usize {
        self.roles.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleStats {
    pub total_assignments: i64,
    pub total_services: i64,
    pub distinct_members: i64,
    pub first_service: Option<NaiveDateTime>,
    pub last_service: Option<NaiveDateTime>,
    pub per_role: BTreeMap<Role, i64>,
}

/// Replacement roster for one service, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterEdit {
    pub roles: BTreeMap<Role, Vec<MemberId>>,
}

impl RosterEdit {
    pub fn assignments(&self) -> impl Iterator<Item = (MemberId, Role)> + '_ {
        self.roles
            .iter()
            .flat_map(|(role, ids)| ids.iter().map(move |id| (*id, *role)))
    }

    /// First member that appears more than once, across all roles.
    pub fn double_booked(&self) -> Option<MemberId> {
        let mut seen = std::collections::HashSet::new();
        self.assignments().map(|(id, _)| id).find(|id| !seen.insert(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_detects_member_in_two_roles() {
        let mut edit = RosterEdit::default();
        edit.roles.insert(Role::Vocalist, vec![1, 2]);
        edit.roles.insert(Role::Drummer, vec![3]);
        assert_eq!(edit.double_booked(), None);

        edit.roles.insert(Role::Bassist, vec![2]);
        assert_eq!(edit.double_booked(), Some(2));
    }
}
