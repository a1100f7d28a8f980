use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::role::Role;

pub type MemberId = i64;

/// A volunteer and the roles they can serve in, in their declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub roles: Vec<Role>,
}

impl Member {
    /// Every member must hold at least one role.
    pub fn new(id: MemberId, name: impl Into<String>, roles: Vec<Role>) -> Result<Self, EngineError> {
        if roles.is_empty() {
            return Err(EngineError::MemberWithoutRoles(id));
        }
        Ok(Self {
            id,
            name: name.into(),
            roles,
        })
    }

    pub fn holds(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_multi_role(&self) -> bool {
        self.roles.len() > 1
    }

    /// Position of `role` in the member's declared list.
    pub fn role_position(&self, role: Role) -> Option<usize> {
        self.roles.iter().position(|r| *r == role)
    }
}

/// Persisted rotation history of one member, as seen from one service date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFacts {
    pub ever_assigned: bool,
    /// Days between the service date and the member's latest persisted
    /// assignment. Negative when that assignment lies after the date.
    pub days_since_last_assignment: Option<i64>,
    pub assignments_in_last_90_days: u32,
    pub last_assigned_role: Option<Role>,
}

impl HistoryFacts {
    /// History of a member that has never been scheduled.
    pub fn never_assigned() -> Self {
        Self::default()
    }
}

/// A member who is not absent on a given date, with their history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableMember {
    pub member: Member,
    pub history: HistoryFacts,
}

impl AvailableMember {
    pub fn new(member: Member, history: HistoryFacts) -> Self {
        Self { member, history }
    }

    pub fn id(&self) -> MemberId {
        self.member.id
    }
}
