use chrono::NaiveDateTime;
use roster_engine::{parse_role_list, Member, MemberId, Role};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw `members` row. Roles are still delimited text here.
#[derive(Debug, FromRow)]
pub struct MemberRow {
    pub id: i64,
    pub name: String,
    pub roles: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: MemberId,
    pub name: String,
    pub roles: Vec<Role>,
    pub created_at: NaiveDateTime,
}

impl MemberRecord {
    pub fn to_member(&self) -> Member {
        Member {
            id: self.id,
            name: self.name.clone(),
            roles: self.roles.clone(),
        }
    }
}

impl TryFrom<MemberRow> for MemberRecord {
    type Error = sqlx::Error;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        let roles = parse_role_list(&row.roles).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        if roles.is_empty() {
            return Err(sqlx::Error::Decode(
                format!("member {} has no roles", row.id).into(),
            ));
        }
        Ok(Self {
            id: row.id,
            name: row.name,
            roles,
            created_at: row.created_at,
        })
    }
}

/// Validated input for creating or updating a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDraft {
    pub name: String,
    pub roles: Vec<Role>,
}

/// Counts removed alongside a deleted member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberDeletion {
    pub member_id: MemberId,
    pub absences_removed: u64,
    pub assignments_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    pub member_id: MemberId,
    pub name: String,
    pub roles: Vec<Role>,
    pub total_assignments: i64,
    pub recent_assignments: i64,
    pub last_service_at: Option<NaiveDateTime>,
    pub days_since_last_service: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(roles: &str) -> MemberRow {
        MemberRow {
            id: 4,
            name: "Ana".to_string(),
            roles: roles.to_string(),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn legacy_array_literal_is_normalized() {
        let record = MemberRecord::try_from(row("{Vocalist,Keyboardist}")).unwrap();
        assert_eq!(record.roles, vec![Role::Vocalist, Role::Keyboardist]);
        assert_eq!(record.to_member().roles, record.roles);
    }

    #[test]
    fn unreadable_roles_are_a_decode_error() {
        assert!(matches!(
            MemberRecord::try_from(row("Tuba")),
            Err(sqlx::Error::Decode(_))
        ));
        assert!(matches!(
            MemberRecord::try_from(row("")),
            Err(sqlx::Error::Decode(_))
        ));
    }
}
