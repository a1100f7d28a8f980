use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use roster_engine::{parse_role_list, MemberId, Role, RoleQuota, ServiceRoster, Shortfall};
use serde::{Deserialize, Serialize};

use crate::application::time::{format_service, parse_date, parse_service_timestamp};
use crate::domain::absence_model::NewAbsence;
use crate::domain::member_model::MemberDraft;
use crate::domain::schedule_model::{RosterEdit, SavedService};
use crate::error::{Result, RosterError};

// =====================
// Requests
// =====================

/// Raw generation request, as it arrives from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    /// `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM[:SS]`, in processing order.
    pub dates: Vec<String>,
    /// Role name to headcount. Zero means "do not fill".
    pub quota: BTreeMap<String, u32>,
}

impl GenerateRequest {
    pub fn parse(&self) -> Result<(Vec<NaiveDateTime>, RoleQuota)> {
        if self.dates.is_empty() {
            return Err(RosterError::invalid("at least one service date is required"));
        }

        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(self.dates.len());
        for raw in &self.dates {
            let at = parse_service_timestamp(raw)?;
            if !seen.insert(at) {
                return Err(RosterError::invalid(format!(
                    "service {} was requested more than once",
                    format_service(at)
                )));
            }
            services.push(at);
        }

        let mut quota = RoleQuota::new();
        for (name, headcount) in &self.quota {
            let role: Role = name
                .parse()
                .map_err(|e: roster_engine::UnknownRole| RosterError::invalid(e.to_string()))?;
            quota.set(role, *headcount);
        }
        if !quota.has_demand() {
            return Err(RosterError::invalid(
                "at least one role needs a positive headcount",
            ));
        }

        Ok((services, quota))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberRequest {
    pub name: String,
    /// Role names; an entry may itself be a comma-delimited list.
    pub roles: Vec<String>,
}

impl MemberRequest {
    pub fn parse(&self) -> Result<MemberDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(RosterError::invalid("member name must not be empty"));
        }

        let mut roles: Vec<Role> = Vec::new();
        for entry in &self.roles {
            let parsed = parse_role_list(entry).map_err(|e| RosterError::invalid(e.to_string()))?;
            for role in parsed {
                if !roles.contains(&role) {
                    roles.push(role);
                }
            }
        }
        if roles.is_empty() {
            return Err(RosterError::invalid("a member needs at least one role"));
        }

        Ok(MemberDraft {
            name: name.to_string(),
            roles,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AbsenceRequest {
    pub member_id: MemberId,
    pub start_date: String,
    pub end_date: String,
    pub reason: Option<String>,
}

impl AbsenceRequest {
    pub fn parse(&self) -> Result<NewAbsence> {
        let start_date = parse_date(&self.start_date)?;
        let end_date = parse_date(&self.end_date)?;
        if end_date < start_date {
            return Err(RosterError::invalid("absence must not end before it starts"));
        }

        let reason = self
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(NewAbsence {
            member_id: self.member_id,
            start_date,
            end_date,
            reason,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditServiceRequest {
    pub original: String,
    /// New timestamp; `None` keeps the original.
    pub replacement: Option<String>,
    /// Role name to member ids.
    pub roles: BTreeMap<String, Vec<MemberId>>,
}

/// A parsed [`EditServiceRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEdit {
    pub original: NaiveDateTime,
    pub replacement: NaiveDateTime,
    pub roster: RosterEdit,
}

impl EditServiceRequest {
    pub fn parse(&self) -> Result<ServiceEdit> {
        let original = parse_service_timestamp(&self.original)?;
        let replacement = match &self.replacement {
            Some(raw) => parse_service_timestamp(raw)?,
            None => original,
        };

        let mut roster = RosterEdit::default();
        for (name, ids) in &self.roles {
            let role: Role = name
                .parse()
                .map_err(|e: roster_engine::UnknownRole| RosterError::invalid(e.to_string()))?;
            roster.roles.entry(role).or_default().extend(ids.iter().copied());
        }

        if roster.assignments().next().is_none() {
            return Err(RosterError::invalid("an edited service needs at least one assignment"));
        }
        if let Some(member_id) = roster.double_booked() {
            return Err(RosterError::invalid(format!(
                "member {member_id} appears more than once in the roster"
            )));
        }

        Ok(ServiceEdit {
            original,
            replacement,
            roster,
        })
    }
}

// =====================
// Views
// =====================

/// One service, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub service_at: NaiveDateTime,
    pub label: String,
    pub roles: BTreeMap<Role, Vec<String>>,
    pub shortfalls: Vec<Shortfall>,
}

impl From<&ServiceRoster> for ServiceView {
    fn from(roster: &ServiceRoster) -> Self {
        Self {
            service_at: roster.service_at,
            label: format_service(roster.service_at),
            roles: roster
                .roles
                .iter()
                .map(|(role, members)| (*role, members.iter().map(|m| m.name.clone()).collect()))
                .collect(),
            shortfalls: roster.shortfalls.clone(),
        }
    }
}

impl From<&SavedService> for ServiceView {
    fn from(saved: &SavedService) -> Self {
        Self {
            service_at: saved.service_at,
            label: format_service(saved.service_at),
            roles: saved
                .roles
                .iter()
                .map(|(role, members)| (*role, members.iter().map(|m| m.name.clone()).collect()))
                .collect(),
            shortfalls: Vec::new(),
        }
    }
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    fn quota(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn generate_request_parses_dates_and_quota() {
        let request = GenerateRequest {
            dates: vec!["2025-07-06T10:00".into(), "2025-07-06T19:00".into()],
            quota: quota(&[("vocalist", 2), ("Drummer", 0)]),
        };

        let (services, quota) = request.parse().unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(quota.headcount(Role::Vocalist), 2);
        assert_eq!(quota.demanded_roles().count(), 1);
    }

    #[test]
    fn generate_request_rejects_bad_input() {
        let cases = [
            GenerateRequest {
                dates: vec![],
                quota: quota(&[("Vocalist", 1)]),
            },
            GenerateRequest {
                dates: vec!["2025-07-06".into()],
                quota: quota(&[("Vocalist", 0)]),
            },
            GenerateRequest {
                dates: vec!["06/07/2025".into()],
                quota: quota(&[("Vocalist", 1)]),
            },
            GenerateRequest {
                dates: vec!["2025-07-06".into()],
                quota: quota(&[("Trumpet", 1)]),
            },
            GenerateRequest {
                dates: vec!["2025-07-06".into(), "2025-07-06T00:00".into()],
                quota: quota(&[("Vocalist", 1)]),
            },
        ];

        for request in cases {
            assert!(
                matches!(request.parse(), Err(RosterError::InvalidRequest(_))),
                "{request:?}"
            );
        }
    }

    #[test]
    fn member_request_merges_role_lists() {
        let request = MemberRequest {
            name: "  Bia ".into(),
            roles: vec!["Vocalist,Keyboardist".into(), "vocalist".into()],
        };
        let draft = request.parse().unwrap();
        assert_eq!(draft.name, "Bia");
        assert_eq!(draft.roles, vec![Role::Vocalist, Role::Keyboardist]);

        let empty = MemberRequest {
            name: "Bia".into(),
            roles: vec![],
        };
        assert!(empty.parse().is_err());
    }

    #[test]
    fn absence_request_checks_range() {
        let backwards = AbsenceRequest {
            member_id: 1,
            start_date: "2025-07-10".into(),
            end_date: "2025-07-09".into(),
            reason: None,
        };
        assert!(matches!(backwards.parse(), Err(RosterError::InvalidRequest(_))));

        let single_day = AbsenceRequest {
            member_id: 1,
            start_date: "2025-07-10".into(),
            end_date: "2025-07-10".into(),
            reason: Some("  ".into()),
        };
        assert_eq!(single_day.parse().unwrap().reason, None);
    }

    #[test]
    fn edit_request_rejects_double_booking() {
        let mut roles = BTreeMap::new();
        roles.insert("Vocalist".to_string(), vec![1]);
        roles.insert("Guitarist".to_string(), vec![1]);
        let request = EditServiceRequest {
            original: "2025-07-06T10:00".into(),
            replacement: None,
            roles,
        };
        assert!(matches!(request.parse(), Err(RosterError::InvalidRequest(_))));
    }
}
