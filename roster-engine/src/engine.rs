use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::member::{AvailableMember, Member, MemberId};
use crate::quota::RoleQuota;
use crate::role::{Role, RoleOrder};
use crate::scorecard::{RotationScorecard, ScorecardBook};
use crate::scoring::ScoreWeights;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub role_order: RoleOrder,
    pub weights: ScoreWeights,
}

/// One service timestamp and the members who can serve on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub service_at: NaiveDateTime,
    pub available: Vec<AvailableMember>,
}

impl ServicePlan {
    pub fn new(service_at: NaiveDateTime, available: Vec<AvailableMember>) -> Self {
        Self {
            service_at,
            available,
        }
    }
}

/// A role that could not be filled to its requested headcount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub role: Role,
    pub requested: u32,
    pub filled: u32,
}

/// Assignments for one service. Every demanded role has an entry, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRoster {
    pub service_at: NaiveDateTime,
    pub roles: BTreeMap<Role, Vec<Member>>,
    pub shortfalls: Vec<Shortfall>,
}

impl ServiceRoster {
    fn new(service_at: NaiveDateTime) -> Self {
        Self {
            service_at,
            roles: BTreeMap::new(),
            shortfalls: Vec::new(),
        }
    }

    pub fn members_in(&self, role: Role) -> &[Member] {
        self.roles.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// (member, role) pairs in role order.
    pub fn assignments(&self) -> impl Iterator<Item = (&Member, Role)> + '_ {
        self.roles
            .iter()
            .flat_map(|(role, members)| members.iter().map(move |m| (m, *role)))
    }

    pub fn is_fully_staffed(&self) -> bool {
        self.shortfalls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSchedule {
    pub services: Vec<ServiceRoster>,
}

impl GeneratedSchedule {
    pub fn service(&self, service_at: NaiveDateTime) -> Option<&ServiceRoster> {
        self.services.iter().find(|s| s.service_at == service_at)
    }

    pub fn is_fully_staffed(&self) -> bool {
        self.services.iter().all(ServiceRoster::is_fully_staffed)
    }

    pub fn assignment_count(&self) -> usize {
        self.services.iter().map(|s| s.assignments().count()).sum()
    }
}

/// Equitable assignment engine.
///
/// Pure: everything it needs arrives in the call and nothing is stored
/// between calls.
#[derive(Debug, Clone, Default)]
pub struct AssignmentEngine {
    config: EngineConfig,
}

impl AssignmentEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fills every service in `plans`, in the given order, against `quota`.
    ///
    /// Under-filled roles are reported on the roster, not as an error.
    pub fn generate(&self, plans: &[ServicePlan], quota: &RoleQuota) -> Result<GeneratedSchedule> {
        let services: Vec<NaiveDateTime> = plans.iter().map(|p| p.service_at).collect();
        validate_request(&services, quota)?;

        let mut book = ScorecardBook::new();
        for candidate in plans.iter().flat_map(|p| p.available.iter()) {
            book.enroll(candidate.id());
        }

        let services: Vec<ServiceRoster> = plans
            .iter()
            .enumerate()
            .map(|(index, plan)| self.fill_service(index, plan, quota, &mut book))
            .collect();

        let schedule = GeneratedSchedule { services };
        info!(
            services = schedule.services.len(),
            assignments = schedule.assignment_count(),
            fully_staffed = schedule.is_fully_staffed(),
            "schedule generated"
        );
        Ok(schedule)
    }

    fn fill_service(
        &self,
        index: usize,
        plan: &ServicePlan,
        quota: &RoleQuota,
        book: &mut ScorecardBook,
    ) -> ServiceRoster {
        let mut roster = ServiceRoster::new(plan.service_at);
        let mut taken: HashSet<MemberId> = HashSet::new();
        let blank = RotationScorecard::default();

        for role in self
            .config
            .role_order
            .for_date(index, |r| quota.headcount(r) > 0)
        {
            let requested = quota.headcount(role);

            let mut ranked: Vec<(i64, &AvailableMember)> = plan
                .available
                .iter()
                .filter(|c| c.member.holds(role) && !taken.contains(&c.id()))
                .map(|c| {
                    let card = book.card(c.id()).unwrap_or(&blank);
                    (self.config.weights.score(c, role, card), c)
                })
                .collect();
            ranked.sort_by_key(|(score, c)| (*score, c.id()));

            let winners: Vec<Member> = ranked
                .into_iter()
                .take(requested as usize)
                .map(|(score, c)| {
                    debug!(service_at = %plan.service_at, %role, member = c.id(), score, "picked");
                    c.member.clone()
                })
                .collect();

            for winner in &winners {
                taken.insert(winner.id);
                book.record(winner.id, role);
            }

            let filled = winners.len() as u32;
            if filled < requested {
                warn!(
                    service_at = %plan.service_at,
                    %role,
                    requested,
                    filled,
                    "role under-filled"
                );
                roster.shortfalls.push(Shortfall {
                    role,
                    requested,
                    filled,
                });
            }
            roster.roles.insert(role, winners);
        }

        roster
    }
}

/// Preconditions of [`AssignmentEngine::generate`], checkable before any
/// availability is resolved.
pub fn validate_request(services: &[NaiveDateTime], quota: &RoleQuota) -> Result<()> {
    if services.is_empty() {
        return Err(EngineError::NoServices);
    }
    if !quota.has_demand() {
        return Err(EngineError::NoDemand);
    }
    let mut seen = HashSet::new();
    for service_at in services {
        if !seen.insert(*service_at) {
            return Err(EngineError::DuplicateService(*service_at));
        }
    }
    Ok(())
}
