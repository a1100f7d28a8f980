use serde::{Deserialize, Serialize};

use crate::member::AvailableMember;
use crate::role::Role;
use crate::scorecard::RotationScorecard;

/// Weights of the candidate score. Lower scores win.
///
/// The defaults reproduce the production rotation; they are exposed so that
/// a deployment can tune how hard rotation and recency push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Per position in the member's role list, for never-assigned multi-role members.
    pub role_position: i64,
    /// Flat penalty once a member has any persisted assignment.
    pub previously_assigned: i64,
    /// Per persisted assignment inside the recent window.
    pub recent_assignment: i64,
    /// Credit per day since the last persisted assignment.
    pub idle_day: i64,
    /// Per assignment already made in this run.
    pub run_assignment: i64,
    /// Multi-role member whose last role this run was the same role.
    pub run_repeat: i64,
    /// Multi-role member whose last persisted role was the same role.
    pub history_repeat: i64,
    /// Multi-role member, per run assignment in this role.
    pub multi_role_count: i64,
    /// Credit for a multi-role member used only in this role so far.
    pub diversify_credit: i64,
    /// Single-role member, per run assignment in this role.
    pub single_role_count: i64,
    /// Applied to every member whose last role this run was the same role.
    pub repeat_any: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            role_position: 10,
            previously_assigned: 1000,
            recent_assignment: 100,
            idle_day: 10,
            run_assignment: 50,
            run_repeat: 3000,
            history_repeat: 5000,
            multi_role_count: 50,
            diversify_credit: 200,
            single_role_count: 30,
            repeat_any: 15,
        }
    }
}

impl ScoreWeights {
    pub fn score(&self, candidate: &AvailableMember, role: Role, card: &RotationScorecard) -> i64 {
        let member = &candidate.member;
        let history = &candidate.history;
        let multi_role = member.is_multi_role();

        // 1. persisted history
        let mut score = if history.ever_assigned {
            self.previously_assigned
        } else if multi_role {
            let position = member.role_position(role).unwrap_or(0) as i64;
            position * self.role_position
        } else {
            0
        };
        score += i64::from(history.assignments_in_last_90_days) * self.recent_assignment;
        score -= history.days_since_last_assignment.unwrap_or(0) * self.idle_day;

        // 2. stable tiebreak
        score += member.id;

        // 3. this run
        score += i64::from(card.total_assignments) * self.run_assignment;

        let in_role = i64::from(card.count_in(role));
        let repeated_in_run = card.last_role == Some(role);

        if multi_role {
            if repeated_in_run {
                score += self.run_repeat;
            }
            if history.last_assigned_role == Some(role) {
                score += self.history_repeat;
            }
            score += in_role * self.multi_role_count;
            if in_role > 0 && card.count_in_other_roles(role) == 0 {
                score -= self.diversify_credit;
            }
        } else {
            score += in_role * self.single_role_count;
        }

        if repeated_in_run {
            score += self.repeat_any;
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{HistoryFacts, Member};

    fn candidate(id: i64, roles: Vec<Role>, history: HistoryFacts) -> AvailableMember {
        AvailableMember::new(Member::new(id, format!("m{id}"), roles).unwrap(), history)
    }

    #[test]
    fn never_assigned_multi_role_pays_for_role_position() {
        let weights = ScoreWeights::default();
        let c = candidate(3, vec![Role::Vocalist, Role::Guitarist], HistoryFacts::never_assigned());
        let card = RotationScorecard::default();

        assert_eq!(weights.score(&c, Role::Vocalist, &card), 3);
        assert_eq!(weights.score(&c, Role::Guitarist, &card), 13);
    }

    #[test]
    fn history_terms_are_combined() {
        let weights = ScoreWeights::default();
        let history = HistoryFacts {
            ever_assigned: true,
            days_since_last_assignment: Some(14),
            assignments_in_last_90_days: 2,
            last_assigned_role: Some(Role::Drummer),
        };
        let c = candidate(5, vec![Role::Drummer], history);

        // 1000 + 2*100 - 14*10 + 5
        assert_eq!(weights.score(&c, Role::Drummer, &RotationScorecard::default()), 1065);
    }

    #[test]
    fn multi_role_repeat_is_heavily_penalized() {
        let weights = ScoreWeights::default();
        let c = candidate(1, vec![Role::Vocalist, Role::Guitarist], HistoryFacts::never_assigned());
        let mut card = RotationScorecard::default();
        card.record(Role::Vocalist);

        // 0 + 1 + 50 + 3000 + 50 - 200 + 15
        assert_eq!(weights.score(&c, Role::Vocalist, &card), 2916);
        // 10 + 1 + 50
        assert_eq!(weights.score(&c, Role::Guitarist, &card), 61);
    }

    #[test]
    fn single_role_repeat_uses_light_weights() {
        let weights = ScoreWeights::default();
        let c = candidate(2, vec![Role::Bassist], HistoryFacts::never_assigned());
        let mut card = RotationScorecard::default();
        card.record(Role::Bassist);

        // 2 + 50 + 30 + 15
        assert_eq!(weights.score(&c, Role::Bassist, &card), 97);
    }

    #[test]
    fn last_persisted_role_counts_against_multi_role_members() {
        let weights = ScoreWeights::default();
        let history = HistoryFacts {
            ever_assigned: true,
            days_since_last_assignment: Some(0),
            assignments_in_last_90_days: 0,
            last_assigned_role: Some(Role::Keyboardist),
        };
        let c = candidate(1, vec![Role::Keyboardist, Role::Vocalist], history);
        let card = RotationScorecard::default();

        assert_eq!(
            weights.score(&c, Role::Keyboardist, &card) - weights.score(&c, Role::Vocalist, &card),
            5000
        );
    }
}
