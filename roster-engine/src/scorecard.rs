use std::collections::{BTreeMap, HashMap};

use crate::member::MemberId;
use crate::role::Role;

/// Per-member rotation state for one generation run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationScorecard {
    pub total_assignments: u32,
    pub last_role: Option<Role>,
    role_counts: BTreeMap<Role, u32>,
    roles_used: Vec<Role>,
}

impl RotationScorecard {
    pub fn count_in(&self, role: Role) -> u32 {
        self.role_counts.get(&role).copied().unwrap_or(0)
    }

    /// Assignments made so far in this run to any role except `role`.
    pub fn count_in_other_roles(&self, role: Role) -> u32 {
        self.role_counts
            .iter()
            .filter(|(r, _)| **r != role)
            .map(|(_, n)| *n)
            .sum()
    }

    /// Distinct roles used this run, in first-use order.
    pub fn roles_used(&self) -> &[Role] {
        &self.roles_used
    }

    pub fn record(&mut self, role: Role) {
        self.total_assignments += 1;
        self.last_role = Some(role);
        *self.role_counts.entry(role).or_insert(0) += 1;
        if !self.roles_used.contains(&role) {
            self.roles_used.push(role);
        }
    }
}

/// All scorecards of a run, keyed by member.
///
/// Owned by a single call to the engine and threaded through the date loop,
/// so concurrent runs never share state.
#[derive(Debug, Default)]
pub struct ScorecardBook {
    cards: HashMap<MemberId, RotationScorecard>,
}

impl ScorecardBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a member. Existing cards are left untouched.
    pub fn enroll(&mut self, member_id: MemberId) {
        self.cards.entry(member_id).or_default();
    }

    pub fn card(&self, member_id: MemberId) -> Option<&RotationScorecard> {
        self.cards.get(&member_id)
    }

    pub fn record(&mut self, member_id: MemberId, role: Role) {
        self.cards.entry(member_id).or_default().record(role);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_updates_every_counter() {
        let mut card = RotationScorecard::default();
        card.record(Role::Vocalist);
        card.record(Role::Guitarist);
        card.record(Role::Vocalist);

        assert_eq!(card.total_assignments, 3);
        assert_eq!(card.last_role, Some(Role::Vocalist));
        assert_eq!(card.count_in(Role::Vocalist), 2);
        assert_eq!(card.count_in_other_roles(Role::Vocalist), 1);
        assert_eq!(card.roles_used(), &[Role::Vocalist, Role::Guitarist]);
    }

    #[test]
    fn enroll_does_not_reset_existing_card() {
        let mut book = ScorecardBook::new();
        book.record(7, Role::Drummer);
        book.enroll(7);
        book.enroll(8);

        assert_eq!(book.len(), 2);
        assert_eq!(book.card(7).map(|c| c.total_assignments), Some(1));
        assert_eq!(book.card(8).map(|c| c.total_assignments), Some(0));
    }
}
