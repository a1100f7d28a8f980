mod tools;

#[cfg(test)]
mod schedule_repo_tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDateTime;
    use roster_engine::{GeneratedSchedule, Member, Role, ServiceRoster};
    use roster_manager_lib::domain::schedule_model::RosterEdit;
    use roster_manager_lib::error::RosterError;
    use roster_manager_lib::infrastructure::schedule_repo::ScheduleRepository;

    use crate::tools::fixtures::*;

    fn roster(service_at: NaiveDateTime, slots: &[(Role, i64, &str)]) -> ServiceRoster {
        let mut roles: BTreeMap<Role, Vec<Member>> = BTreeMap::new();
        for (role, id, name) in slots {
            roles.entry(*role).or_default().push(Member {
                id: *id,
                name: name.to_string(),
                roles: vec![*role],
            });
        }
        ServiceRoster {
            service_at,
            roles,
            shortfalls: Vec::new(),
        }
    }

    #[tokio::test]
    async fn confirm_persists_one_row_per_slot() {
        // Arrange
        let pool = setup_test_db().await;
        let ana = seed_member(&pool, "Ana", "Vocalist").await;
        let bia = seed_member(&pool, "Bia", "Drummer").await;
        let sunday = at(2025, 9, 7, 10, 0);
        let schedule = GeneratedSchedule {
            services: vec![roster(sunday, &[(Role::Vocalist, ana, "Ana"), (Role::Drummer, bia, "Bia")])],
        };
        let repo = ScheduleRepository::new(pool.clone());

        // Act
        let inserted = repo.insert_schedule(&schedule).await.unwrap();

        // Assert
        assert_eq!(inserted, 2);
        let saved = repo.service_roster(sunday).await.unwrap().unwrap();
        assert_eq!(saved.headcount(), 2);
        assert_eq!(saved.roles[&Role::Drummer][0].name, "Bia");
        assert_eq!(repo.existing_service_times(&[sunday]).await.unwrap(), vec![sunday]);
    }

    #[tokio::test]
    async fn confirming_an_occupied_service_writes_nothing() {
        // Arrange
        let pool = setup_test_db().await;
        let ana = seed_member(&pool, "Ana", "Vocalist").await;
        let bia = seed_member(&pool, "Bia", "Vocalist").await;
        let free = at(2025, 9, 7, 10, 0);
        let taken = at(2025, 9, 14, 10, 0);
        seed_assignment(&pool, bia, taken, Role::Vocalist).await;
        let schedule = GeneratedSchedule {
            services: vec![
                roster(free, &[(Role::Vocalist, ana, "Ana")]),
                roster(taken, &[(Role::Vocalist, ana, "Ana")]),
            ],
        };
        let repo = ScheduleRepository::new(pool.clone());

        // Act
        let result = repo.insert_schedule(&schedule).await;

        // Assert
        match result {
            Err(RosterError::ScheduleConflict { services }) => assert_eq!(services, vec![taken]),
            other => panic!("expected a schedule conflict, got {other:?}"),
        }
        assert_eq!(count_rows(&pool, "assignments").await, 1);
    }

    #[tokio::test]
    async fn delete_service_removes_every_role() {
        let pool = setup_test_db().await;
        let ana = seed_member(&pool, "Ana", "Vocalist").await;
        let bia = seed_member(&pool, "Bia", "Drummer").await;
        let sunday = at(2025, 9, 7, 10, 0);
        seed_assignment(&pool, ana, sunday, Role::Vocalist).await;
        seed_assignment(&pool, bia, sunday, Role::Drummer).await;
        seed_assignment(&pool, bia, at(2025, 9, 7, 19, 0), Role::Drummer).await;
        let repo = ScheduleRepository::new(pool.clone());

        assert_eq!(repo.delete_service(sunday).await.unwrap(), 2);
        assert_eq!(count_rows(&pool, "assignments").await, 1);
        assert!(matches!(
            repo.delete_service(sunday).await,
            Err(RosterError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn edit_moves_and_replaces_a_service() {
        // Arrange
        let pool = setup_test_db().await;
        let ana = seed_member(&pool, "Ana", "Vocalist").await;
        let bia = seed_member(&pool, "Bia", "Vocalist,Drummer").await;
        let original = at(2025, 9, 7, 10, 0);
        let moved = at(2025, 9, 7, 18, 0);
        seed_assignment(&pool, ana, original, Role::Vocalist).await;
        let mut edit = RosterEdit::default();
        edit.roles.insert(Role::Vocalist, vec![bia]);
        edit.roles.insert(Role::Drummer, vec![ana]);
        let repo = ScheduleRepository::new(pool.clone());

        // Act
        let inserted = repo.replace_service(original, moved, &edit).await.unwrap();

        // Assert
        assert_eq!(inserted, 2);
        assert!(repo.service_roster(original).await.unwrap().is_none());
        let saved = repo.service_roster(moved).await.unwrap().unwrap();
        assert_eq!(saved.roles[&Role::Vocalist][0].member_id, bia);
    }

    #[tokio::test]
    async fn edit_refuses_missing_original_and_occupied_target() {
        // Arrange
        let pool = setup_test_db().await;
        let ana = seed_member(&pool, "Ana", "Vocalist").await;
        let first = at(2025, 9, 7, 10, 0);
        let second = at(2025, 9, 14, 10, 0);
        seed_assignment(&pool, ana, first, Role::Vocalist).await;
        seed_assignment(&pool, ana, second, Role::Vocalist).await;
        let mut edit = RosterEdit::default();
        edit.roles.insert(Role::Vocalist, vec![ana]);
        let repo = ScheduleRepository::new(pool.clone());

        // Act
        let missing = repo.replace_service(at(2025, 9, 21, 10, 0), first, &edit).await;
        let occupied = repo.replace_service(first, second, &edit).await;
        let unknown_member = {
            let mut bad = RosterEdit::default();
            bad.roles.insert(Role::Vocalist, vec![77]);
            repo.replace_service(first, first, &bad).await
        };

        // Assert
        assert!(matches!(missing, Err(RosterError::NotFound(_))));
        assert!(matches!(occupied, Err(RosterError::ScheduleConflict { .. })));
        assert!(matches!(unknown_member, Err(RosterError::NotFound(_))));
        assert_eq!(count_rows(&pool, "assignments").await, 2);
    }

    #[tokio::test]
    async fn edit_refuses_a_member_absent_on_the_target_date() {
        // Arrange
        let pool = setup_test_db().await;
        let ana = seed_member(&pool, "Ana", "Vocalist").await;
        let bia = seed_member(&pool, "Bia", "Vocalist").await;
        let original = at(2025, 9, 7, 10, 0);
        seed_assignment(&pool, ana, original, Role::Vocalist).await;
        sqlx::query("INSERT INTO absences (member_id, start_date, end_date) VALUES (?1, ?2, ?3)")
            .bind(bia)
            .bind(day(2025, 9, 14))
            .bind(day(2025, 9, 20))
            .execute(&pool)
            .await
            .unwrap();
        let mut edit = RosterEdit::default();
        edit.roles.insert(Role::Vocalist, vec![bia]);
        let repo = ScheduleRepository::new(pool.clone());

        // Act
        let moved = repo.replace_service(original, at(2025, 9, 14, 10, 0), &edit).await;
        let kept = repo.replace_service(original, original, &edit).await;

        // Assert: the absence blocks the move only
        assert!(matches!(
            moved,
            Err(RosterError::MemberAbsent { member_id, .. }) if member_id == bia
        ));
        assert_eq!(kept.unwrap(), 1);
        let saved = repo.service_roster(original).await.unwrap().unwrap();
        assert_eq!(saved.roles[&Role::Vocalist][0].member_id, bia);
    }

    #[tokio::test]
    async fn listing_and_stats() {
        // Arrange
        let pool = setup_test_db().await;
        let ana = seed_member(&pool, "Ana", "Vocalist,Keyboardist").await;
        let bia = seed_member(&pool, "Bia", "Vocalist").await;
        seed_assignment(&pool, ana, at(2025, 9, 7, 10, 0), Role::Keyboardist).await;
        seed_assignment(&pool, bia, at(2025, 9, 7, 10, 0), Role::Vocalist).await;
        seed_assignment(&pool, ana, at(2025, 9, 14, 10, 0), Role::Vocalist).await;
        let repo = ScheduleRepository::new(pool);

        // Act
        let saved = repo.list_saved().await.unwrap();
        let for_ana = repo.assignments_for_member(ana).await.unwrap();
        let stats = repo.stats().await.unwrap();

        // Assert
        assert_eq!(saved.len(), 3);
        assert_eq!(saved[0].service_at, at(2025, 9, 14, 10, 0));
        assert_eq!(for_ana.len(), 2);
        assert_eq!(stats.total_assignments, 3);
        assert_eq!(stats.total_services, 2);
        assert_eq!(stats.distinct_members, 2);
        assert_eq!(stats.first_service, Some(at(2025, 9, 7, 10, 0)));
        assert_eq!(stats.per_role[&Role::Vocalist], 2);
        assert_eq!(stats.per_role[&Role::Keyboardist], 1);
    }
}
