use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use roster_engine::{validate_request, AvailableMember, GeneratedSchedule, MemberId, RoleQuota, ServicePlan};
use tracing::{info, warn};

use crate::application::dto::{AbsenceRequest, EditServiceRequest, GenerateRequest, MemberRequest};
use crate::application::notify::ScheduleEvent;
use crate::application::time::{format_service, window_start};
use crate::domain::absence_model::{Absence, AbsenceOutcome, NewAbsence};
use crate::domain::member_model::{MemberDeletion, MemberRecord, MemberStats};
use crate::domain::schedule_model::{Assignment, SavedService, ScheduleStats};
use crate::error::{Result, RosterError};
use crate::AppServices;

// --- Members ---

pub async fn add_member(app: &AppServices, request: &MemberRequest) -> Result<MemberRecord> {
    let draft = request.parse()?;
    let record = app.members.insert(&draft).await?;
    app.notifier.publish(ScheduleEvent::MemberChanged { member_id: record.id });
    Ok(record)
}

pub async fn update_member(app: &AppServices, id: MemberId, request: &MemberRequest) -> Result<MemberRecord> {
    let draft = request.parse()?;
    let record = app.members.update(id, &draft).await?;
    app.notifier.publish(ScheduleEvent::MemberChanged { member_id: id });
    Ok(record)
}

pub async fn delete_member(app: &AppServices, id: MemberId) -> Result<MemberDeletion> {
    let deletion = app.members.delete(id).await?;
    app.notifier.publish(ScheduleEvent::MemberDeleted { member_id: id });
    Ok(deletion)
}

pub async fn list_members(app: &AppServices) -> Result<Vec<MemberRecord>> {
    app.members.list().await
}

pub async fn find_member(app: &AppServices, id: MemberId) -> Result<MemberRecord> {
    app.members.get(id).await
}

pub async fn member_stats(app: &AppServices, today: NaiveDate) -> Result<Vec<MemberStats>> {
    app.members
        .stats(today, window_start(today, app.history_window_days))
        .await
}

// --- Absences ---

/// Records an absence and drops the member from every service it covers.
pub async fn record_absence(app: &AppServices, request: &AbsenceRequest) -> Result<AbsenceOutcome> {
    let absence = request.parse()?;
    let outcome = app.absences.record_with_cascade(&absence).await?;
    app.notifier.publish(ScheduleEvent::AbsenceRecorded {
        absence_id: outcome.absence.id,
        member_id: outcome.absence.member_id,
        removed: outcome.removed_count(),
    });
    Ok(outcome)
}

/// Moves an absence. The owner cannot change; `request.member_id` is ignored.
pub async fn update_absence(app: &AppServices, id: i64, request: &AbsenceRequest) -> Result<AbsenceOutcome> {
    let parsed = request.parse()?;
    let existing = app
        .absences
        .find(id)
        .await?
        .ok_or_else(|| RosterError::NotFound(format!("absence {id}")))?;

    let absence = NewAbsence {
        member_id: existing.member_id,
        ..parsed
    };
    let outcome = app.absences.update_with_cascade(id, &absence).await?;
    app.notifier.publish(ScheduleEvent::AbsenceUpdated {
        absence_id: id,
        member_id: existing.member_id,
        removed: outcome.removed_count(),
    });
    Ok(outcome)
}

pub async fn delete_absence(app: &AppServices, id: i64) -> Result<Absence> {
    let absence = app.absences.delete(id).await?;
    app.notifier.publish(ScheduleEvent::AbsenceRemoved {
        absence_id: id,
        member_id: absence.member_id,
    });
    Ok(absence)
}

pub async fn list_absences(app: &AppServices) -> Result<Vec<Absence>> {
    app.absences.list().await
}

pub async fn absences_for_member(app: &AppServices, member_id: MemberId) -> Result<Vec<Absence>> {
    app.absences.for_member(member_id).await
}

pub async fn is_absent(app: &AppServices, member_id: MemberId, date: NaiveDate) -> Result<bool> {
    app.absences.is_absent(member_id, date).await
}

// --- Schedules ---

pub async fn generate_schedule(
    app: &AppServices,
    request: &GenerateRequest,
    as_of: NaiveDate,
) -> Result<GeneratedSchedule> {
    let (services, quota) = request.parse()?;
    generate(app, &services, &quota, as_of).await
}

/// Generates, without persisting, a roster for every service in `services`.
///
/// `as_of` is "today" for the recent-history window. Either every service
/// gets a roster or the whole call fails.
pub async fn generate(
    app: &AppServices,
    services: &[NaiveDateTime],
    quota: &RoleQuota,
    as_of: NaiveDate,
) -> Result<GeneratedSchedule> {
    // 1. preconditions
    validate_request(services, quota)?;

    // 2. never overwrite a persisted service
    let occupied = app.schedules.existing_service_times(services).await?;
    if !occupied.is_empty() {
        warn!(conflicts = occupied.len(), "generation refused, services already scheduled");
        return Err(RosterError::ScheduleConflict { services: occupied });
    }

    info!(services = services.len(), "generating schedule");

    // 3. availability, one date at a time
    let mut by_date: HashMap<NaiveDate, Vec<AvailableMember>> = HashMap::new();
    let mut plans = Vec::with_capacity(services.len());
    for service_at in services {
        let date = service_at.date();
        let available = match by_date.get(&date) {
            Some(cached) => cached.clone(),
            None => {
                let resolved = app.availability.resolve(date, as_of).await?;
                by_date.insert(date, resolved.clone());
                resolved
            }
        };
        plans.push(ServicePlan::new(*service_at, available));
    }

    // 4. assignment
    let schedule = app.engine.generate(&plans, quota)?;

    app.notifier.publish(ScheduleEvent::ScheduleGenerated {
        services: services.to_vec(),
        fully_staffed: schedule.is_fully_staffed(),
    });
    Ok(schedule)
}

/// Persists a generated schedule. Re-checks for conflicts inside the write.
pub async fn confirm_schedule(app: &AppServices, schedule: &GeneratedSchedule) -> Result<u64> {
    let inserted = app.schedules.insert_schedule(schedule).await?;
    app.notifier.publish(ScheduleEvent::ScheduleConfirmed {
        services: schedule.services.iter().map(|s| s.service_at).collect(),
        assignments: inserted,
    });
    Ok(inserted)
}

pub async fn list_saved(app: &AppServices) -> Result<Vec<Assignment>> {
    app.schedules.list_saved().await
}

pub async fn service_roster(app: &AppServices, service_at: NaiveDateTime) -> Result<SavedService> {
    app.schedules
        .service_roster(service_at)
        .await?
        .ok_or_else(|| RosterError::NotFound(format!("no schedule for {}", format_service(service_at))))
}

pub async fn assignments_for_member(app: &AppServices, member_id: MemberId) -> Result<Vec<Assignment>> {
    app.schedules.assignments_for_member(member_id).await
}

pub async fn delete_service(app: &AppServices, service_at: NaiveDateTime) -> Result<u64> {
    let removed = app.schedules.delete_service(service_at).await?;
    app.notifier
        .publish(ScheduleEvent::ServiceDeleted { service_at, removed });
    Ok(removed)
}

pub async fn edit_service(app: &AppServices, request: &EditServiceRequest) -> Result<u64> {
    let edit = request.parse()?;
    let inserted = app
        .schedules
        .replace_service(edit.original, edit.replacement, &edit.roster)
        .await?;
    app.notifier.publish(ScheduleEvent::ScheduleEdited {
        original: edit.original,
        replacement: edit.replacement,
        assignments: inserted,
    });
    Ok(inserted)
}

pub async fn schedule_stats(app: &AppServices) -> Result<ScheduleStats> {
    app.schedules.stats().await
}
