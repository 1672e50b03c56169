use axum::http::StatusCode;
use chrono::{Duration, NaiveDateTime};
use medportal_api::{
    handlers::appointments::{authorize_status_change, ensure_can_view, status_change_notifications},
    middleware::error_handling::AppError,
};
use medportal_core::{
    errors::PortalError,
    models::{
        appointment::{Appointment, AppointmentStatus},
        user::Role,
    },
    scheduling::{ensure_slot_available, Slot},
};
use medportal_db::models::convert_all;
use mockall::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

use crate::test_utils::{date, db_appointment, time, TestContext};

// Mirrors the pre-insert check of the booking path, with the doctor's day
// coming from the mock repository.
async fn check_booking(
    ctx: &TestContext,
    doctor_id: Uuid,
    slot: Slot,
) -> Result<(), AppError> {
    let on = date(2030, 5, 6);
    let rows = ctx.appointment_repo.get_doctor_appointments_on(doctor_id, on).await?;
    let existing: Vec<Appointment> = convert_all(rows)?;
    ensure_slot_available(on, &slot, &existing)?;
    Ok(())
}

fn appointment_starting(starts_at: NaiveDateTime, status: AppointmentStatus) -> Appointment {
    let mut appointment: Appointment = db_appointment(
        Uuid::new_v4(),
        Uuid::new_v4(),
        starts_at.date(),
        starts_at.time(),
        starts_at.time() + Duration::minutes(30),
        "scheduled",
    )
    .try_into()
    .unwrap();
    appointment.status = status;
    appointment
}

fn now() -> NaiveDateTime {
    date(2030, 5, 1).and_time(time(12, 0))
}

#[rstest]
#[case::overlapping_start(time(9, 15), time(9, 45), Some(StatusCode::CONFLICT))]
#[case::contained(time(9, 5), time(9, 25), Some(StatusCode::CONFLICT))]
#[case::back_to_back(time(9, 30), time(10, 0), None)]
#[case::ends_at_start(time(8, 30), time(9, 0), None)]
#[tokio::test]
async fn test_booking_against_existing_appointment(
    #[case] start: chrono::NaiveTime,
    #[case] end: chrono::NaiveTime,
    #[case] expected: Option<StatusCode>,
) {
    let doctor_id = Uuid::new_v4();
    let mut ctx = TestContext::new();
    ctx.appointment_repo
        .expect_get_doctor_appointments_on()
        .with(predicate::eq(doctor_id), predicate::eq(date(2030, 5, 6)))
        .times(1)
        .returning(move |doctor, on| {
            Ok(vec![db_appointment(
                Uuid::new_v4(),
                doctor,
                on,
                time(9, 0),
                time(9, 30),
                "scheduled",
            )])
        });

    let result = check_booking(&ctx, doctor_id, Slot::new(start, end).unwrap()).await;

    assert_eq!(result.err().map(|e| e.status()), expected);
}

#[tokio::test]
async fn test_cancelled_appointment_frees_the_slot() {
    let doctor_id = Uuid::new_v4();
    let mut ctx = TestContext::new();
    ctx.appointment_repo
        .expect_get_doctor_appointments_on()
        .returning(|doctor, on| {
            Ok(vec![db_appointment(
                Uuid::new_v4(),
                doctor,
                on,
                time(9, 0),
                time(9, 30),
                "cancelled",
            )])
        });

    let result = check_booking(&ctx, doctor_id, Slot::new(time(9, 0), time(9, 30)).unwrap()).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_unknown_status_in_row_is_rejected() {
    let mut ctx = TestContext::new();
    ctx.appointment_repo
        .expect_get_doctor_appointments_on()
        .returning(|doctor, on| {
            Ok(vec![db_appointment(
                Uuid::new_v4(),
                doctor,
                on,
                time(9, 0),
                time(9, 30),
                "postponed",
            )])
        });

    let result = check_booking(&ctx, Uuid::new_v4(), Slot::new(time(11, 0), time(11, 30)).unwrap()).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_default_duration_comes_from_settings() {
    let ctx = TestContext::new().with_default_settings();

    let settings = ctx.settings_repo.load_scheduling_settings().await.unwrap();
    let slot = Slot::from_start(time(14, 0), settings.default_duration_minutes).unwrap();

    assert_eq!(slot.end, time(14, 30));
}

#[tokio::test]
async fn test_patient_cancellation_respects_notice_period() {
    let ctx = TestContext::new().with_default_settings();
    let notice = ctx
        .settings_repo
        .load_scheduling_settings()
        .await
        .unwrap()
        .cancellation_notice_hours;

    let exactly_on_time = appointment_starting(now() + Duration::hours(24), AppointmentStatus::Scheduled);
    assert!(
        authorize_status_change(&exactly_on_time, Role::Patient, AppointmentStatus::Cancelled, notice, now())
            .is_ok()
    );

    let too_late = appointment_starting(now() + Duration::hours(2), AppointmentStatus::Scheduled);
    let err = authorize_status_change(&too_late, Role::Patient, AppointmentStatus::Cancelled, notice, now())
        .unwrap_err();
    match &err {
        PortalError::PolicyViolation { required_notice_hours } => assert_eq!(*required_notice_hours, 24),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(AppError(err).status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[rstest]
#[case::doctor(Role::Doctor)]
#[case::admin(Role::Admin)]
fn test_staff_cancel_without_notice(#[case] role: Role) {
    let soon = appointment_starting(now() + Duration::minutes(10), AppointmentStatus::Scheduled);
    assert!(authorize_status_change(&soon, role, AppointmentStatus::Cancelled, 24, now()).is_ok());
}

#[rstest]
#[case::completed(AppointmentStatus::Completed)]
#[case::no_show(AppointmentStatus::NoShow)]
fn test_patient_cannot_set_other_statuses(#[case] requested: AppointmentStatus) {
    let later = appointment_starting(now() + Duration::days(3), AppointmentStatus::Scheduled);
    let err = authorize_status_change(&later, Role::Patient, requested, 24, now()).unwrap_err();
    assert_eq!(AppError(err).status(), StatusCode::FORBIDDEN);
}

#[test]
fn test_terminal_appointments_cannot_change() {
    let done = appointment_starting(now() + Duration::days(3), AppointmentStatus::Completed);

    let err = authorize_status_change(&done, Role::Doctor, AppointmentStatus::Cancelled, 24, now())
        .unwrap_err();
    assert_eq!(AppError(err).status(), StatusCode::BAD_REQUEST);

    let err = authorize_status_change(&done, Role::Admin, AppointmentStatus::NoShow, 24, now())
        .unwrap_err();
    assert_eq!(AppError(err).status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transition_result_from_repository() {
    let mut ctx = TestContext::new();
    let id = Uuid::new_v4();
    ctx.appointment_repo
        .expect_transition_status()
        .with(
            predicate::eq(id),
            predicate::eq(AppointmentStatus::Scheduled),
            predicate::eq(AppointmentStatus::Completed),
        )
        .times(1)
        .returning(|_, _, _| {
            Ok(db_appointment(
                Uuid::new_v4(),
                Uuid::new_v4(),
                date(2030, 5, 6),
                time(9, 0),
                time(9, 30),
                "completed",
            ))
        });

    let updated: Appointment = ctx
        .appointment_repo
        .transition_status(id, AppointmentStatus::Scheduled, AppointmentStatus::Completed)
        .await
        .unwrap()
        .try_into()
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Completed);
}

#[test]
fn test_only_participants_and_admins_can_view() {
    let appointment = appointment_starting(now() + Duration::days(1), AppointmentStatus::Scheduled);

    assert!(ensure_can_view(&appointment, appointment.patient_id, Role::Patient).is_ok());
    assert!(ensure_can_view(&appointment, appointment.doctor_id, Role::Doctor).is_ok());
    assert!(ensure_can_view(&appointment, Uuid::new_v4(), Role::Admin).is_ok());
    assert!(ensure_can_view(&appointment, Uuid::new_v4(), Role::Doctor).is_err());
}

#[test]
fn test_status_change_notifies_the_other_participant() {
    let mut appointment = appointment_starting(now() + Duration::days(1), AppointmentStatus::Scheduled);
    appointment.status = AppointmentStatus::Cancelled;

    let notifications = status_change_notifications(&appointment, appointment.patient_id);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].recipient_id, appointment.doctor_id);
    assert_eq!(notifications[0].title, "Appointment cancelled");
    assert_eq!(
        notifications[0].link.as_deref(),
        Some(format!("/appointments/{}", appointment.id).as_str())
    );

    // An admin acting on the appointment notifies both sides.
    let notifications = status_change_notifications(&appointment, Uuid::new_v4());
    assert_eq!(notifications.len(), 2);
}
