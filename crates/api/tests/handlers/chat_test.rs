use axum::http::StatusCode;
use medportal_api::{
    handlers::chat::{ensure_can_contact, prepare_message},
    middleware::error_handling::AppError,
};
use medportal_core::models::{
    chat::{Conversation, ConversationStatus, Message, MAX_MESSAGE_LENGTH},
    user::Role,
};
use medportal_db::models::DbMessage;
use mockall::predicate;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::test_utils::{db_conversation, TestContext};

// Mirrors the send-message path: load, validate, persist.
async fn send_message_wrapper(
    ctx: &TestContext,
    conversation_id: Uuid,
    sender_id: Uuid,
    text: &str,
) -> Result<Message, AppError> {
    let conversation: Conversation = ctx
        .chat_repo
        .get_conversation_by_id(conversation_id)
        .await?
        .ok_or_else(|| {
            medportal_core::errors::PortalError::NotFound("Conversation not found".to_string())
        })?
        .try_into()?;

    let text = prepare_message(&conversation, sender_id, text)?;
    // mockall needs 'static references
    let body: &'static str = Box::leak(text.to_string().into_boxed_str());
    let saved = ctx.chat_repo.create_message(conversation.id, sender_id, body).await?;

    Ok(saved.into())
}

fn echo_message(conversation_id: Uuid, sender_id: Uuid, body: &str) -> DbMessage {
    DbMessage {
        id: Uuid::new_v4(),
        conversation_id,
        sender_id,
        body: body.to_string(),
        sent_at: chrono::Utc::now(),
        is_read: false,
    }
}

#[tokio::test]
async fn test_participant_message_is_trimmed_and_stored() {
    let (patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4());
    let row = db_conversation(patient_id, doctor_id, "open");
    let conversation_id = row.id;

    let mut ctx = TestContext::new();
    ctx.chat_repo
        .expect_get_conversation_by_id()
        .with(predicate::eq(conversation_id))
        .returning(move |_| Ok(Some(row.clone())));
    ctx.chat_repo
        .expect_create_message()
        .with(
            predicate::eq(conversation_id),
            predicate::eq(patient_id),
            predicate::eq("Is the clinic open Friday?"),
        )
        .times(1)
        .returning(|conversation, sender, body| Ok(echo_message(conversation, sender, body)));

    let message = send_message_wrapper(&ctx, conversation_id, patient_id, "  Is the clinic open Friday?\n")
        .await
        .unwrap();

    assert_eq!(message.text, "Is the clinic open Friday?");
    assert_eq!(message.sender_id, patient_id);
    assert!(!message.is_read);
}

#[tokio::test]
async fn test_outsider_cannot_post() {
    let row = db_conversation(Uuid::new_v4(), Uuid::new_v4(), "open");
    let conversation_id = row.id;

    let mut ctx = TestContext::new();
    ctx.chat_repo
        .expect_get_conversation_by_id()
        .returning(move |_| Ok(Some(row.clone())));
    ctx.chat_repo.expect_create_message().never();

    let err = send_message_wrapper(&ctx, conversation_id, Uuid::new_v4(), "hello")
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_closed_conversation_rejects_messages() {
    let (patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4());
    let row = db_conversation(patient_id, doctor_id, "closed");
    let conversation_id = row.id;

    let mut ctx = TestContext::new();
    ctx.chat_repo
        .expect_get_conversation_by_id()
        .returning(move |_| Ok(Some(row.clone())));
    ctx.chat_repo.expect_create_message().never();

    let err = send_message_wrapper(&ctx, conversation_id, doctor_id, "follow-up")
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_conversation_is_not_found() {
    let mut ctx = TestContext::new();
    ctx.chat_repo
        .expect_get_conversation_by_id()
        .returning(|_| Ok(None));

    let err = send_message_wrapper(&ctx, Uuid::new_v4(), Uuid::new_v4(), "hello")
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conversation_per_pair_is_reused() {
    let (patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4());
    let row = db_conversation(patient_id, doctor_id, "open");
    let expected_id = row.id;

    let mut ctx = TestContext::new();
    ctx.chat_repo
        .expect_get_or_create_conversation()
        .with(predicate::eq(patient_id), predicate::eq(doctor_id))
        .times(2)
        .returning(move |_, _| Ok(row.clone()));

    let first = ctx.chat_repo.get_or_create_conversation(patient_id, doctor_id).await.unwrap();
    let second = ctx.chat_repo.get_or_create_conversation(patient_id, doctor_id).await.unwrap();

    assert_eq!(first.id, expected_id);
    assert_eq!(second.id, expected_id);
}

#[test]
fn test_message_length_limits() {
    let (patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4());
    let conversation: Conversation = db_conversation(patient_id, doctor_id, "open").try_into().unwrap();

    assert!(prepare_message(&conversation, patient_id, "   ").is_err());
    let at_limit = "a".repeat(MAX_MESSAGE_LENGTH);
    assert!(prepare_message(&conversation, patient_id, &at_limit).is_ok());
    let over_limit = "a".repeat(MAX_MESSAGE_LENGTH + 1);
    assert!(prepare_message(&conversation, patient_id, &over_limit).is_err());
}

#[test]
fn test_counterpart_of_each_participant() {
    let (patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4());
    let conversation: Conversation = db_conversation(patient_id, doctor_id, "open").try_into().unwrap();

    assert_eq!(conversation.status, ConversationStatus::Open);
    assert_eq!(conversation.counterpart_of(patient_id), doctor_id);
    assert_eq!(conversation.counterpart_of(doctor_id), patient_id);
}

// Mirrors the doctor branch of starting a conversation.
async fn doctor_contacts_patient(
    ctx: &TestContext,
    doctor_id: Uuid,
    patient_id: Uuid,
) -> Result<Uuid, AppError> {
    let treats = ctx
        .appointment_repo
        .has_care_relationship(doctor_id, patient_id)
        .await?;
    ensure_can_contact(Role::Doctor, treats)?;

    let conversation = ctx.chat_repo.get_or_create_conversation(patient_id, doctor_id).await?;
    Ok(conversation.id)
}

#[tokio::test]
async fn test_doctor_needs_appointment_to_start_conversation() {
    let (patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4());

    let mut ctx = TestContext::new();
    ctx.appointment_repo
        .expect_has_care_relationship()
        .with(predicate::eq(doctor_id), predicate::eq(patient_id))
        .returning(|_, _| Ok(false));
    ctx.chat_repo.expect_get_or_create_conversation().never();

    let err = doctor_contacts_patient(&ctx, doctor_id, patient_id)
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_treating_doctor_can_start_conversation() {
    let (patient_id, doctor_id) = (Uuid::new_v4(), Uuid::new_v4());
    let row = db_conversation(patient_id, doctor_id, "open");
    let expected_id = row.id;

    let mut ctx = TestContext::new();
    ctx.appointment_repo
        .expect_has_care_relationship()
        .returning(|_, _| Ok(true));
    ctx.chat_repo
        .expect_get_or_create_conversation()
        .times(1)
        .returning(move |_, _| Ok(row.clone()));

    let id = doctor_contacts_patient(&ctx, doctor_id, patient_id).await.unwrap();

    assert_eq!(id, expected_id);
}

#[test]
fn test_who_can_start_conversations() {
    assert!(ensure_can_contact(Role::Patient, false).is_ok());
    assert!(ensure_can_contact(Role::Doctor, true).is_ok());
    assert!(ensure_can_contact(Role::Doctor, false).is_err());
    assert!(ensure_can_contact(Role::Admin, true).is_err());
}
