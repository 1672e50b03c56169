//! # Chat Handlers
//!
//! Patient-doctor conversations. Each pair shares a single conversation,
//! created on first contact and reused afterwards. Only the two participants
//! can read or post; closed conversations are read-only until reopened.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use medportal_core::{
    errors::{PortalError, PortalResult},
    models::{
        chat::{
            CloseConversationRequest, Conversation, ConversationDetailResponse,
            ConversationListResponse, ConversationStatus, Message, SendMessageRequest,
            StartConversationRequest, UpdateConversationRequest, MAX_MESSAGE_LENGTH,
        },
        notification::NewNotification,
        user::Role,
    },
};
use medportal_db::{
    models::convert_all,
    repositories::{appointment, chat, doctor, user},
};
use uuid::Uuid;

use crate::{
    middleware::{error_handling::AppError, session::RequestContext},
    ApiState,
};

pub fn ensure_participant(conversation: &Conversation, user_id: Uuid) -> PortalResult<()> {
    if conversation.is_participant(user_id) {
        Ok(())
    } else {
        Err(PortalError::Authorization(
            "You are not a participant in this conversation".to_string(),
        ))
    }
}

/// Doctors may only open conversations with patients they have had an
/// appointment with. Patients can reach any doctor.
pub fn ensure_can_contact(role: Role, has_care_relationship: bool) -> PortalResult<()> {
    match role {
        Role::Patient => Ok(()),
        Role::Doctor if has_care_relationship => Ok(()),
        Role::Doctor => Err(PortalError::Authorization(
            "You have no appointments with this patient".to_string(),
        )),
        Role::Admin => Err(PortalError::Authorization(
            "Conversations are between patients and doctors".to_string(),
        )),
    }
}

/// Validates a message about to be posted and returns its trimmed text.
pub fn prepare_message<'a>(
    conversation: &Conversation,
    sender_id: Uuid,
    text: &'a str,
) -> PortalResult<&'a str> {
    ensure_participant(conversation, sender_id)?;

    if conversation.status == ConversationStatus::Closed {
        return Err(PortalError::Validation(
            "This conversation is closed".to_string(),
        ));
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(PortalError::Validation("Message text is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(PortalError::Validation(format!(
            "Messages are limited to {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    Ok(text)
}

async fn load_conversation(
    state: &ApiState,
    ctx: &RequestContext,
    id: Uuid,
) -> Result<Conversation, AppError> {
    let conversation: Conversation = chat::get_conversation_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Conversation with ID {} not found", id)))?
        .try_into()?;

    ensure_participant(&conversation, ctx.user_id)?;
    Ok(conversation)
}

#[axum::debug_handler]
pub async fn list_conversations(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
) -> Result<Json<ConversationListResponse>, AppError> {
    let rows = chat::list_conversations_for_user(&state.db_pool, ctx.user_id).await?;

    Ok(Json(ConversationListResponse {
        conversations: convert_all(rows)?,
    }))
}

/// Opens (or returns the existing) conversation with another participant.
///
/// Patients start conversations with any doctor; doctors only with patients
/// they have had an appointment with.
#[axum::debug_handler]
pub async fn start_conversation(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Json(payload): Json<StartConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;

    let (patient_id, doctor_id) = match ctx.role {
        Role::Patient => {
            doctor::get_doctor_by_id(&state.db_pool, payload.participant_id)
                .await?
                .ok_or_else(|| {
                    PortalError::NotFound(format!(
                        "Doctor with ID {} not found",
                        payload.participant_id
                    ))
                })?;
            (ctx.user_id, payload.participant_id)
        }
        Role::Doctor => {
            let patient = user::get_user_by_id(&state.db_pool, payload.participant_id)
                .await?
                .filter(|u| u.role == Role::Patient.as_str())
                .ok_or_else(|| {
                    PortalError::NotFound(format!(
                        "Patient with ID {} not found",
                        payload.participant_id
                    ))
                })?;
            let treats =
                appointment::has_care_relationship(&state.db_pool, ctx.user_id, patient.id).await?;
            ensure_can_contact(ctx.role, treats)?;
            (patient.id, ctx.user_id)
        }
        Role::Admin => {
            return Err(AppError(PortalError::Authorization(
                "Conversations are between patients and doctors".to_string(),
            )));
        }
    };

    let conversation: Conversation =
        chat::get_or_create_conversation(&state.db_pool, patient_id, doctor_id)
            .await?
            .try_into()?;

    Ok(Json(conversation))
}

/// Returns the conversation with its messages and marks the caller's
/// incoming messages as read.
#[axum::debug_handler]
pub async fn get_conversation(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationDetailResponse>, AppError> {
    let conversation = load_conversation(&state, &ctx, id).await?;

    chat::mark_messages_read(&state.db_pool, id, ctx.user_id).await?;
    let messages = chat::list_messages(&state.db_pool, id)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

    Ok(Json(ConversationDetailResponse {
        conversation,
        messages,
    }))
}

#[axum::debug_handler]
pub async fn update_conversation(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;
    load_conversation(&state, &ctx, id).await?;

    let updated: Conversation = chat::set_conversation_status(&state.db_pool, id, payload.status)
        .await?
        .try_into()?;

    tracing::info!("Conversation {} set to {} by user {}", id, updated.status, ctx.user_id);
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn close_conversation(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;
    load_conversation(&state, &ctx, id).await?;

    let closed: Conversation =
        chat::set_conversation_status(&state.db_pool, id, ConversationStatus::Closed)
            .await?
            .try_into()?;

    Ok(Json(closed))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<Arc<ApiState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    ctx.verify_csrf(&payload.csrf_token)?;
    let conversation = load_conversation(&state, &ctx, id).await?;
    let text = prepare_message(&conversation, ctx.user_id, &payload.text)?;

    let message: Message = chat::create_message(&state.db_pool, id, ctx.user_id, text)
        .await?
        .into();

    state.notifier.notify(
        NewNotification::new(
            conversation.counterpart_of(ctx.user_id),
            "New message",
            "You have a new message",
        )
        .with_link(format!("/chat/{}", conversation.id)),
    );

    Ok((StatusCode::CREATED, Json(message)))
}
