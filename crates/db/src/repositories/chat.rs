use crate::models::{DbConversation, DbConversationSummary, DbMessage};
use chrono::Utc;
use eyre::Result;
use medportal_core::models::chat::ConversationStatus;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

// Conversation Repository

/// Returns the pair's conversation, creating it on first contact.
///
/// The no-op `DO UPDATE` makes `RETURNING` yield the existing row when the
/// pair already has a conversation.
pub async fn get_or_create_conversation(
    pool: &Pool<Postgres>,
    patient_id: Uuid,
    doctor_id: Uuid,
) -> Result<DbConversation> {
    let conversation = sqlx::query_as::<_, DbConversation>(
        r#"
        INSERT INTO conversations (id, patient_id, doctor_id, status, created_at)
        VALUES ($1, $2, $3, 'open', $4)
        ON CONFLICT (patient_id, doctor_id)
        DO UPDATE SET patient_id = EXCLUDED.patient_id
        RETURNING id, patient_id, doctor_id, status, last_message_at, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(patient_id)
    .bind(doctor_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(conversation)
}

pub async fn get_conversation_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbConversation>> {
    let conversation = sqlx::query_as::<_, DbConversation>(
        r#"
        SELECT id, patient_id, doctor_id, status, last_message_at, created_at
        FROM conversations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(conversation)
}

/// Conversations the user takes part in, most recently active first, with
/// the number of messages from the other side they have not read.
pub async fn list_conversations_for_user(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Vec<DbConversationSummary>> {
    let conversations = sqlx::query_as::<_, DbConversationSummary>(
        r#"
        SELECT c.id, c.patient_id, c.doctor_id, c.status, c.last_message_at, c.created_at,
               COUNT(m.id) FILTER (WHERE m.is_read = FALSE AND m.sender_id <> $1) AS unread_count
        FROM conversations c
        LEFT JOIN messages m ON m.conversation_id = c.id
        WHERE c.patient_id = $1 OR c.doctor_id = $1
        GROUP BY c.id
        ORDER BY COALESCE(c.last_message_at, c.created_at) DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(conversations)
}

pub async fn set_conversation_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    status: ConversationStatus,
) -> Result<DbConversation> {
    let conversation = sqlx::query_as::<_, DbConversation>(
        r#"
        UPDATE conversations
        SET status = $2
        WHERE id = $1
        RETURNING id, patient_id, doctor_id, status, last_message_at, created_at
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(conversation)
}

// Message Repository

/// Stores a message and bumps the conversation's `last_message_at` in one
/// transaction.
pub async fn create_message(
    pool: &Pool<Postgres>,
    conversation_id: Uuid,
    sender_id: Uuid,
    body: &str,
) -> Result<DbMessage> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let message = sqlx::query_as::<_, DbMessage>(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, body, sent_at, is_read)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        RETURNING id, conversation_id, sender_id, body, sent_at, is_read
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(sender_id)
    .bind(body)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE conversations
        SET last_message_at = $2
        WHERE id = $1
        "#,
    )
    .bind(conversation_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(message)
}

pub async fn list_messages(
    pool: &Pool<Postgres>,
    conversation_id: Uuid,
) -> Result<Vec<DbMessage>> {
    let messages = sqlx::query_as::<_, DbMessage>(
        r#"
        SELECT id, conversation_id, sender_id, body, sent_at, is_read
        FROM messages
        WHERE conversation_id = $1
        ORDER BY sent_at ASC
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Marks every message the reader received in the conversation as read.
/// Returns the number of messages updated.
pub async fn mark_messages_read(
    pool: &Pool<Postgres>,
    conversation_id: Uuid,
    reader_id: Uuid,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE messages
        SET is_read = TRUE
        WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
        "#,
    )
    .bind(conversation_id)
    .bind(reader_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
