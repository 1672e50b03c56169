use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use medportal_core::{
    errors::PortalError,
    models::{
        appointment::Appointment,
        chat::{Conversation, ConversationSummary, Message},
        medical_record::MedicalRecord,
        notification::Notification,
        settings::SystemSetting,
        user::{Doctor, User},
    },
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = PortalError;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbDoctor {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: String,
    pub license_number: String,
    pub bio: Option<String>,
}

impl From<DbDoctor> for Doctor {
    fn from(row: DbDoctor) -> Self {
        Doctor {
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            specialization: row.specialization,
            license_number: row.license_number,
            bio: row.bio,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = PortalError;

    fn try_from(row: DbAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            date: row.appointment_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status.parse()?,
            reason: row.reason,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbConversation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbConversation> for Conversation {
    type Error = PortalError;

    fn try_from(row: DbConversation) -> Result<Self, Self::Error> {
        Ok(Conversation {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            status: row.status.parse()?,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbConversationSummary {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub unread_count: i64,
}

impl TryFrom<DbConversationSummary> for ConversationSummary {
    type Error = PortalError;

    fn try_from(row: DbConversationSummary) -> Result<Self, Self::Error> {
        let unread_count = row.unread_count;
        let conversation = DbConversation {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            status: row.status,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        };
        Ok(ConversationSummary {
            conversation: conversation.try_into()?,
            unread_count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
}

impl From<DbMessage> for Message {
    fn from(row: DbMessage) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            text: row.body,
            sent_at: row.sent_at,
            is_read: row.is_read,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbMedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub record_type: String,
    pub title: String,
    pub description: Option<String>,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbMedicalRecord> for MedicalRecord {
    type Error = PortalError;

    fn try_from(row: DbMedicalRecord) -> Result<Self, Self::Error> {
        Ok(MedicalRecord {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            appointment_id: row.appointment_id,
            record_type: row.record_type.parse()?,
            title: row.title,
            description: row.description,
            file_path: row.file_path,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbNotification> for Notification {
    fn from(row: DbNotification) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            link: row.link,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSession {
    pub token: String,
    pub user_id: Uuid,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSystemSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl From<DbSystemSetting> for SystemSetting {
    fn from(row: DbSystemSetting) -> Self {
        SystemSetting {
            key: row.key,
            value: row.value,
            updated_at: row.updated_at,
        }
    }
}

/// Converts a batch of rows, failing on the first row with an unknown enum value.
pub fn convert_all<T, U>(rows: Vec<T>) -> Result<Vec<U>, PortalError>
where
    U: TryFrom<T, Error = PortalError>,
{
    rows.into_iter().map(U::try_from).collect()
}
