use chrono::{DateTime, NaiveDate, Utc};
use medportal_core::{
    errors::PortalResult,
    models::{appointment::AppointmentStatus, settings::SchedulingSettings},
};
use mockall::mock;
use uuid::Uuid;

use crate::models::{DbAppointment, DbConversation, DbMessage, DbSession};

// Mock repositories for testing
mock! {
    pub AppointmentRepo {
        pub async fn get_appointment_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbAppointment>>;

        pub async fn get_doctor_appointments_on(
            &self,
            doctor_id: Uuid,
            date: NaiveDate,
        ) -> eyre::Result<Vec<DbAppointment>>;

        pub async fn transition_status(
            &self,
            id: Uuid,
            from: AppointmentStatus,
            to: AppointmentStatus,
        ) -> PortalResult<DbAppointment>;

        pub async fn has_care_relationship(
            &self,
            doctor_id: Uuid,
            patient_id: Uuid,
        ) -> eyre::Result<bool>;
    }
}

mock! {
    pub ChatRepo {
        pub async fn get_or_create_conversation(
            &self,
            patient_id: Uuid,
            doctor_id: Uuid,
        ) -> eyre::Result<DbConversation>;

        pub async fn get_conversation_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbConversation>>;

        pub async fn create_message(
            &self,
            conversation_id: Uuid,
            sender_id: Uuid,
            body: &'static str,
        ) -> eyre::Result<DbMessage>;
    }
}

mock! {
    pub SettingsRepo {
        pub async fn load_scheduling_settings(&self) -> eyre::Result<SchedulingSettings>;
    }
}

mock! {
    pub SessionRepo {
        pub async fn get_active_session(
            &self,
            token: &'static str,
            now: DateTime<Utc>,
        ) -> eyre::Result<Option<DbSession>>;
    }
}
