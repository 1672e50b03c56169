use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

use medportal_core::models::settings::{
    CANCELLATION_NOTICE_KEY, DEFAULT_APPOINTMENT_DURATION_KEY, DEFAULT_APPOINTMENT_DURATION_MINUTES,
    DEFAULT_CANCELLATION_NOTICE_HOURS,
};

/// Table definitions, in dependency order. Each entry is a single statement
/// because prepared statements cannot carry more than one command.
const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email VARCHAR(255) NOT NULL UNIQUE,
        password_hash VARCHAR(255) NOT NULL,
        first_name VARCHAR(100) NOT NULL,
        last_name VARCHAR(100) NOT NULL,
        phone VARCHAR(50) NULL,
        role VARCHAR(20) NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT valid_role CHECK (role IN ('patient', 'doctor', 'admin'))
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS doctors (
        user_id UUID PRIMARY KEY REFERENCES users(id),
        specialization VARCHAR(255) NOT NULL,
        license_number VARCHAR(100) NOT NULL UNIQUE,
        bio TEXT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        patient_id UUID NOT NULL REFERENCES users(id),
        doctor_id UUID NOT NULL REFERENCES doctors(user_id),
        appointment_date DATE NOT NULL,
        start_time TIME NOT NULL,
        end_time TIME NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'scheduled',
        reason TEXT NULL,
        notes TEXT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT valid_time_range CHECK (end_time > start_time),
        CONSTRAINT valid_status CHECK (status IN ('scheduled', 'completed', 'cancelled', 'no-show'))
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        patient_id UUID NOT NULL REFERENCES users(id),
        doctor_id UUID NOT NULL REFERENCES doctors(user_id),
        status VARCHAR(20) NOT NULL DEFAULT 'open',
        last_message_at TIMESTAMP WITH TIME ZONE NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT one_conversation_per_pair UNIQUE (patient_id, doctor_id),
        CONSTRAINT valid_conversation_status CHECK (status IN ('open', 'closed'))
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        conversation_id UUID NOT NULL REFERENCES conversations(id),
        sender_id UUID NOT NULL REFERENCES users(id),
        body TEXT NOT NULL,
        sent_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        is_read BOOLEAN NOT NULL DEFAULT FALSE
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS medical_records (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        patient_id UUID NOT NULL REFERENCES users(id),
        doctor_id UUID NOT NULL REFERENCES doctors(user_id),
        appointment_id UUID NULL REFERENCES appointments(id),
        record_type VARCHAR(30) NOT NULL,
        title VARCHAR(255) NOT NULL,
        description TEXT NULL,
        file_path VARCHAR(1024) NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id),
        title VARCHAR(255) NOT NULL,
        message TEXT NOT NULL,
        link VARCHAR(1024) NULL,
        is_read BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token VARCHAR(128) PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        csrf_token VARCHAR(128) NOT NULL,
        expires_at TIMESTAMP WITH TIME ZONE NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS system_settings (
        key VARCHAR(100) PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    );
    "#,
];

const INDEXES: &[&str] = &[
    // Backstop for the booking transaction: an identical live slot can never be inserted twice.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS uniq_appointments_live_slot
        ON appointments(doctor_id, appointment_date, start_time)
        WHERE status <> 'cancelled';
    "#,
    "CREATE INDEX IF NOT EXISTS idx_appointments_doctor_date ON appointments(doctor_id, appointment_date);",
    "CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments(patient_id);",
    "CREATE INDEX IF NOT EXISTS idx_conversations_doctor_id ON conversations(doctor_id);",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages(conversation_id, sent_at);",
    "CREATE INDEX IF NOT EXISTS idx_medical_records_patient_id ON medical_records(patient_id);",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user_id ON notifications(user_id, created_at);",
    "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);",
];

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }

    // Seed defaults without overwriting values an admin already changed
    let defaults = [
        (
            DEFAULT_APPOINTMENT_DURATION_KEY,
            DEFAULT_APPOINTMENT_DURATION_MINUTES.to_string(),
        ),
        (
            CANCELLATION_NOTICE_KEY,
            DEFAULT_CANCELLATION_NOTICE_HOURS.to_string(),
        ),
    ];
    for (key, value) in defaults {
        sqlx::query(
            r#"
            INSERT INTO system_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
