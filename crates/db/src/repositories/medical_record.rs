use crate::models::DbMedicalRecord;
use chrono::Utc;
use eyre::Result;
use medportal_core::models::medical_record::RecordType;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub struct NewMedicalRecord<'a> {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub record_type: RecordType,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub file_path: Option<&'a str>,
}

pub async fn create_medical_record(
    pool: &Pool<Postgres>,
    record: &NewMedicalRecord<'_>,
) -> Result<DbMedicalRecord> {
    let created = sqlx::query_as::<_, DbMedicalRecord>(
        r#"
        INSERT INTO medical_records
            (id, patient_id, doctor_id, appointment_id, record_type, title, description, file_path, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, patient_id, doctor_id, appointment_id, record_type, title, description, file_path, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(record.patient_id)
    .bind(record.doctor_id)
    .bind(record.appointment_id)
    .bind(record.record_type.as_str())
    .bind(record.title)
    .bind(record.description)
    .bind(record.file_path)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(created)
}

pub async fn get_medical_record_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbMedicalRecord>> {
    let record = sqlx::query_as::<_, DbMedicalRecord>(
        r#"
        SELECT id, patient_id, doctor_id, appointment_id, record_type, title, description, file_path, created_at
        FROM medical_records
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

pub async fn list_medical_records_for_patient(
    pool: &Pool<Postgres>,
    patient_id: Uuid,
) -> Result<Vec<DbMedicalRecord>> {
    let records = sqlx::query_as::<_, DbMedicalRecord>(
        r#"
        SELECT id, patient_id, doctor_id, appointment_id, record_type, title, description, file_path, created_at
        FROM medical_records
        WHERE patient_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
