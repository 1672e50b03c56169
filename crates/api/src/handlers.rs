pub mod appointments;
pub mod auth;
pub mod chat;
pub mod doctors;
pub mod medical_records;
pub mod notifications;
pub mod profile;
pub mod settings;
