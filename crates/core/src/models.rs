pub mod appointment;
pub mod chat;
pub mod medical_record;
pub mod notification;
pub mod settings;
pub mod user;
