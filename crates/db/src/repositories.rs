//! Parameterized queries, one module per table group. Functions take the pool
//! explicitly and return `eyre::Result`, except where a domain rule decides the
//! outcome (booking, status transitions), which return `PortalResult`.

pub mod appointment;
pub mod chat;
pub mod doctor;
pub mod medical_record;
pub mod notification;
pub mod session;
pub mod settings;
pub mod user;
