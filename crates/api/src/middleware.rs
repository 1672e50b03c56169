/// Password hashing and token generation
pub mod auth;
/// Domain error to HTTP response mapping
pub mod error_handling;
/// Session cookie resolution into a per-request context
pub mod session;
