pub mod application_service;
pub mod deletion_service;
pub mod user_service;
