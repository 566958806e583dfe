pub mod admin;
pub mod favorites;
pub mod health;
pub mod projects;
pub mod properties;
pub mod uploads;
