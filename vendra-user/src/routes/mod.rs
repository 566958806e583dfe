pub mod admin;
pub mod deletion;
pub mod health;
pub mod profile;
pub mod push;
pub mod reviews;
pub mod seller;
mod upload;
