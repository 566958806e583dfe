pub mod admin;
pub mod blocks;
pub mod conversations;
pub mod health;
