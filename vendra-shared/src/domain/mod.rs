//! Domain logic needed by more than one service.

pub mod audit;
pub mod seller;
pub mod thread;
