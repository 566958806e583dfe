pub mod blocks;
pub mod cases;
pub mod threads;
