pub mod db;
pub mod email;
pub mod internal;
pub mod rabbitmq;
pub mod redis;
pub mod storage;
