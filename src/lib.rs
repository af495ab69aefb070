pub mod config;
pub mod error;
pub mod persona;
pub mod server;
pub mod storage;
