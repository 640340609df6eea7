pub mod account;
pub mod commitment;
pub mod config;
pub mod in_memory_session_store;
pub mod manager;
pub mod retry;
pub mod session;
pub mod session_store;
pub mod sled_session_store;
pub mod wallets;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
