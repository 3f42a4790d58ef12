pub mod client;
pub mod config;
pub mod connection;
pub mod engine;
pub mod lobby;
pub mod protocol;
pub mod session;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

pub use client::SessionClient;
pub use config::ClientConfig;
pub use engine::{Intent, Rejection};
pub use session::{SessionSnapshot, SessionState};
