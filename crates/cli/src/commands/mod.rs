//! Command handlers for the Yatri CLI.

pub mod ask;
pub mod chat;
pub mod health;
mod output;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use health::HealthCommand;
