pub mod config;
pub mod deposit;
pub mod fetch;
pub mod history;
pub mod process;
