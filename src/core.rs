pub mod config;
pub mod state;
pub(crate) mod time;
