pub mod encryption;
pub mod format;
pub mod gateway;
pub mod manager;
