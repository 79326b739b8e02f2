pub mod analytics;
pub mod currency;
pub mod ledger;
pub mod settings;
pub mod state;
pub mod transaction;
pub mod transfer;
