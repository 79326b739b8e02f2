pub mod analytics_service;
pub mod chart_service;
pub mod conversion_service;
pub mod ledger_service;
pub mod rate_service;
pub mod rebase_service;
pub mod transfer_service;
