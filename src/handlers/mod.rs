pub mod catalog_handlers;
pub mod health_handlers;
pub mod storage_handlers;
pub mod wallet_handlers;
