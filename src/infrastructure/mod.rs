// Infrastructure layer - External dependencies and adapters
pub mod account_store;
pub mod config;
pub mod drive_fetcher;
pub mod sqlite_snapshot;
