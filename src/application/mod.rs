// Application layer - Use cases and the traits they depend on
pub mod account_service;
pub mod dashboard_service;
pub mod snapshot_refresher;
pub mod snapshot_repository;
