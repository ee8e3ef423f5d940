// Domain layer - Core data types and pure derivations
pub mod dashboard;
pub mod record;
pub mod user;
