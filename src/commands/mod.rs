pub mod catalog;
pub mod import;
pub mod ledger;
pub mod orders;
pub mod pending;
pub mod planner;
pub mod recurrence;
pub mod tasks;
pub mod timeline;
pub mod trash;
