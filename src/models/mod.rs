pub mod audit;
pub mod backup;
pub mod dashboard;
pub mod entry;
pub mod form;
pub mod report;
pub mod setting;
pub mod table;
pub mod user;
