pub mod regression;
pub mod report;
