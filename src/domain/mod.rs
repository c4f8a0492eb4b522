pub mod error;
pub mod report;
pub mod survey;
pub mod table;
