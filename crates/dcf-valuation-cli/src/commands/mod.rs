pub mod peers;
pub mod report;
pub mod valuation;
