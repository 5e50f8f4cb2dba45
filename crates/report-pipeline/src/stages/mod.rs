pub mod filings;
pub mod financials;
pub mod recommend;
pub mod research;
