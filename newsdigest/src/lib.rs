// Library interface for newsdigest modules
// This allows tests and the binary to import modules

pub mod model;
pub mod similarity;
pub mod dedup;
pub mod llm;
pub mod ingestion;
pub mod scraping;
pub mod processing;
pub mod analysis;
pub mod digest;
pub mod publishing;
pub mod pipeline;
pub mod schedule;
