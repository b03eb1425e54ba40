pub mod aggregator;
pub mod competitive;
pub mod export;
pub mod report;
pub mod review_analyzer;
pub mod ruleset;

pub use aggregator::*;
pub use competitive::*;
pub use export::*;
pub use report::*;
pub use review_analyzer::*;
pub use ruleset::*;
