pub mod aggregator;
pub mod estimators;
pub mod providers;
pub mod simulator;

pub use aggregator::*;
pub use providers::build_provider;
pub use simulator::*;
