/// CSV trace writers.
pub mod export;
