pub mod evaluator;

pub use evaluator::{evaluate, SignalParams};
