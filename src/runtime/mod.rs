mod runner;

pub use runner::{RunOutput, Runner};
