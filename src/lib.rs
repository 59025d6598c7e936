pub mod alphabet;
pub mod build;
pub mod error;
pub mod hmm;
pub mod msa;
pub mod score;
pub mod stats;

pub use build::{BuildArgs, BuildOutputs, BuildRequest, Builder, SingleOutputs};
pub use error::{BuildError, Result};
