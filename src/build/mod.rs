//! Model construction: the staged pipeline from a weighted alignment (or
//! a single sequence) to a calibrated probability model.

pub mod args;
pub mod builder;
pub mod cluster;
pub mod effn;
pub mod modelmaker;
pub mod seqmodel;
pub mod tracealign;
pub mod weights;

pub use args::{ArchStrategy, BuildArgs, EffnStrategy, WeightStrategy};
pub use builder::{BuildOutputs, BuildRequest, Builder, SingleOutputs};
