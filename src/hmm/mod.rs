//! The profile HMM model-in-progress and its satellite types: background
//! model, priors, tracebacks, and the search profiles derived at
//! calibration time.

pub mod background;
pub mod model;
pub mod prior;
pub mod profile;
pub mod trace;

pub use background::Bg;
pub use model::{EvalueParams, Hmm};
pub use prior::Prior;
pub use profile::{OptimizedProfile, Profile};
pub use trace::{Trace, TraceState, TraceStep};
