// Signal generation
pub mod fusion;

pub use fusion::{IndicatorVote, SignalFuser, Vote};
