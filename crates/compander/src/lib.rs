pub mod dsp;
pub mod filter;
pub mod types;

pub use dsp::{
    db_to_linear, time_to_coeff, Compander, CurveSegment, DelayLine, DelayPosition,
    EnvelopeFollower, PlaneCursor, TransferCurve, DRAIN_CHUNK,
};
pub use filter::*;
pub use types::*;

pub use compand_core::{CompandError, CompandResult, CompandSettings};
