/// DSP (Digital Signal Processing) modules
///
/// Contains the compander's processing stages:
/// - Curve: Transfer function construction with soft-knee corner rounding
/// - Gain: Segment lookup turning an envelope level into linear gain
/// - Envelope: Attack/decay smoothing of the rectified signal
/// - Delay: Look-ahead delay line with end-of-stream drain
/// - Compander: Per-block driver tying the stages together
pub mod curve;
pub mod gain;
pub mod envelope;
pub mod delay;
pub mod compander;

// Re-export commonly used types for convenience
pub use curve::{CurveSegment, TransferCurve};
pub use envelope::{db_to_linear, time_to_coeff, EnvelopeFollower};
pub use delay::{DelayLine, DelayPosition, PlaneCursor};
pub use compander::{Compander, DRAIN_CHUNK};
