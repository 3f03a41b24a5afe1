//! Time-based animation primitives and pointer click tracking.

mod click;
mod clock;
mod scalar;

pub use click::Click;
pub use click::ClickResult;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use scalar::AnimatedScalar;
pub use scalar::Easing;
