//! Admission control: token bucket pacing plus a fail-fast slot pool.

pub mod gate;
pub mod rate;
pub mod slots;

pub use gate::{Admission, AdmissionGate};
pub use rate::RateGate;
pub use slots::{Slot, SlotPool};
