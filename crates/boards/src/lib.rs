//! Board bring-up for the sensing node.
//!
//! Everything here runs once, before the pipeline is scheduled. Waits on
//! hardware ready flags are bounded so a dead oscillator surfaces as a
//! [`BoardError::HardwareFault`] instead of a hang.

pub mod clock;
pub mod sim;
pub mod types;

#[cfg(feature = "nucleo_f446re")]
pub mod nucleo_f446re;
#[cfg(feature = "nucleo_f446re")]
pub use nucleo_f446re::NucleoF446re;

pub use clock::{BringupStep, ClockBringup, RccController, SysclkSource};
pub use sim::SimulatedRcc;
pub use types::{BoardConfig, BoardError, ClockReport, PllConfig};
