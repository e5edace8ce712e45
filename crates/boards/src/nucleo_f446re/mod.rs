//! STM32F446RE Nucleo board.

use log::info;

use crate::clock::{ClockBringup, RccController};
use crate::types::{BoardConfig, BoardError, ClockReport};

/// Highest SYSCLK the F446 supports.
pub const MAX_SYSCLK_HZ: u32 = 180_000_000;

pub struct NucleoF446re<R: RccController> {
    config: BoardConfig,
    rcc: R,
    clocks: Option<ClockReport>,
}

impl<R: RccController> NucleoF446re<R> {
    pub fn new(config: BoardConfig, rcc: R) -> Result<Self, BoardError> {
        config.validate(MAX_SYSCLK_HZ)?;
        Ok(Self { config, rcc, clocks: None })
    }

    /// One-shot bring-up. Calling it again after success returns the cached report.
    pub fn bring_up(&mut self) -> Result<ClockReport, BoardError> {
        if let Some(clocks) = self.clocks {
            return Ok(clocks);
        }
        info!(
            "Bringing up NUCLEO-F446RE: HSE {} MHz, PLL M={} N={} P={}",
            self.config.hse_hz / 1_000_000,
            self.config.pll.pllm,
            self.config.pll.plln,
            self.config.pll.pllp
        );
        let report = ClockBringup::new(
            &mut self.rcc,
            self.config.hse_hz,
            self.config.pll,
            self.config.flash_latency_ws,
            self.config.max_poll_attempts,
        )
        .run()?;
        self.clocks = Some(report);
        Ok(report)
    }

    pub fn clocks(&self) -> Option<ClockReport> {
        self.clocks
    }

    pub fn rcc(&self) -> &R {
        &self.rcc
    }
}
