//! Simulated reset and clock control block for running without hardware.

use log::trace;

use crate::clock::{RccController, SysclkSource};
use crate::types::PllConfig;

/// A flag that comes up on the n-th poll after being armed, or never.
#[derive(Debug, Clone, Copy)]
struct DelayedFlag {
    ready_on_poll: Option<u32>,
    armed: bool,
    polls: u32,
}

impl DelayedFlag {
    fn new(ready_on_poll: u32) -> Self {
        Self { ready_on_poll: Some(ready_on_poll.max(1)), armed: false, polls: 0 }
    }

    fn poll(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.polls += 1;
        matches!(self.ready_on_poll, Some(n) if self.polls >= n)
    }
}

/// An RCC model whose ready flags come up after a configurable number of polls.
#[derive(Debug, Clone)]
pub struct SimulatedRcc {
    hse: DelayedFlag,
    pll: DelayedFlag,
    switch: DelayedFlag,
    power_enabled: bool,
    flash_latency: Option<u8>,
    pll_config: Option<PllConfig>,
    requested: SysclkSource,
    sysclk: SysclkSource,
}

impl SimulatedRcc {
    /// Flags report ready on the given poll counts (1 = first poll).
    pub fn ready_after(hse_polls: u32, pll_polls: u32, switch_polls: u32) -> Self {
        Self {
            hse: DelayedFlag::new(hse_polls),
            pll: DelayedFlag::new(pll_polls),
            switch: DelayedFlag::new(switch_polls),
            power_enabled: false,
            flash_latency: None,
            pll_config: None,
            requested: SysclkSource::Hsi,
            sysclk: SysclkSource::Hsi,
        }
    }

    /// The external oscillator never stabilises.
    pub fn with_dead_hse(mut self) -> Self {
        self.hse.ready_on_poll = None;
        self
    }

    /// The PLL never locks.
    pub fn with_dead_pll(mut self) -> Self {
        self.pll.ready_on_poll = None;
        self
    }

    pub fn sysclk(&self) -> SysclkSource {
        self.sysclk
    }

    pub fn programmed_pll(&self) -> Option<PllConfig> {
        self.pll_config
    }

    pub fn flash_latency(&self) -> Option<u8> {
        self.flash_latency
    }

    pub fn power_enabled(&self) -> bool {
        self.power_enabled
    }
}

impl Default for SimulatedRcc {
    fn default() -> Self {
        Self::ready_after(4, 8, 2)
    }
}

impl RccController for SimulatedRcc {
    fn enable_hse(&mut self) {
        self.hse.armed = true;
    }

    fn hse_ready(&mut self) -> bool {
        self.hse.poll()
    }

    fn enable_power_interface(&mut self) {
        self.power_enabled = true;
    }

    fn configure_flash(&mut self, latency_ws: u8) {
        self.flash_latency = Some(latency_ws);
    }

    fn disable_pll(&mut self) {
        self.pll.armed = false;
        self.pll.polls = 0;
    }

    fn configure_pll(&mut self, pll: &PllConfig) {
        trace!("PLLCFGR <- M={} N={} P={}", pll.pllm, pll.plln, pll.pllp);
        self.pll_config = Some(*pll);
    }

    fn enable_pll(&mut self) {
        // The PLL only locks on a running HSE.
        self.pll.armed = self.hse.armed;
    }

    fn pll_ready(&mut self) -> bool {
        self.pll.poll()
    }

    fn select_sysclk(&mut self, source: SysclkSource) {
        self.requested = source;
        self.switch.armed = true;
    }

    fn sysclk_source(&mut self) -> SysclkSource {
        if self.sysclk != self.requested && self.switch.poll() {
            self.sysclk = self.requested;
        }
        self.sysclk
    }
}
