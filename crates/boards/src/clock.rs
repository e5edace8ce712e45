//! Clock tree bring-up as a bounded-retry state machine.

use log::{debug, info, warn};

use crate::types::{BoardError, ClockReport, PllConfig};

/// Source feeding the system clock mux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysclkSource {
    Hsi,
    Hse,
    Pll,
}

/// Register-level operations on the reset and clock control block.
///
/// Writes are fire-and-forget; readiness is only ever observed through the
/// polling methods, which the bring-up calls a bounded number of times.
pub trait RccController {
    fn enable_hse(&mut self);
    fn hse_ready(&mut self) -> bool;
    /// Enable the power interface clock and select voltage scale 1.
    fn enable_power_interface(&mut self);
    /// Program flash wait states and enable caches and prefetch.
    fn configure_flash(&mut self, latency_ws: u8);
    fn disable_pll(&mut self);
    /// Select HSE as PLL input, set AHB /1, APB1 /4, APB2 /2 and program M/N/P.
    fn configure_pll(&mut self, pll: &PllConfig);
    fn enable_pll(&mut self);
    fn pll_ready(&mut self) -> bool;
    fn select_sysclk(&mut self, source: SysclkSource);
    fn sysclk_source(&mut self) -> SysclkSource;
}

impl<R: RccController + ?Sized> RccController for Box<R> {
    fn enable_hse(&mut self) {
        (**self).enable_hse()
    }
    fn hse_ready(&mut self) -> bool {
        (**self).hse_ready()
    }
    fn enable_power_interface(&mut self) {
        (**self).enable_power_interface()
    }
    fn configure_flash(&mut self, latency_ws: u8) {
        (**self).configure_flash(latency_ws)
    }
    fn disable_pll(&mut self) {
        (**self).disable_pll()
    }
    fn configure_pll(&mut self, pll: &PllConfig) {
        (**self).configure_pll(pll)
    }
    fn enable_pll(&mut self) {
        (**self).enable_pll()
    }
    fn pll_ready(&mut self) -> bool {
        (**self).pll_ready()
    }
    fn select_sysclk(&mut self, source: SysclkSource) {
        (**self).select_sysclk(source)
    }
    fn sysclk_source(&mut self) -> SysclkSource {
        (**self).sysclk_source()
    }
}

/// States of the bring-up sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringupStep {
    EnableHse,
    WaitHseReady,
    ConfigurePower,
    ConfigureFlash,
    ConfigurePll,
    WaitPllReady,
    SwitchSysclk,
    WaitSysclkSwitch,
    Done,
}

impl BringupStep {
    fn name(self) -> &'static str {
        match self {
            BringupStep::EnableHse => "HSE enable",
            BringupStep::WaitHseReady => "HSE ready",
            BringupStep::ConfigurePower => "power interface",
            BringupStep::ConfigureFlash => "flash latency",
            BringupStep::ConfigurePll => "PLL configuration",
            BringupStep::WaitPllReady => "PLL ready",
            BringupStep::SwitchSysclk => "SYSCLK switch",
            BringupStep::WaitSysclkSwitch => "SYSCLK switched to PLL",
            BringupStep::Done => "done",
        }
    }
}

/// Drives an [`RccController`] from reset to "SYSCLK runs from the PLL".
pub struct ClockBringup<'a, R: RccController + ?Sized> {
    rcc: &'a mut R,
    hse_hz: u32,
    pll: PllConfig,
    flash_latency_ws: u8,
    max_poll_attempts: u32,
    step: BringupStep,
    attempts: u32,
    total_polls: u32,
}

impl<'a, R: RccController + ?Sized> ClockBringup<'a, R> {
    pub fn new(rcc: &'a mut R, hse_hz: u32, pll: PllConfig, flash_latency_ws: u8, max_poll_attempts: u32) -> Self {
        Self {
            rcc,
            hse_hz,
            pll,
            flash_latency_ws,
            max_poll_attempts,
            step: BringupStep::EnableHse,
            attempts: 0,
            total_polls: 0,
        }
    }

    pub fn current_step(&self) -> BringupStep {
        self.step
    }

    /// Execute one transition. Wait steps poll their flag once and stay put
    /// until it is set or the poll budget runs out.
    pub fn step(&mut self) -> Result<BringupStep, BoardError> {
        let next = match self.step {
            BringupStep::EnableHse => {
                self.rcc.enable_hse();
                BringupStep::WaitHseReady
            }
            BringupStep::WaitHseReady => {
                let ready = self.rcc.hse_ready();
                self.poll(ready, BringupStep::ConfigurePower)?
            }
            BringupStep::ConfigurePower => {
                self.rcc.enable_power_interface();
                BringupStep::ConfigureFlash
            }
            BringupStep::ConfigureFlash => {
                self.rcc.configure_flash(self.flash_latency_ws);
                BringupStep::ConfigurePll
            }
            BringupStep::ConfigurePll => {
                self.rcc.disable_pll();
                self.rcc.configure_pll(&self.pll);
                self.rcc.enable_pll();
                BringupStep::WaitPllReady
            }
            BringupStep::WaitPllReady => {
                let ready = self.rcc.pll_ready();
                self.poll(ready, BringupStep::SwitchSysclk)?
            }
            BringupStep::SwitchSysclk => {
                self.rcc.select_sysclk(SysclkSource::Pll);
                BringupStep::WaitSysclkSwitch
            }
            BringupStep::WaitSysclkSwitch => {
                let switched = self.rcc.sysclk_source() == SysclkSource::Pll;
                self.poll(switched, BringupStep::Done)?
            }
            BringupStep::Done => BringupStep::Done,
        };

        if next != self.step {
            debug!("Clock bring-up: {} -> {}", self.step.name(), next.name());
            self.attempts = 0;
        }
        self.step = next;
        Ok(next)
    }

    fn poll(&mut self, ready: bool, on_ready: BringupStep) -> Result<BringupStep, BoardError> {
        self.attempts += 1;
        self.total_polls += 1;
        if ready {
            return Ok(on_ready);
        }
        if self.attempts >= self.max_poll_attempts {
            warn!("Clock bring-up stuck at '{}' after {} polls", self.step.name(), self.attempts);
            return Err(BoardError::HardwareFault {
                step: self.step.name(),
                attempts: self.attempts,
            });
        }
        Ok(self.step)
    }

    /// Run the whole sequence to completion.
    pub fn run(mut self) -> Result<ClockReport, BoardError> {
        while self.step()? != BringupStep::Done {}

        let sysclk_hz = self.pll.sysclk_hz(self.hse_hz);
        let report = ClockReport {
            sysclk_hz,
            hclk_hz: sysclk_hz,
            pclk1_hz: sysclk_hz / 4,
            pclk2_hz: sysclk_hz / 2,
            polls: self.total_polls,
        };
        info!(
            "System clock at {} MHz (APB1 {} MHz, APB2 {} MHz) after {} polls",
            report.sysclk_hz / 1_000_000,
            report.pclk1_hz / 1_000_000,
            report.pclk2_hz / 1_000_000,
            report.polls
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedRcc;

    const PLL_180: PllConfig = PllConfig { pllm: 4, plln: 180, pllp: 0 };

    #[test]
    fn reaches_done_and_reports_frequencies() {
        let mut rcc = SimulatedRcc::ready_after(3, 5, 2);
        let report = ClockBringup::new(&mut rcc, 8_000_000, PLL_180, 5, 100).run().unwrap();

        assert_eq!(report.sysclk_hz, 180_000_000);
        assert_eq!(report.pclk1_hz, 45_000_000);
        assert_eq!(report.pclk2_hz, 90_000_000);
        assert_eq!(report.polls, 3 + 5 + 2);
        assert_eq!(rcc.sysclk(), SysclkSource::Pll);
        assert_eq!(rcc.programmed_pll(), Some(PLL_180));
        assert_eq!(rcc.flash_latency(), Some(5));
    }

    #[test]
    fn dead_oscillator_is_a_hardware_fault() {
        let mut rcc = SimulatedRcc::ready_after(1, 1, 1).with_dead_hse();
        let err = ClockBringup::new(&mut rcc, 8_000_000, PLL_180, 5, 50).run().unwrap_err();
        assert_eq!(err, BoardError::HardwareFault { step: "HSE ready", attempts: 50 });
    }

    #[test]
    fn pll_lock_failure_stops_before_switching() {
        let mut rcc = SimulatedRcc::ready_after(1, 1, 1).with_dead_pll();
        let mut bringup = ClockBringup::new(&mut rcc, 8_000_000, PLL_180, 5, 10);
        let err = loop {
            match bringup.step() {
                Ok(BringupStep::Done) => panic!("bring-up must not complete"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        assert_eq!(err, BoardError::HardwareFault { step: "PLL ready", attempts: 10 });
        assert_eq!(bringup.current_step(), BringupStep::WaitPllReady);
        drop(bringup);
        assert_eq!(rcc.sysclk(), SysclkSource::Hsi);
    }

    #[test]
    fn step_after_done_is_idempotent() {
        let mut rcc = SimulatedRcc::ready_after(1, 1, 1);
        let mut bringup = ClockBringup::new(&mut rcc, 8_000_000, PLL_180, 5, 10);
        while bringup.step().unwrap() != BringupStep::Done {}
        assert_eq!(bringup.step().unwrap(), BringupStep::Done);
    }
}
