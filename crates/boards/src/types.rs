use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while bringing the board up. All of them are startup-fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    /// A ready flag never came up within the poll budget.
    #[error("Hardware fault: '{step}' not ready after {attempts} polls")]
    HardwareFault { step: &'static str, attempts: u32 },
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Main PLL dividers, using the register encoding for P (0 → /2, 1 → /4, 2 → /6, 3 → /8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PllConfig {
    pub pllm: u8,
    pub plln: u16,
    pub pllp: u8,
}

impl PllConfig {
    pub const VCO_INPUT_HZ: std::ops::RangeInclusive<u32> = 1_000_000..=2_000_000;
    pub const VCO_OUTPUT_HZ: std::ops::RangeInclusive<u32> = 100_000_000..=432_000_000;

    pub fn p_divider(&self) -> u32 {
        2 * (self.pllp as u32 + 1)
    }

    pub fn vco_input_hz(&self, hse_hz: u32) -> u32 {
        hse_hz / self.pllm as u32
    }

    pub fn vco_output_hz(&self, hse_hz: u32) -> u32 {
        self.vco_input_hz(hse_hz) * self.plln as u32
    }

    pub fn sysclk_hz(&self, hse_hz: u32) -> u32 {
        self.vco_output_hz(hse_hz) / self.p_divider()
    }

    /// Check divider ranges and the resulting VCO frequencies.
    pub fn validate(&self, hse_hz: u32, max_sysclk_hz: u32) -> Result<(), BoardError> {
        if !(2..=63).contains(&self.pllm) {
            return Err(BoardError::ConfigurationError(format!("PLLM must be 2..=63, got {}", self.pllm)));
        }
        if !(50..=432).contains(&self.plln) {
            return Err(BoardError::ConfigurationError(format!("PLLN must be 50..=432, got {}", self.plln)));
        }
        if self.pllp > 3 {
            return Err(BoardError::ConfigurationError(format!("PLLP must be 0..=3, got {}", self.pllp)));
        }
        let vco_in = self.vco_input_hz(hse_hz);
        if !Self::VCO_INPUT_HZ.contains(&vco_in) {
            return Err(BoardError::ConfigurationError(format!(
                "VCO input {} Hz outside 1-2 MHz",
                vco_in
            )));
        }
        let vco_out = self.vco_output_hz(hse_hz);
        if !Self::VCO_OUTPUT_HZ.contains(&vco_out) {
            return Err(BoardError::ConfigurationError(format!(
                "VCO output {} Hz outside 100-432 MHz",
                vco_out
            )));
        }
        let sysclk = self.sysclk_hz(hse_hz);
        if sysclk > max_sysclk_hz {
            return Err(BoardError::ConfigurationError(format!(
                "SYSCLK {} Hz exceeds the {} Hz limit",
                sysclk, max_sysclk_hz
            )));
        }
        Ok(())
    }
}

/// Configuration for the clock tree bring-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// External oscillator frequency
    pub hse_hz: u32,
    pub pll: PllConfig,
    /// Flash wait states for the target frequency
    pub flash_latency_ws: u8,
    /// Upper bound on polls of any single ready flag
    pub max_poll_attempts: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        // 8 MHz / 4 * 180 / 2 = 180 MHz
        Self {
            hse_hz: 8_000_000,
            pll: PllConfig { pllm: 4, plln: 180, pllp: 0 },
            flash_latency_ws: 5,
            max_poll_attempts: 10_000,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self, max_sysclk_hz: u32) -> Result<(), BoardError> {
        if self.max_poll_attempts == 0 {
            return Err(BoardError::ConfigurationError("max_poll_attempts must be positive".to_string()));
        }
        if self.flash_latency_ws > 15 {
            return Err(BoardError::ConfigurationError(format!(
                "flash_latency_ws must be 0..=15, got {}",
                self.flash_latency_ws
            )));
        }
        self.pll.validate(self.hse_hz, max_sysclk_hz)
    }
}

/// Clock frequencies reached by a successful bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReport {
    pub sysclk_hz: u32,
    pub hclk_hz: u32,
    pub pclk1_hz: u32,
    pub pclk2_hz: u32,
    /// Ready-flag polls spent across all wait steps.
    pub polls: u32,
}
