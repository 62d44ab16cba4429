//! Soft-blink pattern telling the two modes apart.
//!
//! A software PWM on a single-shot timer: each on/off cycle moves the duty cycle one percent
//! towards the current ramp end, and at the bottom of the ramp the LEDs stay dark for a long
//! pause.

use crate::mode::Mode;

/// Tick rate of the indicator timer.
pub const TIMER_HZ: u32 = 32_768;

pub const LED_RED: u8 = 1;
pub const LED_GREEN: u8 = 2;
pub const LED_BLUE: u8 = 3;

const PWM_PERIOD_MS: u32 = 20;
const DUTY_CYCLE_MAX: u32 = 20;
const DUTY_CYCLE_MIN: u32 = 0;
const OFF_PAUSE_MS: u32 = 4000;
/// Keeps every timeout above the timer's minimum.
const MIN_TIMEOUT_TICKS: u32 = 5;

pub const fn ms_to_ticks(ms: u32) -> u32 {
    ((ms as u64 * TIMER_HZ as u64) / 1000) as u32
}

const PWM_PERIOD_TICKS: u32 = ms_to_ticks(PWM_PERIOD_MS);

/// Bit mask over GPIO pin numbers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedMask(pub u32);

impl LedMask {
    pub const fn pin(pin: u8) -> Self {
        Self(1 << pin)
    }

    pub const fn with(self, pin: u8) -> Self {
        Self(self.0 | (1 << pin))
    }

    /// Yellow in config mode, purple as beacon.
    pub const fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Config => Self::pin(LED_RED).with(LED_GREEN),
            Mode::Beacon => Self::pin(LED_RED).with(LED_BLUE),
        }
    }
}

/// One step of the pattern: drive `mask` to `lit` and restart the timer with `next_ticks`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Blink {
    pub mask: LedMask,
    pub lit: bool,
    pub next_ticks: u32,
}

pub struct Indicator {
    mask: LedMask,
    lit: bool,
    duty_cycle: u32,
    counting_up: bool,
}

impl Indicator {
    pub fn new(mode: Mode) -> Self {
        Self {
            mask: LedMask::for_mode(mode),
            lit: false,
            duty_cycle: DUTY_CYCLE_MIN,
            counting_up: true,
        }
    }

    /// Timeout for the very first timer start.
    pub const fn initial_ticks() -> u32 {
        PWM_PERIOD_TICKS
    }

    pub fn mask(&self) -> LedMask {
        self.mask
    }

    /// Duty cycle in percent.
    pub fn duty_cycle(&self) -> u32 {
        self.duty_cycle
    }

    /// Advances the pattern on timer expiry.
    pub fn step(&mut self) -> Blink {
        let next_ticks = if self.lit {
            self.lit = false;
            self.advance_ramp();

            if self.duty_cycle == DUTY_CYCLE_MIN {
                ms_to_ticks(OFF_PAUSE_MS)
            } else {
                (PWM_PERIOD_TICKS / 100) * (100 - self.duty_cycle) + MIN_TIMEOUT_TICKS
            }
        } else {
            self.lit = true;
            (PWM_PERIOD_TICKS / 100) * self.duty_cycle + MIN_TIMEOUT_TICKS
        };

        Blink {
            mask: self.mask,
            lit: self.lit,
            next_ticks,
        }
    }

    fn advance_ramp(&mut self) {
        if self.counting_up {
            self.duty_cycle += 1;
            if self.duty_cycle >= DUTY_CYCLE_MAX {
                self.counting_up = false;
            }
        } else {
            self.duty_cycle -= 1;
            if self.duty_cycle == DUTY_CYCLE_MIN {
                self.counting_up = true;
            }
        }
    }
}
