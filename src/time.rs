// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time units and elapsed-time measurement

use core::fmt;

use cortex_m::peripheral::{DCB, DWT};

/// Hertz
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hertz(pub u32);

/// MicroSeconds
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct MicroSeconds(pub u32);

impl fmt::Display for Hertz {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

impl fmt::Display for MicroSeconds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} us", self.0)
    }
}

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Hertz`
    fn hz(self) -> Hertz;

    /// Wrap in `Hertz`
    fn mhz(self) -> Hertz;

    /// Wrap in `MicroSeconds`
    fn us(self) -> MicroSeconds;

    /// Wrap in `MicroSeconds`
    fn ms(self) -> MicroSeconds;
}

impl U32Ext for u32 {
    fn hz(self) -> Hertz {
        Hertz(self)
    }

    fn mhz(self) -> Hertz {
        Hertz(self * 1_000_000)
    }

    fn us(self) -> MicroSeconds {
        MicroSeconds(self)
    }

    fn ms(self) -> MicroSeconds {
        MicroSeconds(self * 1_000)
    }
}

/// A free running, up-counting tick source.
pub trait Clock {
    /// Current tick count. Wraps around on overflow.
    fn now(&self) -> u32;

    /// Tick rate.
    fn frequency(&self) -> Hertz;

    /// Time elapsed since `t0`.
    fn elapsed_since(&self, t0: u32) -> MicroSeconds {
        elapsed(t0, self.now(), self.frequency())
    }
}

/// Converts the ticks between `t0` and `t1` into microseconds.
///
/// At most one wrap of the counter between the two samples is accounted for. Results that
/// do not fit saturate at `u32::MAX`.
pub fn elapsed(t0: u32, t1: u32, frequency: Hertz) -> MicroSeconds {
    if frequency.0 == 0 {
        return MicroSeconds(u32::MAX);
    }
    let ticks = u64::from(t1.wrapping_sub(t0));
    let micros = ticks * 1_000_000 / u64::from(frequency.0);
    MicroSeconds(cast::u32(micros).unwrap_or(u32::MAX))
}

/// A monotonic nondecreasing timer backed by the DWT cycle counter
#[derive(Clone, Copy)]
pub struct MonoTimer {
    frequency: Hertz,
}

impl MonoTimer {
    /// Creates a new monotonic timer counting core clock cycles at `sysclk`.
    ///
    /// Out of reset the core runs from the 8 MHz internal oscillator.
    pub fn new(mut dwt: DWT, mut dcb: DCB, sysclk: Hertz) -> Self {
        dcb.enable_trace();
        dwt.enable_cycle_counter();

        // now the CYCCNT counter can't be stopped or reset
        drop(dwt);

        MonoTimer { frequency: sysclk }
    }
}

impl Clock for MonoTimer {
    fn now(&self) -> u32 {
        DWT::cycle_count()
    }

    fn frequency(&self) -> Hertz {
        self.frequency
    }
}
