// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reset and clock unit
//!
//! Only the AHB bus is modelled: both the CRC unit and the DMA controllers hang off it.

use crate::pac::{rcu, CRC, DMA0, RCU};

/// Extension trait to constrain the RCU peripheral
pub trait RcuExt {
    /// Constrains the RCU peripheral so it plays nicely with the other abstractions
    fn constrain(self) -> Rcu;
}

impl RcuExt for RCU {
    fn constrain(self) -> Rcu {
        Rcu { ahb: AHB { _0: () } }
    }
}

/// Constrained RCU peripheral
pub struct Rcu {
    /// AHB peripheral enable and reset registers
    pub ahb: AHB,
}

/// AHB register access
pub struct AHB {
    _0: (),
}

impl AHB {
    fn en(&mut self) -> &rcu::AHBEN {
        // NOTE(unsafe) this proxy grants exclusive access to this register
        unsafe { &(*RCU::ptr()).ahben }
    }
}

/// Bus associated to peripheral
pub trait RcuBus {
    /// Bus type
    type Bus;
}

/// Enable/disable peripheral
pub trait Enable: RcuBus {
    fn enable(bus: &mut Self::Bus);
    fn disable(bus: &mut Self::Bus);
}

/// Reset peripheral
pub trait Reset: RcuBus {
    fn reset(bus: &mut Self::Bus);
}

macro_rules! ahb_bus {
    ($($PER:ident => $bit:expr,)+) => {
        $(
            impl RcuBus for $PER {
                type Bus = AHB;
            }

            impl Enable for $PER {
                #[inline(always)]
                fn enable(bus: &mut Self::Bus) {
                    bus.en().modify(|r, w| unsafe { w.bits(r.bits() | (1 << $bit)) });
                }

                #[inline(always)]
                fn disable(bus: &mut Self::Bus) {
                    bus.en().modify(|r, w| unsafe { w.bits(r.bits() & !(1 << $bit)) });
                }
            }

            impl Reset for $PER {
                // AHB peripherals on this family have no reset register; cycling the clock
                // enable is the closest equivalent.
                #[inline(always)]
                fn reset(bus: &mut Self::Bus) {
                    Self::disable(bus);
                    Self::enable(bus);
                }
            }
        )+
    }
}

ahb_bus! {
    DMA0 => 0,
    CRC => 6,
}
