// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Direct Memory Access
//!
//! Only memory-to-memory transfers into the CRC unit are supported: the source walks a byte
//! buffer and every byte is written, zero-extended, to the CRC data register.

use core::sync::atomic::{self, Ordering};

use crate::crc::{Accumulator, Crc};
use crate::rcu::AHB;

/// A DMA engine able to copy one bounded, contiguous region into a fixed destination and
/// signal completion through an interrupt.
pub trait BlockMover {
    /// The accumulator sitting at the destination of every transfer.
    type Accumulator: Accumulator;

    /// Longest transfer one descriptor can describe, in bytes.
    const MAX_LEN: usize;

    /// Programs the next transfer of `len` bytes starting at `src`.
    ///
    /// # Safety
    ///
    /// `src .. src + len` must stay valid for reads until the transfer has completed or
    /// [`disable`](BlockMover::disable) has been called, and `len` must not exceed
    /// [`MAX_LEN`](BlockMover::MAX_LEN).
    unsafe fn configure(&mut self, src: *const u8, len: usize);

    /// Arms the completion interrupt.
    fn enable(&mut self);

    /// Starts the configured transfer.
    fn trigger(&mut self);

    /// Stops the channel and acknowledges its completion flags.
    fn disable(&mut self);

    /// Whether the transfer last triggered has finished and is not yet acknowledged.
    fn is_complete(&self) -> bool;

    fn accumulator(&self) -> &Self::Accumulator;

    fn accumulator_mut(&mut self) -> &mut Self::Accumulator;
}

/// Extension trait to split a DMA peripheral into independent channels
pub trait DmaExt {
    /// The type to split the DMA into
    type Channels;

    /// Splits the DMA peripheral into independent channels
    fn split(self, ahb: &mut AHB) -> Self::Channels;
}

/// Register level operations on one DMA channel.
pub trait DmaChannel {
    /// Sets the address written to on every transfer.
    fn set_peripheral_address(&mut self, address: u32);

    /// Sets the address of the first byte read.
    fn set_memory_address(&mut self, address: u32);

    /// Sets the number of transfers.
    fn set_transfer_length(&mut self, len: u16);

    /// Replaces the control register, leaving the channel disabled.
    fn set_control(&mut self, ctl: u32);

    /// Enables the full transfer finish interrupt.
    fn listen(&mut self);

    /// Sets the channel enable bit.
    fn start(&mut self);

    /// Clears the channel enable bit.
    fn stop(&mut self);

    /// Whether the full transfer finish flag is set.
    fn is_complete(&self) -> bool;

    /// Clears every interrupt flag of the channel.
    fn clear_flags(&mut self);
}

const CTL_CHEN: u32 = 1 << 0;
const CTL_FTFIE: u32 = 1 << 1;
const CTL_DIR: u32 = 1 << 4;
const CTL_MNAGA: u32 = 1 << 7;
const CTL_PWIDTH_32: u32 = 0b10 << 8;
const CTL_MWIDTH_8: u32 = 0b00 << 10;
const CTL_PRIO_HIGH: u32 = 0b10 << 12;
const CTL_M2M: u32 = 1 << 14;

const INTF_FTFIF: u32 = 1 << 1;
const INTC_GIFC: u32 = 1 << 0;

macro_rules! dma {
    ($DMAX:ident: ($dmax:ident, {
        $($CX:ident: (
            $x:expr,
            $chXctl:ident,
            $chXcnt:ident,
            $chXpaddr:ident,
            $chXmaddr:ident
        ),)+
    }),) => {
        pub mod $dmax {
            use crate::pac::{$dmax, $DMAX};
            use crate::rcu::{Enable, Reset, AHB};

            use super::*;

            /// DMA channels
            pub struct Channels($(pub $CX),+);

            $(
                /// A singleton that represents a single DMA channel
                pub struct $CX {
                    _0: (),
                }

                impl $CX {
                    fn regs(&self) -> &$dmax::RegisterBlock {
                        // NOTE(unsafe) each channel only touches its own registers, and its bits
                        // in the shared flag registers through write-one-to-clear accesses
                        unsafe { &*$DMAX::ptr() }
                    }
                }

                impl DmaChannel for $CX {
                    fn set_peripheral_address(&mut self, address: u32) {
                        self.regs().$chXpaddr.write(|w| unsafe { w.bits(address) });
                    }

                    fn set_memory_address(&mut self, address: u32) {
                        self.regs().$chXmaddr.write(|w| unsafe { w.bits(address) });
                    }

                    fn set_transfer_length(&mut self, len: u16) {
                        self.regs().$chXcnt.write(|w| unsafe { w.bits(u32::from(len)) });
                    }

                    fn set_control(&mut self, ctl: u32) {
                        self.regs().$chXctl.write(|w| unsafe { w.bits(ctl & !CTL_CHEN) });
                    }

                    fn listen(&mut self) {
                        self.regs()
                            .$chXctl
                            .modify(|r, w| unsafe { w.bits(r.bits() | CTL_FTFIE) });
                    }

                    fn start(&mut self) {
                        self.regs()
                            .$chXctl
                            .modify(|r, w| unsafe { w.bits(r.bits() | CTL_CHEN) });
                    }

                    fn stop(&mut self) {
                        self.regs()
                            .$chXctl
                            .modify(|r, w| unsafe { w.bits(r.bits() & !CTL_CHEN) });
                    }

                    fn is_complete(&self) -> bool {
                        self.regs().intf.read().bits() & (INTF_FTFIF << (4 * $x)) != 0
                    }

                    fn clear_flags(&mut self) {
                        self.regs().intc.write(|w| unsafe { w.bits(INTC_GIFC << (4 * $x)) });
                    }
                }
            )+

            impl DmaExt for $DMAX {
                type Channels = Channels;

                fn split(self, ahb: &mut AHB) -> Channels {
                    $DMAX::enable(ahb);
                    $DMAX::reset(ahb);

                    Channels($($CX { _0: () }),+)
                }
            }
        }
    }
}

dma! {
    DMA0: (dma0, {
        C0: (0, ch0ctl, ch0cnt, ch0paddr, ch0maddr),
        C1: (1, ch1ctl, ch1cnt, ch1paddr, ch1maddr),
        C2: (2, ch2ctl, ch2cnt, ch2paddr, ch2maddr),
        C3: (3, ch3ctl, ch3cnt, ch3paddr, ch3maddr),
        C4: (4, ch4ctl, ch4cnt, ch4paddr, ch4maddr),
        C5: (5, ch5ctl, ch5cnt, ch5paddr, ch5maddr),
        C6: (6, ch6ctl, ch6cnt, ch6paddr, ch6maddr),
    }),
}

/// Transfer count register value for a `len` byte transfer.
///
/// # Panics
///
/// If `len` does not fit the 16-bit counter.
fn transfer_count(len: usize) -> u16 {
    match cast::u16(len) {
        Ok(count) => count,
        Err(_) => panic!("DMA transfer of {} bytes exceeds the channel counter", len),
    }
}

/// A DMA channel wired to the CRC data register.
pub struct CrcDma<CH> {
    crc: Crc,
    channel: CH,
}

impl<CH: DmaChannel> CrcDma<CH> {
    pub(crate) fn new(crc: Crc, mut channel: CH) -> Self {
        channel.stop();
        channel.clear_flags();
        CrcDma { crc, channel }
    }

    /// Releases the CRC unit and the channel.
    pub fn release(mut self) -> (Crc, CH) {
        self.channel.stop();
        (self.crc, self.channel)
    }
}

impl<CH: DmaChannel> BlockMover for CrcDma<CH> {
    type Accumulator = Crc;

    const MAX_LEN: usize = u16::MAX as usize;

    unsafe fn configure(&mut self, src: *const u8, len: usize) {
        let len = transfer_count(len);

        let data = self.crc.data_address();
        self.channel.set_peripheral_address(data);
        self.channel.set_memory_address(src as usize as u32);
        self.channel.set_transfer_length(len);
        self.channel.set_control(
            CTL_M2M | CTL_DIR | CTL_MNAGA | CTL_MWIDTH_8 | CTL_PWIDTH_32 | CTL_PRIO_HIGH,
        );
    }

    fn enable(&mut self) {
        self.channel.listen();
    }

    fn trigger(&mut self) {
        // Buffer writes must land before the DMA starts reading.
        atomic::compiler_fence(Ordering::Release);
        self.channel.start();
    }

    fn disable(&mut self) {
        self.channel.stop();
        self.channel.clear_flags();
        atomic::compiler_fence(Ordering::Acquire);
    }

    fn is_complete(&self) -> bool {
        self.channel.is_complete()
    }

    fn accumulator(&self) -> &Crc {
        &self.crc
    }

    fn accumulator_mut(&mut self) -> &mut Crc {
        &mut self.crc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_count_fits_the_counter() {
        assert_eq!(transfer_count(1), 1);
        assert_eq!(transfer_count(1024), 1024);
        assert_eq!(transfer_count(<CrcDma<dma0::C0> as BlockMover>::MAX_LEN), u16::MAX);
    }

    #[test]
    #[should_panic]
    fn oversize_transfer_is_refused() {
        transfer_count(usize::from(u16::MAX) + 1);
    }
}
