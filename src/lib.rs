// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # DMA-fed CRC-32 for the GD32E103 family of microcontrollers
//!
//! Computes a CRC-32 over a buffer by letting a DMA channel feed the hardware CRC unit, so
//! the core can sleep while the checksum is produced. Buffers longer than one DMA descriptor
//! are split into bounded chunks that are re-armed from the transfer-complete interrupt.
//!
//! # Usage
//!
//! ## Commonly used setup
//!
//! ```rust,ignore
//! use gd32e103_dma_crc::{chunked::{ChunkedCrc, Completion, Config}, pac, prelude::*};
//!
//! static COMPLETION: Completion = Completion::new();
//!
//! let dp = pac::Peripherals::take().unwrap();
//! let mut rcu = dp.RCU.constrain();
//!
//! // Pair DMA0 channel 0 with the CRC data register.
//! let channels = dp.DMA0.split(&mut rcu.ahb);
//! let crc_dma = dp.CRC.constrain(&mut rcu.ahb).with_dma(channels.0);
//!
//! let mut engine = ChunkedCrc::new(crc_dma, &COMPLETION, Config::default());
//! engine.start(buffer)?;
//! // ... call `engine.on_transfer_complete()` from the DMA0_CHANNEL0 handler ...
//! COMPLETION.wait(cortex_m::asm::wfi);
//! let crc = nb::block!(engine.result())?;
//! ```
//!
//! ## Usage examples
//!
//! See `demos/dma_crc.rs`, which sweeps several block sizes and compares the DMA path against
//! the CPU-fed and software paths.

#![cfg_attr(not(test), no_std)]
#![deny(broken_intra_doc_links)]

pub use gd32e1::gd32e103 as pac;

pub mod bench;
pub mod chunked;
pub mod crc;
pub mod dma;
pub mod prelude;
pub mod rcu;
pub mod time;
