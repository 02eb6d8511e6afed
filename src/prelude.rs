pub use crate::crc::Accumulator as _gd32e103_dma_crc_crc_Accumulator;
pub use crate::crc::CrcExt as _gd32e103_dma_crc_crc_CrcExt;
pub use crate::dma::BlockMover as _gd32e103_dma_crc_dma_BlockMover;
pub use crate::dma::DmaExt as _gd32e103_dma_crc_dma_DmaExt;
pub use crate::rcu::RcuExt as _gd32e103_dma_crc_rcu_RcuExt;
pub use crate::time::Clock as _gd32e103_dma_crc_time_Clock;
pub use crate::time::U32Ext as _gd32e103_dma_crc_time_U32Ext;
