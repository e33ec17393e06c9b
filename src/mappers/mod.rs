/*
Module: mappers

Declares the bank-switching boards and re-exports their public types. NROM
lives next to the `Mapper` trait in `crate::mapper`.

Implemented:
- MMC1 (Mapper 1)
- UxROM (Mapper 2)
- MMC3 (Mapper 4) with the A12 scanline IRQ
*/

pub mod mmc1;
pub mod mmc3;
pub mod uxrom;

pub use mmc1::Mmc1;
pub use mmc3::Mmc3;
pub use uxrom::Uxrom;
