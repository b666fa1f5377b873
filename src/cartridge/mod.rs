mod axrom;
mod cnrom;
mod empty;
mod mapper;
mod mmc1;
mod nrom;
mod rom;
mod uxrom;

pub use axrom::AxromMapper;
pub use cnrom::CnromMapper;
pub use empty::EmptyMapper;
pub use mapper::{
    Mapper, MapperInfo, Mirroring, Nametables, SharedMapper, create_mapper, empty_slot,
};
pub use mmc1::Mmc1Mapper;
pub use nrom::NromMapper;
pub use rom::RomImage;
pub use uxrom::UxromMapper;

#[cfg(test)]
pub(crate) use rom::tests::create_test_rom;
