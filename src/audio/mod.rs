pub mod decoder;
pub mod resample;

pub use decoder::decode_audio;
