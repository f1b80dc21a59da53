//! Image inspection

pub mod probe;

pub use probe::DecodingImageProbe;
