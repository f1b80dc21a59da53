//! Media inspection ports

pub mod ports;

pub use ports::ImageProbe;
