//! Debayering module for converting corrected Bayer frames to RGB previews

pub mod cpu_debayer;
pub mod types;

pub use cpu_debayer::CpuDebayer;
pub use types::RgbImageData;
