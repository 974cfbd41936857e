//! Output writers: 8-bit PNG images and the JSON dataset manifest.
pub mod manifest;
pub mod png;
