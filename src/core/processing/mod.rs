pub mod coverage;
pub mod normalize;
pub mod resize;
pub mod save;
