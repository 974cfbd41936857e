//! Core building blocks: the patch data model, dataset parameters, the linear
//! workflow and its tasks, and the coverage/normalize/resize/save primitives
//! consumed by the high-level `api` module.
pub mod params;
pub mod patch;
pub mod processing;
pub mod workflow;
