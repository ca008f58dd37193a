//! Trait seams for the external services the pipeline depends on.

pub mod model;
pub mod renderer;
