pub mod accuracy;
pub mod ai;
pub mod analysis;
pub mod attributes;
pub mod engine;
pub mod error;
pub mod pools;
pub mod sampler;
pub mod store;
pub mod tuner;

pub use engine::Engine;
pub use error::{AiError, Error, SampleError};
