//! Wire-level payload shapes carried inside `Request::payload`.
//!
//! These only describe structure. Semantic checks (non-empty names, batch
//! sizes, input decoding) belong to the worker.

mod model;
mod predict;

pub use model::{LoadSpec, UnloadSpec};
pub use predict::{ModelInputSpec, PredictSpec, RequestSpec};
