use std::path::PathBuf;

use crate::{
    loader::{EntryPoint, Manifest},
    service::ModelService,
};

/// Everything the registry needs to instantiate and serve a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRegistration {
    pub name: String,
    pub model_path: PathBuf,
    pub manifest: Manifest,
    pub entry_point: EntryPoint,
    pub gpu: Option<u32>,
    pub batch_size: Option<u32>,
}

pub struct ServiceMetadata {
    pub registration: ModelRegistration,
    pub service: Box<dyn ModelService>,
}
