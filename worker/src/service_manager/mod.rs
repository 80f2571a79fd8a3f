mod metadata;

use std::collections::HashMap;

use log::info;

use crate::{error::ServiceError, service::ModelService};

pub use metadata::ModelRegistration;
use metadata::ServiceMetadata;

/// Name to loaded model service mapping, as seen by the command handlers.
pub trait ServiceRegistry {
    /// Instantiates and registers a model under `registration.name`.
    fn register_and_load(&mut self, registration: ModelRegistration) -> Result<(), ServiceError>;

    /// # Errors
    /// Returns `ServiceError::Missing` if no model is registered under `name`.
    fn unload(&mut self, name: &str) -> Result<(), ServiceError>;

    /// Returns `Ok(None)` if no model is registered under `name`.
    fn get(&mut self, name: &str) -> Result<Option<&mut dyn ModelService>, ServiceError>;
}

/// Builds model services for new registrations.
pub trait ServiceFactory {
    fn create(&self, registration: &ModelRegistration) -> Result<Box<dyn ModelService>, ServiceError>;
}

/// In-process registry backed by a `ServiceFactory`.
pub struct ServiceManager<F> {
    factory: F,
    services: HashMap<String, ServiceMetadata>,
}

impl<F: ServiceFactory> ServiceManager<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            services: HashMap::new(),
        }
    }

    pub fn registration(&self, name: &str) -> Option<&ModelRegistration> {
        self.services.get(name).map(|metadata| &metadata.registration)
    }

    pub fn loaded_models(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

impl<F: ServiceFactory> ServiceRegistry for ServiceManager<F> {
    fn register_and_load(&mut self, registration: ModelRegistration) -> Result<(), ServiceError> {
        if self.services.contains_key(&registration.name) {
            return Err(ServiceError::Invalid(format!(
                "Model {} is already loaded",
                registration.name
            )));
        }

        let service = self.factory.create(&registration)?;
        info!(
            "registered model {} from {} (gpu: {:?}, batch size: {:?})",
            registration.name,
            registration.model_path.display(),
            registration.gpu,
            registration.batch_size,
        );

        let name = registration.name.clone();
        let metadata = ServiceMetadata {
            registration,
            service,
        };
        self.services.insert(name, metadata);
        Ok(())
    }

    fn unload(&mut self, name: &str) -> Result<(), ServiceError> {
        match self.services.remove(name) {
            Some(_) => {
                info!("unloaded model {name}");
                Ok(())
            }
            None => Err(ServiceError::Missing(name.to_string())),
        }
    }

    fn get(&mut self, name: &str) -> Result<Option<&mut dyn ModelService>, ServiceError> {
        let Some(metadata) = self.services.get_mut(name) else {
            return Ok(None);
        };

        let service: &mut dyn ModelService = metadata.service.as_mut();
        Ok(Some(service))
    }
}
