#![allow(dead_code)]

use std::{cell::RefCell, path::Path, rc::Rc};

use comms::{OnoReceiver, OnoSender};
use serde_json::{Value, json};
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

use worker::{
    CommandHandlers, ServiceError,
    inference::InputBatch,
    loader::{EntryPoint, Manifest, ManifestModel, ModelLoader},
    metrics::MetricsStore,
    service::ModelService,
    service_manager::{ModelRegistration, ServiceFactory, ServiceManager},
};

pub type Calls = Rc<RefCell<Vec<InputBatch>>>;

pub type TestHandlers = CommandHandlers<ServiceManager<RecordingFactory>, StubLoader>;

pub type Channel = (
    OnoReceiver<ReadHalf<DuplexStream>>,
    OnoSender<WriteHalf<DuplexStream>>,
);

/// Records every batch it is asked to run and echoes the batch size back.
pub struct RecordingService {
    calls: Calls,
    fail: bool,
    metrics: MetricsStore,
}

impl ModelService for RecordingService {
    fn inference(&mut self, batch: &InputBatch) -> Result<Value, ServiceError> {
        self.calls.borrow_mut().push(batch.clone());

        if self.fail {
            return Err(anyhow::anyhow!("model exploded").into());
        }

        self.metrics.add_counter("Requests", batch.len());
        Ok(json!(vec!["ok"; batch.len()]))
    }

    fn metrics_store(&self) -> &MetricsStore {
        &self.metrics
    }

    fn metrics_store_mut(&mut self) -> &mut MetricsStore {
        &mut self.metrics
    }
}

#[derive(Default)]
pub struct RecordingFactory {
    pub calls: Calls,
    pub fail: bool,
}

impl ServiceFactory for RecordingFactory {
    fn create(&self, _: &ModelRegistration) -> Result<Box<dyn ModelService>, ServiceError> {
        Ok(Box::new(RecordingService {
            calls: Rc::clone(&self.calls),
            fail: self.fail,
            metrics: MetricsStore::default(),
        }))
    }
}

/// A loader that resolves every handler without touching the filesystem.
pub enum StubLoader {
    Resolves,
    Rejects(&'static str),
    Fails(&'static str),
}

impl StubLoader {
    pub fn manifest() -> Manifest {
        Manifest {
            runtime: Some("rust".to_string()),
            model: Some(ManifestModel {
                model_name: Some("noop".to_string()),
                handler: Some("service.rs".to_string()),
            }),
        }
    }
}

impl ModelLoader for StubLoader {
    fn load(&self, model_path: &Path, handler: &str) -> Result<(Manifest, EntryPoint), ServiceError> {
        match self {
            Self::Resolves => Ok((
                Self::manifest(),
                EntryPoint {
                    file: model_path.join(handler),
                    function: "handle".to_string(),
                },
            )),
            Self::Rejects(msg) => Err(ServiceError::Invalid(msg.to_string())),
            Self::Fails(msg) => Err(anyhow::anyhow!(*msg).into()),
        }
    }
}

pub fn handlers(loader: StubLoader) -> (TestHandlers, Calls) {
    let factory = RecordingFactory::default();
    let calls = Rc::clone(&factory.calls);
    (CommandHandlers::new(ServiceManager::new(factory), loader), calls)
}

pub fn failing_handlers() -> TestHandlers {
    let factory = RecordingFactory {
        fail: true,
        ..Default::default()
    };
    CommandHandlers::new(ServiceManager::new(factory), StubLoader::Resolves)
}

pub fn load_payload(name: &str) -> Value {
    json!({ "modelPath": "/models/noop", "modelName": name, "handler": "service.rs" })
}

pub fn predict_payload(name: &str, batch: Value) -> Value {
    json!({ "modelName": name, "requestBatch": batch })
}

pub fn text_request(id: &str, value: &str) -> Value {
    json!({
        "requestId": id,
        "encoding": "utf-8",
        "modelInputs": [{ "name": "data", "contentType": "text/plain", "value": value }],
    })
}

pub fn channel_pair() -> (Channel, Channel) {
    let (stream1, stream2) = io::duplex(64 * 1024);
    let (rx1, tx1) = io::split(stream1);
    let (rx2, tx2) = io::split(stream2);
    (comms::channel(rx1, tx1), comms::channel(rx2, tx2))
}
