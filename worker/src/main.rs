use std::process::ExitCode;

use log::{error, info};

use worker::{
    CommandHandlers, ModelServiceWorker, WorkerConfig, loader::ManifestLoader,
    service::EchoFactory, service_manager::ServiceManager, shutdown::UNCAUGHT_ERROR_EXIT_CODE,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    let run = async {
        let config = WorkerConfig::from_env()?;
        let handlers = CommandHandlers::new(ServiceManager::new(EchoFactory), ManifestLoader);
        ModelServiceWorker::new(config, handlers)?.run().await
    };

    match run.await {
        Ok(shutdown) => {
            info!("worker exiting: {shutdown}");
            ExitCode::from(shutdown.exit_code())
        }
        Err(e) => {
            error!("Backend worker process died. {e}");
            ExitCode::from(UNCAUGHT_ERROR_EXIT_CODE)
        }
    }
}
