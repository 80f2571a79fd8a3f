mod common;

use std::{fs, path::Path, time::Duration};

use comms::msg::{Request, Response};
use serde_json::json;
use tokio::{
    net::{TcpStream, UnixStream},
    time,
};

use common::{RecordingFactory, StubLoader, handlers, load_payload, predict_payload, text_request};
use worker::{
    ErrorCode, ModelServiceWorker, Shutdown, SocketKind, WorkerConfig,
    sender::MAX_FAILURE_THRESHOLD, service_manager::ServiceManager,
};

type TestWorker = ModelServiceWorker<ServiceManager<RecordingFactory>, StubLoader>;

fn unix_worker(path: &Path) -> TestWorker {
    let (handlers, _) = handlers(StubLoader::Resolves);
    let config = WorkerConfig::new(SocketKind::Unix, path.to_str().unwrap())
        .with_accept_timeout(Duration::from_secs(5));
    ModelServiceWorker::new(config, handlers).unwrap()
}

async fn connect(path: &Path) -> UnixStream {
    loop {
        match UnixStream::connect(path).await {
            Ok(stream) => return stream,
            Err(_) => time::sleep(Duration::from_millis(10)).await,
        }
    }
}

/// Loads a model and runs one prediction over a fresh connection.
async fn frontend_session(path: &Path, model: &str) -> Vec<Response> {
    let (rx, tx) = connect(path).await.into_split();
    let (mut rx, mut tx) = comms::channel(rx, tx);

    let requests = [
        Request::new("load", load_payload(model)),
        Request::new("predict", predict_payload(model, json!([text_request("r1", "hi")]))),
    ];

    let mut responses = Vec::new();
    for request in &requests {
        tx.send(request).await.unwrap();
        responses.push(rx.recv().await.unwrap());
    }

    responses
}

#[test]
fn empty_address_is_incomplete_data() {
    let (handlers, _) = handlers(StubLoader::Resolves);
    let config = WorkerConfig::new(SocketKind::Unix, "");

    let err = ModelServiceWorker::new(config, handlers).err().unwrap();

    assert_eq!(err.code(), ErrorCode::IncompleteData);
    assert_eq!(err.message(), "Incomplete data provided");
}

#[test]
fn stale_socket_file_is_unlinked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker.sock");
    fs::write(&path, b"stale").unwrap();

    let _worker = unix_worker(&path);

    assert!(!path.exists());
}

#[test]
fn unremovable_socket_path_is_in_use() {
    let dir = tempfile::tempdir().unwrap();
    let address = dir.path().to_str().unwrap();
    let (handlers, _) = handlers(StubLoader::Resolves);

    let err = ModelServiceWorker::new(WorkerConfig::new(SocketKind::Unix, address), handlers)
        .err()
        .unwrap();

    assert_eq!(err.code(), ErrorCode::SocketInUse);
    assert_eq!(err.message(), format!("socket already in use: {address}."));
}

#[test]
fn unparsable_tcp_port_is_an_unknown_exception() {
    let (handlers, _) = handlers(StubLoader::Resolves);

    let err = ModelServiceWorker::new(WorkerConfig::new(SocketKind::Tcp, "http"), handlers)
        .err()
        .unwrap();

    assert_eq!(err.code(), ErrorCode::UnknownException);
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("worker.sock");
    let worker = unix_worker(&path);

    let err = worker.run().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::SocketBindError);
}

#[tokio::test]
async fn no_frontend_before_the_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker.sock");
    let (handlers, _) = handlers(StubLoader::Resolves);
    let config = WorkerConfig::new(SocketKind::Unix, path.to_str().unwrap())
        .with_accept_timeout(Duration::from_millis(50));

    let worker = ModelServiceWorker::new(config, handlers).unwrap();
    let shutdown = worker.run().await.unwrap();

    assert_eq!(shutdown, Shutdown::NoFrontend);
}

#[tokio::test]
async fn serves_one_connection_then_exits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker.sock");
    let worker = unix_worker(&path);

    let (shutdown, responses) = tokio::join!(worker.run(), frontend_session(&path, "noop"));

    assert_eq!(shutdown.unwrap(), Shutdown::Served);
    assert_eq!(responses[0].code, 200);
    assert_eq!(responses[1].message, "Prediction success");
}

#[tokio::test]
async fn debug_mode_accepts_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker.sock");
    let (handlers, _) = handlers(StubLoader::Resolves);
    let config = WorkerConfig::new(SocketKind::Unix, path.to_str().unwrap()).with_debug(true);
    let worker = ModelServiceWorker::new(config, handlers).unwrap();

    let frontend = async {
        let first = frontend_session(&path, "first").await;
        let second = frontend_session(&path, "second").await;
        (first, second)
    };

    tokio::select! {
        res = worker.run() => panic!("debug worker stopped: {res:?}"),
        (first, second) = frontend => {
            assert!(first.iter().chain(&second).all(|response| response.code == 200));
        }
    }
}

#[tokio::test]
async fn serves_one_tcp_connection_then_exits() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let (handlers, _) = handlers(StubLoader::Resolves);
    let config = WorkerConfig::new(SocketKind::Tcp, port.to_string())
        .with_accept_timeout(Duration::from_secs(5));
    let worker = ModelServiceWorker::new(config, handlers).unwrap();

    let frontend = async {
        let stream = loop {
            match TcpStream::connect(("127.0.0.1", port)).await {
                Ok(stream) => break stream,
                Err(_) => time::sleep(Duration::from_millis(10)).await,
            }
        };

        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);
        tx.send(&Request::new("load", load_payload("noop"))).await.unwrap();
        rx.recv::<Response>().await.unwrap()
    };

    let (shutdown, response) = tokio::join!(worker.run(), frontend);

    assert_eq!(shutdown.unwrap(), Shutdown::Served);
    assert_eq!(response.code, 200);
}

/// Sends one request and hangs up before the reply, so the reply write fails.
async fn hang_up_after_request(path: &Path) {
    let (rx, tx) = connect(path).await.into_split();
    let (_, mut tx) = comms::channel(rx, tx);
    let request = Request::new("unload", json!({ "model-name": "ghost" }));
    tx.send(&request).await.unwrap();
}

#[tokio::test]
async fn send_failures_accumulate_across_debug_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker.sock");
    let (handlers, _) = handlers(StubLoader::Resolves);
    let config = WorkerConfig::new(SocketKind::Unix, path.to_str().unwrap()).with_debug(true);
    let worker = ModelServiceWorker::new(config, handlers).unwrap();

    // One failed send per connection: only a counter that survives
    // reconnects can reach the limit.
    let frontend = async {
        for _ in 0..MAX_FAILURE_THRESHOLD {
            hang_up_after_request(&path).await;
        }
    };

    let (shutdown, ()) = tokio::join!(
        time::timeout(Duration::from_secs(10), worker.run()),
        frontend
    );

    assert_eq!(shutdown.unwrap().unwrap(), Shutdown::SendFailsExceedsLimits);
}
