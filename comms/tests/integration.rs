use comms::{
    Deserialize, MAX_FRAME_LEN, Serialize,
    msg::{Request, Response},
};
use serde_json::json;
use tokio::io::{self, AsyncWriteExt};

#[test]
fn serialize_deserialize() {
    let req = Request::new("predict", json!({ "modelName": "resnet" }));

    let mut buf = Vec::new();
    req.serialize(&mut buf).unwrap();
    let deserialized = Request::deserialize(&buf).unwrap();

    assert_eq!(deserialized, req);
}

#[tokio::test]
async fn send_recv() {
    const SIZE: usize = 128;

    let msg = Response::new(200, "Prediction success", Some(json!(["cat"])));

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    let send = tx.send(&msg);
    let recv = rx.recv::<Response>();
    let (sent, received) = tokio::join!(send, recv);

    sent.unwrap();
    assert_eq!(received.unwrap(), msg);
}

#[tokio::test]
async fn bad_body_keeps_the_stream_aligned() {
    let (one, two) = io::duplex(1024);
    let (_, mut raw_tx) = io::split(one);
    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let garbage = b"not json";
    raw_tx.write_all(&(garbage.len() as u64).to_be_bytes()).await.unwrap();
    raw_tx.write_all(garbage).await.unwrap();

    let good = comms::encode(&Request::new("unload", json!({ "model-name": "m" }))).unwrap();
    raw_tx.write_all(&good).await.unwrap();

    let err = rx.recv::<Request>().await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

    let req = rx.recv::<Request>().await.unwrap();
    assert_eq!(req.command, "unload");
}

#[tokio::test]
async fn oversized_header_is_rejected() {
    let (one, two) = io::duplex(64);
    let (_, mut raw_tx) = io::split(one);
    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let len = MAX_FRAME_LEN as u64 + 1;
    raw_tx.write_all(&len.to_be_bytes()).await.unwrap();

    let err = rx.recv::<Request>().await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[tokio::test]
async fn closed_stream_is_unexpected_eof() {
    let (one, two) = io::duplex(64);
    drop(one);
    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let err = rx.recv::<Request>().await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}
