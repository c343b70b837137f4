use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::oneshot;
use treefs::client::Client;
use treefs::config::TreeFsConfig;
use treefs::dispatch::Dispatcher;
use treefs::server::Server;
use treefs::{ApiError, FileSystem, FsError, NodeKind};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn round_trip_over_datagram_socket() {
    let temp = TempDir::new().unwrap();
    let server_path = temp.path().join("server.sock");
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(FileSystem::new(
        &TreeFsConfig::default(),
    ))));

    let server = Server::bind(&server_path, Arc::clone(&dispatcher), 2).unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve(async move {
        let _ = stop_rx.await;
    }));

    let mut client = Client::mount(&server_path, temp.path().join("client.sock")).unwrap();
    client.create("/a", NodeKind::Directory).await.unwrap();
    client.create("/a/f", NodeKind::File).await.unwrap();
    let a = client.lookup("/a").await.unwrap();
    assert_eq!(dispatcher.fs().lookup("/a"), Ok(a));

    match client.create("/a", NodeKind::Directory).await {
        Err(ApiError::Fs(FsError::AlreadyExists)) => {}
        other => panic!("unexpected {:?}", other),
    }

    client.create("/b", NodeKind::Directory).await.unwrap();
    client.move_node("/a/f", "/b/g").await.unwrap();
    match client.lookup("/a/f").await {
        Err(ApiError::Fs(FsError::NotFound)) => {}
        other => panic!("unexpected {:?}", other),
    }

    let dump = temp.path().join("tree.txt");
    client.print(&dump).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&dump).unwrap(),
        "/\n  a/\n  b/\n    g\n"
    );

    client.delete("/b/g").await.unwrap();
    client.unmount().unwrap();
    assert!(!temp.path().join("client.sock").exists());

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
    assert!(!server_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_request_gets_error_answer() {
    let temp = TempDir::new().unwrap();
    let server_path = temp.path().join("server.sock");
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(FileSystem::new(
        &TreeFsConfig::default(),
    ))));
    let server = Server::bind(&server_path, dispatcher, 1).unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve(async move {
        let _ = stop_rx.await;
    }));

    let raw = tokio::net::UnixDatagram::bind(temp.path().join("raw.sock")).unwrap();
    raw.send_to(b"nonsense", &server_path).await.unwrap();
    let mut buf = [0u8; 4];
    let len = raw.recv(&mut buf).await.unwrap();
    assert_eq!(len, 4);
    assert_eq!(i32::from_le_bytes(buf), treefs::dispatch::BAD_REQUEST);

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_request_is_rejected_whole() {
    let temp = TempDir::new().unwrap();
    let server_path = temp.path().join("server.sock");
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(FileSystem::new(
        &TreeFsConfig::default(),
    ))));
    let server = Server::bind(&server_path, Arc::clone(&dispatcher), 1).unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve(async move {
        let _ = stop_rx.await;
    }));

    // A valid command padded past the limit must not run as its prefix.
    let mut request = b"c /x d".to_vec();
    request.resize(treefs::server::MAX_REQUEST_LEN + 44, b' ');
    let raw = tokio::net::UnixDatagram::bind(temp.path().join("raw.sock")).unwrap();
    raw.send_to(&request, &server_path).await.unwrap();
    let mut buf = [0u8; 4];
    let len = raw.recv(&mut buf).await.unwrap();
    assert_eq!(len, 4);
    assert_eq!(i32::from_le_bytes(buf), treefs::dispatch::BAD_REQUEST);
    assert_eq!(dispatcher.fs().lookup("/x"), Err(FsError::NotFound));

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
