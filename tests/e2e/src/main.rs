fn main() {
    println!("Run `cargo test -p e2e` to execute the end-to-end tests.");
}

#[cfg(test)]
mod certs;

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use rustls::pki_types::ServerName;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio_rustls::TlsConnector;
    use tokio_util::sync::CancellationToken;

    use dropgate_identity::{TlsPaths, client_config};
    use dropgate_protocol::{StatusCode, UploadFrame, read_reply, write_frame};
    use dropgate_receiver::{Receiver, ReceiverConfig};
    use dropgate_sender::{Sender, SenderConfig, UploadError, session};
    use dropgate_transfer::digest_bytes;

    use crate::certs::TestCa;

    async fn start_receiver(
        ca: &TestCa,
        dir: &Path,
        allow: &[&str],
    ) -> (Arc<Receiver>, tokio::task::JoinHandle<()>, u16, PathBuf) {
        let storage_root = dir.join("storage");
        let config = ReceiverConfig {
            port: 0,
            storage_root: storage_root.clone(),
            tls: ca.issue(dir, "Receiver"),
            allowed_senders: allow.iter().map(|s| s.to_string()).collect(),
        };

        let receiver = Receiver::new(config).unwrap();
        let runner = Arc::clone(&receiver);
        let handle = tokio::spawn(async move {
            runner.run().await.unwrap();
        });

        let port = loop {
            if let Some(addr) = receiver.local_addr().await {
                break addr.port();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        };

        (receiver, handle, port, storage_root)
    }

    async fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        cond()
    }

    fn connector(paths: &TlsPaths) -> TlsConnector {
        TlsConnector::from(Arc::new(client_config(paths).unwrap()))
    }

    fn localhost() -> ServerName<'static> {
        ServerName::try_from("localhost".to_string()).unwrap()
    }

    fn sender_config(
        host: String,
        folder: PathBuf,
        tls: TlsPaths,
        parallel: usize,
    ) -> SenderConfig {
        SenderConfig {
            host,
            monitor_folder: folder,
            poll_interval: Duration::from_millis(200),
            tls,
            parallel_uploads: parallel,
            chunk_size: 4,
        }
    }

    #[tokio::test]
    async fn mirrors_file_and_deletes_source() {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new();
        let (receiver, recv_handle, port, storage) =
            start_receiver(&ca, dir.path(), &["Alice"]).await;

        let outbox = dir.path().join("outbox");
        std::fs::create_dir_all(outbox.join("notes")).unwrap();
        let source = outbox.join("notes/todo.txt");
        std::fs::write(&source, b"buy milk").unwrap();

        let alice = ca.issue(dir.path(), "Alice");
        let sender = Sender::new(sender_config(
            format!("localhost:{port}"),
            outbox.clone(),
            alice,
            4,
        ))
        .unwrap();

        let cancel = CancellationToken::new();
        let sender_cancel = cancel.clone();
        let send_handle = tokio::spawn(async move {
            sender.run(sender_cancel).await.unwrap();
        });

        let stored = storage.join("Alice/notes/todo.txt");
        assert!(
            wait_until(
                || stored.exists() && !source.exists(),
                Duration::from_secs(5)
            )
            .await,
            "upload did not complete"
        );
        assert_eq!(std::fs::read(&stored).unwrap(), b"buy milk");

        cancel.cancel();
        send_handle.await.unwrap();
        receiver.shutdown();
        recv_handle.await.unwrap();
    }

    #[tokio::test]
    async fn worker_pool_of_one_uploads_everything() {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new();
        let (receiver, recv_handle, port, storage) =
            start_receiver(&ca, dir.path(), &["Alice"]).await;

        let outbox = dir.path().join("outbox");
        std::fs::create_dir_all(&outbox).unwrap();
        std::fs::write(outbox.join("a.txt"), b"contents of a").unwrap();
        std::fs::write(outbox.join("b.txt"), b"contents of b").unwrap();

        let alice = ca.issue(dir.path(), "Alice");
        let sender = Sender::new(sender_config(
            format!("localhost:{port}"),
            outbox.clone(),
            alice,
            1,
        ))
        .unwrap();

        let cancel = CancellationToken::new();
        let sender_cancel = cancel.clone();
        let send_handle = tokio::spawn(async move {
            sender.run(sender_cancel).await.unwrap();
        });

        let stored_a = storage.join("Alice/a.txt");
        let stored_b = storage.join("Alice/b.txt");
        assert!(
            wait_until(
                || {
                    stored_a.exists()
                        && stored_b.exists()
                        && !outbox.join("a.txt").exists()
                        && !outbox.join("b.txt").exists()
                },
                Duration::from_secs(5)
            )
            .await,
            "both files should be mirrored and removed locally"
        );
        assert_eq!(std::fs::read(&stored_a).unwrap(), b"contents of a");
        assert_eq!(std::fs::read(&stored_b).unwrap(), b"contents of b");

        cancel.cancel();
        send_handle.await.unwrap();
        receiver.shutdown();
        recv_handle.await.unwrap();
    }

    #[tokio::test]
    async fn disallowed_identity_rejected_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new();
        let (receiver, recv_handle, port, storage) =
            start_receiver(&ca, dir.path(), &["Alice"]).await;

        let mallory = ca.issue(dir.path(), "Mallory");
        let source = dir.path().join("secret.txt");
        std::fs::write(&source, b"payload").unwrap();

        let result = session::upload_file(
            &connector(&mallory),
            &format!("127.0.0.1:{port}"),
            localhost(),
            &source,
            "secret.txt",
            4,
        )
        .await;

        match result {
            Err(UploadError::Rejected { code, .. }) => {
                assert_eq!(code, StatusCode::Unauthenticated);
            }
            // The receiver may hang up before the whole stream is
            // written; any failure is acceptable as long as nothing
            // lands in storage.
            Err(_) => {}
            Ok(()) => panic!("upload from a disallowed identity must fail"),
        }

        let entries: Vec<_> = std::fs::read_dir(&storage).unwrap().collect();
        assert!(entries.is_empty(), "storage should stay empty");

        receiver.shutdown();
        recv_handle.await.unwrap();
    }

    #[tokio::test]
    async fn hash_mismatch_is_data_loss_with_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new();
        let (receiver, recv_handle, port, storage) =
            start_receiver(&ca, dir.path(), &["Alice"]).await;

        let alice = ca.issue(dir.path(), "Alice");
        let tcp = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut tls = connector(&alice).connect(localhost(), tcp).await.unwrap();

        write_frame(&mut tls, &UploadFrame::Name("greeting.txt".into()))
            .await
            .unwrap();
        write_frame(&mut tls, &UploadFrame::Chunk(b"hello world".to_vec()))
            .await
            .unwrap();
        write_frame(&mut tls, &UploadFrame::Hash(digest_bytes(b"hello")))
            .await
            .unwrap();
        tls.flush().await.unwrap();

        let reply = read_reply(&mut tls).await.unwrap();
        assert_eq!(reply.code, StatusCode::DataLoss);
        assert!(!storage.join("Alice/greeting.txt").exists());

        receiver.shutdown();
        recv_handle.await.unwrap();
    }

    #[tokio::test]
    async fn wrong_first_frame_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new();
        let (receiver, recv_handle, port, storage) =
            start_receiver(&ca, dir.path(), &["Alice"]).await;

        let alice = ca.issue(dir.path(), "Alice");
        let tcp = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut tls = connector(&alice).connect(localhost(), tcp).await.unwrap();

        write_frame(&mut tls, &UploadFrame::Chunk(b"orphan chunk".to_vec()))
            .await
            .unwrap();
        tls.flush().await.unwrap();

        let reply = read_reply(&mut tls).await.unwrap();
        assert_eq!(reply.code, StatusCode::InvalidArgument);

        let entries: Vec<_> = std::fs::read_dir(&storage).unwrap().collect();
        assert!(entries.is_empty(), "no destination file may be created");

        receiver.shutdown();
        recv_handle.await.unwrap();
    }

    #[tokio::test]
    async fn chunk_size_does_not_change_stored_content() {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new();
        let (receiver, recv_handle, port, storage) =
            start_receiver(&ca, dir.path(), &["Alice"]).await;

        let alice = ca.issue(dir.path(), "Alice");
        let conn = connector(&alice);
        let addr = format!("127.0.0.1:{port}");

        let content: Vec<u8> = (0..=255u8).cycle().take(2000).collect();
        let source = dir.path().join("pattern.bin");
        std::fs::write(&source, &content).unwrap();

        for chunk_size in [1usize, 3, 64, 1999, 2000, 100_000] {
            let name = format!("inv/{chunk_size}.bin");
            session::upload_file(&conn, &addr, localhost(), &source, &name, chunk_size)
                .await
                .unwrap_or_else(|e| panic!("chunk size {chunk_size}: {e}"));

            let stored = std::fs::read(storage.join("Alice").join(&name)).unwrap();
            assert_eq!(stored, content, "chunk size {chunk_size}");
        }

        receiver.shutdown();
        recv_handle.await.unwrap();
    }

    #[tokio::test]
    async fn failed_uploads_leave_source_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let ca = TestCa::new();

        let outbox = dir.path().join("outbox");
        std::fs::create_dir_all(&outbox).unwrap();
        let source = outbox.join("stuck.txt");
        std::fs::write(&source, b"cannot leave yet").unwrap();

        // Nothing listens on this port; every upload attempt fails.
        let alice = ca.issue(dir.path(), "Alice");
        let sender =
            Sender::new(sender_config("127.0.0.1:9".into(), outbox.clone(), alice, 2)).unwrap();

        let cancel = CancellationToken::new();
        let sender_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            sender.run(sender_cancel).await.unwrap();
        });

        // A few scan cycles' worth of failures.
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(source.exists(), "failed upload must not delete the source");

        cancel.cancel();
        handle.await.unwrap();
    }
}
