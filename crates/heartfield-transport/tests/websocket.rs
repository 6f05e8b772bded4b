//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client so bytes
//! actually cross a socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use heartfield_transport::{
        Connection, PendingConnection, Transport, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);
        assert!(server_conn.peer_addr().ip().is_loopback());

        server_conn
            .send(b"hello from server")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending_does_not_block() {
        // A broadcast must reach the client even while another task is
        // parked waiting for that client's next message.
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn =
            std::sync::Arc::new(server_handle.await.expect("accepted"));

        let reader = std::sync::Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::time::timeout(
            Duration::from_secs(1),
            server_conn.send(b"broadcast"),
        )
        .await
        .expect("send must not wait for the reader")
        .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"broadcast");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = pending.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_accept_returns_before_upgrade() {
        // An idle TCP peer is handed out without waiting for its upgrade
        // request, so the listener is free to take the next stream.
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let _idle = tokio::net::TcpStream::connect(addr).await.unwrap();
        let pending = tokio::time::timeout(
            Duration::from_secs(1),
            transport.accept(),
        )
        .await
        .expect("accept must not wait for the upgrade")
        .expect("should accept");
        assert!(pending.peer_addr().ip().is_loopback());

        let stalled =
            tokio::time::timeout(Duration::from_millis(100), pending.upgrade())
                .await;
        assert!(stalled.is_err(), "an idle peer never finishes the upgrade");
    }
}
