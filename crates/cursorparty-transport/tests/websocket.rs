//! Integration tests for the WebSocket transport.
//!
//! These spin up a real WebSocket server and client to verify that frames
//! keep their shape (binary vs text) across the network and that a client
//! close surfaces as a clean end of stream.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;

    use std::time::Duration;

    use cursorparty_transport::{
        Connection, Frame, PendingConnection, Transport, TransportError,
        WebSocketConnection, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port, connects one client, and returns both
    /// ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("handshake should succeed")
        });

        let (client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");

        let server_conn = server_handle.await.expect("task should complete");
        (server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_websocket_binary_frames_both_directions() {
        let (server_conn, mut client_ws) = connected_pair().await;

        server_conn
            .send(Frame::Binary(b"hello from server".to_vec()))
            .await
            .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
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
        assert_eq!(received, Frame::Binary(b"hello from client".to_vec()));

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_keep_their_shape() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws
            .send(Message::Text("AAEC".to_string().into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, Frame::Text("AAEC".into()));

        server_conn
            .send(Frame::Text(r#"{"type":"Join","count":1}"#.into()))
            .await
            .unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"type":"Join","count":1}"#);
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_pending() {
        // The reader loop parks in recv() for the whole connection lifetime;
        // a concurrent writer must still get through.
        let (server_conn, mut client_ws) = connected_pair().await;
        let server_conn = Arc::new(server_conn);

        let reader = {
            let conn = Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        server_conn
            .send(Frame::Binary(vec![9, 9, 9]))
            .await
            .expect("send should not wait for recv");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), &[9, 9, 9]);

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = reader.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let (a, _ca) = connected_pair().await;
        let (b, _cb) = connected_pair().await;
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_accept_returns_before_handshake_so_idle_socket_blocks_nobody() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        // Connects but never sends the upgrade request.
        let idle = tokio::net::TcpStream::connect(addr)
            .await
            .expect("tcp connect");
        let stalled = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept must not wait for the handshake")
            .expect("should accept");
        assert_eq!(stalled.peer_addr(), idle.local_addr().unwrap());

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(format!("ws://{addr}")).await
        });
        let pending = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("second client accepted while the first idles")
            .expect("should accept");
        let _conn = pending.upgrade().await.expect("handshake should succeed");
        client.await.unwrap().expect("client should connect");

        // The idle one never finishes on its own.
        let still_waiting =
            tokio::time::timeout(Duration::from_millis(100), stalled.upgrade()).await;
        assert!(still_waiting.is_err());
    }

    #[tokio::test]
    async fn test_upgrade_non_websocket_request_returns_handshake_failed() {
        use tokio::io::AsyncWriteExt;

        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let mut raw = tokio::net::TcpStream::connect(addr)
            .await
            .expect("tcp connect");
        raw.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .expect("write request");

        let pending = transport.accept().await.expect("should accept");
        let result = pending.upgrade().await;
        assert!(matches!(result, Err(TransportError::HandshakeFailed(_))));
    }
}
