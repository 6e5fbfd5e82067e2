//! # Connection Lifecycle Flows
//!
//! Connect, disconnect, oversized frames, wrong routes and shutdown.

#[cfg(test)]
mod tests {
    use crate::harness::{bus_message, next_frame, next_text, send_text, TestBus};
    use futures_util::SinkExt;
    use ovos_bus_server::{BusConfig, SHUTDOWN_REASON};
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::Message;

    #[tokio::test]
    async fn test_disconnect_removes_client() {
        let bus = TestBus::start().await;
        let mut leaving = bus.connect().await;
        let mut staying = bus.connect().await;

        leaving.close(None).await.unwrap();
        bus.wait_for_clients(1).await;

        let message = bus_message("still.here", "");
        send_text(&mut staying, &message).await;
        assert_eq!(next_text(&mut staying).await, message);

        let stats = bus.hub.stats();
        assert_eq!(stats.connections_total, 2);
        assert_eq!(stats.disconnects, 1);
        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_connection_removes_client() {
        let bus = TestBus::start().await;
        let client = bus.connect().await;

        drop(client);
        bus.wait_for_clients(0).await;
        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_clients_listing_has_peer_addresses() {
        let bus = TestBus::start().await;
        let _a = bus.connect().await;
        let _b = bus.connect().await;

        let clients = bus.hub.clients();
        assert_eq!(clients.len(), 2);
        assert!(clients[0].id < clients[1].id);
        for client in clients {
            let peer = client.peer.expect("peer address");
            assert!(peer.ip().is_loopback());
        }
        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_message_closes_only_sender() {
        let config = BusConfig {
            max_msg_size: 1,
            ..BusConfig::default()
        };
        let bus = TestBus::start_with(config).await;
        let mut offender = bus.connect().await;
        let mut bystander = bus.connect().await;

        let oversized = "x".repeat(2 * 1024 * 1024);
        // The server may reset the connection while the frame is in flight.
        let _ = offender.send(Message::text(oversized)).await;

        match next_frame(&mut offender).await {
            None | Some(Message::Close(_)) => {}
            other => panic!("expected the connection to end, got {:?}", other),
        }
        bus.wait_for_clients(1).await;

        let message = bus_message("after.oversize", "");
        send_text(&mut bystander, &message).await;
        assert_eq!(next_text(&mut bystander).await, message);
        assert_eq!(bus.hub.stats().messages_published, 1);
        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_message_under_limit_is_delivered() {
        let config = BusConfig {
            max_msg_size: 1,
            ..BusConfig::default()
        };
        let bus = TestBus::start_with(config).await;
        let mut client = bus.connect().await;

        let payload = "y".repeat(512 * 1024);
        let message = bus_message("large.ok", &payload);
        send_text(&mut client, &message).await;

        assert_eq!(next_text(&mut client).await, message);
        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_path_is_rejected() {
        let bus = TestBus::start().await;
        let url = bus.url.replace("/core", "/other");

        assert!(bus.connect_url(&url).await.is_err());
        assert_eq!(bus.hub.client_count(), 0);
        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_route() {
        let config = BusConfig {
            route: "/bus".into(),
            ..BusConfig::default()
        };
        let bus = TestBus::start_with(config).await;
        assert!(bus.url.ends_with("/bus"));

        let mut client = bus.connect().await;
        send_text(&mut client, &bus_message("custom.route", "")).await;
        assert!(next_text(&mut client).await.contains("custom.route"));

        let default_route = bus.url.replace("/bus", "/core");
        assert!(bus.connect_url(&default_route).await.is_err());
        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_sends_close_frame() {
        let bus = TestBus::start().await;
        let mut first = bus.connect().await;
        let mut second = bus.connect().await;
        let hub = bus.hub.clone();

        let shutdown = tokio::spawn(bus.shutdown());

        for client in [&mut first, &mut second] {
            match next_frame(client).await {
                Some(Message::Close(Some(frame))) => {
                    assert_eq!(frame.code, CloseCode::Away);
                    assert_eq!(frame.reason.as_str(), SHUTDOWN_REASON);
                }
                other => panic!("expected close frame, got {:?}", other),
            }
        }

        shutdown.await.unwrap().unwrap();
        assert!(hub.is_closed());
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_clients() {
        let bus = TestBus::start().await;
        let hub = bus.hub.clone();

        bus.shutdown().await.unwrap();
        assert!(hub.is_closed());
        assert_eq!(hub.stats().connections_total, 0);
    }
}
