//! Session loop tests over a real loopback socket

use kiosk_core::{
    config::UdpConfig,
    models::{Customer, Device, DeviceStatus, Game, Setup},
};
use kiosk_db::{memory::Faults, InMemoryStore};
use kiosk_services::{RfidAuthorizationService, Stores};
use kiosk_udp::UdpServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MAC: &str = "AA:BB:CC:DD:EE:FF";

fn store() -> InMemoryStore {
    InMemoryStore::new()
        .with_customer(customer(1, "{RICH01}", 5, Some(10)))
        .with_customer(customer(2, "{POOR02}", 2, None))
        .with_customer(customer(3, "{DEBT03}", -1, None))
        .with_device(Device {
            id: 7,
            device_mac: MAC.to_string(),
            setup_id: Some(3),
            status: DeviceStatus::Active,
            center_code: "CENTER_1".to_string(),
        })
        .with_setup(Setup {
            id: 3,
            amount: 12,
            device_type: "ARCADE".to_string(),
            game_id: Some(9),
            center_code: "CENTER_1".to_string(),
        })
        .with_game(Game {
            id: 9,
            game_name: "Racer".to_string(),
            status: "ACTIVE".to_string(),
        })
}

fn customer(id: i32, rfid: &str, main: i32, bonus: Option<i32>) -> Customer {
    Customer {
        id,
        rfid: rfid.to_string(),
        name: format!("Customer {}", id),
        email: None,
        phone: None,
        balance_main: main,
        balance_bonus: bonus,
        center_code: "CENTER_1".to_string(),
    }
}

struct Harness {
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<kiosk_core::AppResult<()>>,
    store: Arc<InMemoryStore>,
}

async fn start(store: InMemoryStore) -> Harness {
    let store = Arc::new(store);
    let service = Arc::new(RfidAuthorizationService::new(Stores::from_backend(
        store.clone(),
    )));
    let config = UdpConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        drain_timeout_secs: 1,
        ..UdpConfig::default()
    };

    let server = UdpServer::bind(&config, service).await.unwrap();
    let addr = server.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(server.run(cancel.clone()));

    Harness {
        addr,
        cancel,
        handle,
        store,
    }
}

async fn exchange(addr: SocketAddr, payload: &[u8]) -> String {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(payload, addr).await.unwrap();

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .expect("no reply within 2s")
        .unwrap();
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[tokio::test]
async fn grant_reply_carries_post_debit_balance() {
    let h = start(store()).await;

    let reply = exchange(h.addr, format!("{{RICH01}}<{}>", MAC).as_bytes()).await;

    assert_eq!(reply, "(@0003)");
    assert_eq!(h.store.committed_records().len(), 1);
    h.cancel.cancel();
}

#[tokio::test]
async fn denial_reply_carries_current_balance() {
    let h = start(store()).await;

    assert_eq!(
        exchange(h.addr, format!("{{POOR02}}<{}>", MAC).as_bytes()).await,
        "<@002>"
    );
    assert_eq!(
        exchange(h.addr, format!("{{DEBT03}}<{}>", MAC).as_bytes()).await,
        "<@-001>"
    );
    assert_eq!(h.store.mutation_count(), 0);
    h.cancel.cancel();
}

#[tokio::test]
async fn garbage_never_reaches_the_store() {
    let h = start(store()).await;

    assert_eq!(exchange(h.addr, b"garbage").await, "@ERROR");
    assert_eq!(exchange(h.addr, b"{RICH01}<>").await, "@ERROR");
    assert_eq!(h.store.call_count(), 0);
    h.cancel.cancel();
}

#[tokio::test]
async fn unknown_device_gets_error() {
    let h = start(store()).await;

    assert_eq!(exchange(h.addr, b"{RICH01}<00:00:00:00:00:00>").await, "@ERROR");
    assert_eq!(h.store.mutation_count(), 0);
    h.cancel.cancel();
}

#[tokio::test]
async fn store_failures_get_error() {
    let h = start(store()).await;
    let request = format!("{{RICH01}}<{}>", MAC);

    h.store.set_faults(Faults {
        fail_append: true,
        ..Faults::default()
    });
    assert_eq!(exchange(h.addr, request.as_bytes()).await, "@ERROR");
    assert!(h.store.billing_records().is_empty());

    h.store.set_faults(Faults {
        unavailable: true,
        ..Faults::default()
    });
    assert_eq!(exchange(h.addr, request.as_bytes()).await, "@ERROR");

    h.store.set_faults(Faults::default());
    assert_eq!(exchange(h.addr, request.as_bytes()).await, "(@0003)");
    assert_eq!(h.store.customer(1).unwrap().balance_main, -1);
    h.cancel.cancel();
}

#[tokio::test]
async fn loop_survives_errors() {
    let h = start(store()).await;

    assert_eq!(exchange(h.addr, b"\xFF\xFE").await, "@ERROR");
    assert_eq!(
        exchange(h.addr, format!("{{POOR02}}<{}>", MAC).as_bytes()).await,
        "<@002>"
    );
    h.cancel.cancel();
}

#[tokio::test]
async fn cancellation_releases_the_port() {
    let h = start(store()).await;
    assert_eq!(exchange(h.addr, b"garbage").await, "@ERROR");

    h.cancel.cancel();
    tokio::time::timeout(Duration::from_secs(3), h.handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    UdpSocket::bind(h.addr)
        .await
        .expect("port should be free after shutdown");
}
