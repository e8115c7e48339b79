mod common;

use std::time::Duration;

use common::path;
use common::target_prefix;
use common::TestCollector;
use common::TARGET;
use futures::StreamExt;
use gnmi_collector::proto::gnmi::subscribe_request::Request;
use gnmi_collector::proto::gnmi::subscribe_response::Response;
use gnmi_collector::proto::gnmi::subscription_list::Mode;
use gnmi_collector::proto::gnmi::update_result::Operation;
use gnmi_collector::proto::gnmi::CapabilityRequest;
use gnmi_collector::proto::gnmi::GetRequest;
use gnmi_collector::proto::gnmi::Notification;
use gnmi_collector::proto::gnmi::SetRequest;
use gnmi_collector::proto::gnmi::SubscribeRequest;
use gnmi_collector::proto::gnmi::SubscribeResponse;
use gnmi_collector::proto::gnmi::Subscription;
use gnmi_collector::proto::gnmi::SubscriptionList;
use gnmi_collector::proto::gnmi::TypedValue;
use gnmi_collector::proto::gnmi::Update;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Code;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

const ETH0_STATE: &str = "/interfaces/interface[name=eth0]/state";

fn subscribe_request(
    mode: Mode,
    paths: &[&str],
) -> SubscribeRequest {
    SubscribeRequest {
        request: Some(Request::Subscribe(SubscriptionList {
            prefix: target_prefix(),
            subscription: paths
                .iter()
                .map(|p| Subscription {
                    path: Some(path(p)),
                    ..Default::default()
                })
                .collect(),
            mode: mode as i32,
            ..Default::default()
        })),
    }
}

fn eth0_state_set() -> SetRequest {
    SetRequest {
        prefix: target_prefix(),
        update: vec![Update::new(
            path(ETH0_STATE),
            TypedValue::json_ietf(&json!({ "description": "uplink", "mtu": 1500 })),
        )],
        ..Default::default()
    }
}

fn leaf_paths(notifications: &[Notification]) -> Vec<String> {
    notifications
        .iter()
        .flat_map(|n| n.update.iter())
        .map(|u| u.path.as_ref().unwrap().to_string())
        .collect()
}

async fn collect_once(
    stream: &mut tonic::Streaming<SubscribeResponse>
) -> (Vec<Notification>, bool) {
    let mut updates = Vec::new();
    while let Some(resp) = stream.next().await {
        match resp.unwrap().response.unwrap() {
            Response::Update(n) => updates.push(n),
            Response::SyncResponse(synced) => return (updates, synced),
            Response::Error(e) => panic!("unexpected error {e:?}"),
        }
    }
    (updates, false)
}

#[tokio::test]
async fn test_set_is_mirrored_and_visible_to_once_subscription() {
    let collector = TestCollector::start(true).await;
    let mut client = collector.client().await;

    let resp = client.set(eth0_state_set()).await.unwrap().into_inner();
    assert_eq!(resp.response.len(), 1);
    assert_eq!(resp.response[0].op, Operation::Update as i32);
    assert!(resp.timestamp > 0);

    let requests = futures::stream::iter(vec![subscribe_request(Mode::Once, &["/interfaces"])]);
    let mut stream = client.subscribe(requests).await.unwrap().into_inner();
    let (updates, synced) = collect_once(&mut stream).await;

    assert!(synced);
    assert_eq!(
        leaf_paths(&updates),
        vec![
            "/interfaces/interface[name=eth0]/config/description",
            "/interfaces/interface[name=eth0]/config/mtu",
            "/interfaces/interface[name=eth0]/state/description",
            "/interfaces/interface[name=eth0]/state/mtu",
        ]
    );
    assert!(updates.iter().all(|n| n.timestamp == resp.timestamp));
    assert!(updates.iter().all(|n| n.prefix.as_ref().unwrap().target == TARGET));

    collector.stop().await;
}

#[tokio::test]
async fn test_rejected_set_changes_nothing() {
    let collector = TestCollector::start(true).await;
    let mut client = collector.client().await;
    client.set(eth0_state_set()).await.unwrap();

    let bad = SetRequest {
        prefix: target_prefix(),
        update: vec![
            Update::new(path("/system/state/hostname"), TypedValue::string("r1")),
            Update::new(path(&format!("{ETH0_STATE}/mtu")), TypedValue::uint(10)),
        ],
        ..Default::default()
    };
    let status = client.set(bad).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let missing = client
        .get(GetRequest {
            prefix: target_prefix(),
            path: vec![path("/system")],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(missing.code(), Code::NotFound);

    let mtu = client
        .get(GetRequest {
            prefix: target_prefix(),
            path: vec![path(&format!("{ETH0_STATE}/mtu"))],
            ..Default::default()
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(mtu.notification.len(), 1);
    assert_eq!(mtu.notification[0].update[0].val, Some(TypedValue::uint(1500)));

    collector.stop().await;
}

#[tokio::test]
async fn test_replace_and_delete_through_grpc() {
    let collector = TestCollector::start(true).await;
    let mut client = collector.client().await;
    client.set(eth0_state_set()).await.unwrap();

    let replace = SetRequest {
        prefix: target_prefix(),
        delete: vec![path("/interfaces/interface[name=eth0]/state/description")],
        replace: vec![Update::new(
            path("/system/state"),
            TypedValue::json_ietf(&json!({ "hostname": "r1" })),
        )],
        ..Default::default()
    };
    let resp = client.set(replace).await.unwrap().into_inner();
    let ops: Vec<i32> = resp.response.iter().map(|r| r.op).collect();
    assert_eq!(ops, vec![Operation::Delete as i32, Operation::Replace as i32]);

    let got = client
        .get(GetRequest {
            prefix: target_prefix(),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(
        leaf_paths(&got.notification),
        vec![
            "/interfaces/interface[name=eth0]/config/mtu",
            "/interfaces/interface[name=eth0]/state/mtu",
            "/system/config/hostname",
            "/system/state/hostname",
        ]
    );

    collector.stop().await;
}

#[tokio::test]
async fn test_stream_subscription_sees_ingested_updates() {
    let collector = TestCollector::start(false).await;
    let mut client = collector.client().await;

    let (tx, rx) = mpsc::channel(4);
    tx.send(subscribe_request(Mode::Stream, &[ETH0_STATE])).await.unwrap();
    let mut stream = client.subscribe(ReceiverStream::new(rx)).await.unwrap().into_inner();

    let (initial, synced) = tokio::time::timeout(Duration::from_secs(2), async {
        let resp = stream.next().await.unwrap().unwrap();
        match resp.response.unwrap() {
            Response::SyncResponse(synced) => (Vec::<Notification>::new(), synced),
            other => panic!("expected sync first, got {other:?}"),
        }
    })
    .await
    .unwrap();
    assert!(initial.is_empty());
    assert!(synced);

    collector
        .collector
        .target_update(SubscribeResponse {
            response: Some(Response::Update(Notification {
                timestamp: 42,
                update: vec![
                    Update::new(path(&format!("{ETH0_STATE}/oper-status")), TypedValue::string("UP")),
                    Update::new(path("/system/state/hostname"), TypedValue::string("r1")),
                ],
                ..Default::default()
            })),
        })
        .await
        .unwrap();

    let resp = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match resp.response.unwrap() {
        Response::Update(n) => {
            assert_eq!(n.timestamp, 42);
            assert_eq!(
                leaf_paths(&[n]),
                vec!["/interfaces/interface[name=eth0]/state/oper-status"]
            );
        }
        other => panic!("expected an update, got {other:?}"),
    }

    drop(tx);
    collector.stop().await;
}

#[tokio::test]
async fn test_capabilities_list_schema_models() {
    let collector = TestCollector::start(true).await;
    let mut client = collector.client().await;

    let caps = client.capabilities(CapabilityRequest {}).await.unwrap().into_inner();
    let names: Vec<&str> = caps.supported_models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["openconfig-interfaces", "openconfig-system"]);
    assert!(!caps.supported_encodings.is_empty());
    assert!(!caps.gnmi_version.is_empty());

    collector.stop().await;
}

#[tokio::test]
async fn test_set_without_schema_is_unimplemented() {
    let collector = TestCollector::start(false).await;
    let mut client = collector.client().await;

    let status = client.set(eth0_state_set()).await.unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);

    collector.stop().await;
}

#[tokio::test]
async fn test_health_service_reports_serving() {
    let collector = TestCollector::start(false).await;
    let channel = tonic::transport::Endpoint::from_shared(format!("http://{}", collector.addr()))
        .unwrap()
        .connect()
        .await
        .unwrap();
    let mut health = HealthClient::new(channel);

    let resp = health
        .check(HealthCheckRequest {
            service: "gnmi.gNMI".to_string(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.status, ServingStatus::Serving as i32);

    collector.stop().await;
}
