use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::Code;
use tonic::Status;

use super::*;
use crate::cache::Cache;
use crate::cache::CacheTarget;
use crate::cache::TargetCache;
use crate::proto::gnmi::subscribe_request::Request;
use crate::proto::gnmi::subscribe_response::Response;
use crate::proto::gnmi::subscription_list::Mode;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::Poll;
use crate::proto::gnmi::SubscribeRequest;
use crate::proto::gnmi::Subscription;
use crate::proto::gnmi::SubscriptionList;
use crate::proto::gnmi::TypedValue;
use crate::test_utils::path;
use crate::test_utils::update;
use crate::test_utils::TARGET;

const MTU: &str = "/interfaces/interface[name=eth0]/state/mtu";
const HOSTNAME: &str = "/system/state/hostname";

fn server(buffer: usize) -> (Arc<SubscribeServer>, Arc<CacheTarget>, CancellationToken) {
    let cache = Cache::new(&[TARGET]);
    let target = cache.get_target(TARGET).unwrap();
    let cancel = CancellationToken::new();
    let server = Arc::new(SubscribeServer::new(
        TARGET.to_string(),
        target.clone(),
        buffer,
        cancel.clone(),
    ));
    let fanout = server.clone();
    cache.set_client(move |n| fanout.update(n));
    (server, target, cancel)
}

fn subscription(
    mode: Mode,
    paths: &[&str],
) -> SubscriptionList {
    SubscriptionList {
        prefix: Some(Path {
            target: TARGET.to_string(),
            ..Default::default()
        }),
        subscription: paths
            .iter()
            .map(|p| Subscription {
                path: Some(path(p)),
                ..Default::default()
            })
            .collect(),
        mode: mode as i32,
        ..Default::default()
    }
}

fn request(list: SubscriptionList) -> SubscribeRequest {
    SubscribeRequest {
        request: Some(Request::Subscribe(list)),
    }
}

fn requests(
    list: SubscriptionList
) -> impl futures::Stream<Item = Result<SubscribeRequest, Status>> + Send + Unpin + 'static {
    stream::iter(vec![Ok(request(list))])
}

fn delta(
    timestamp: i64,
    updates: Vec<crate::proto::gnmi::Update>,
    deletes: Vec<&str>,
) -> Notification {
    Notification {
        timestamp,
        update: updates,
        delete: deletes.into_iter().map(path).collect(),
        ..Default::default()
    }
}

async fn next(stream: &mut SubscribeStream) -> Response {
    let item = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("response in time")
        .expect("stream still open");
    item.expect("response is not an error").response.unwrap()
}

fn update_paths(response: &Response) -> Vec<String> {
    match response {
        Response::Update(n) => n.update.iter().map(|u| u.path.as_ref().unwrap().to_string()).collect(),
        other => panic!("expected an update, got {other:?}"),
    }
}

#[tokio::test]
async fn test_once_dumps_matching_leaves_then_syncs_and_ends() {
    let (server, target, _cancel) = server(16);
    target
        .apply_delta(delta(
            1,
            vec![
                update(MTU, TypedValue::uint(1500)),
                update(HOSTNAME, TypedValue::string("r1")),
            ],
            vec![],
        ))
        .unwrap();

    let mut stream = server
        .subscribe(requests(subscription(Mode::Once, &["/interfaces"])))
        .await
        .unwrap();

    let first = next(&mut stream).await;
    assert_eq!(update_paths(&first), vec![MTU]);
    if let Response::Update(n) = &first {
        assert_eq!(n.timestamp, 1);
        assert_eq!(n.prefix.as_ref().unwrap().target, TARGET);
    }
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_empty_subscription_list_covers_the_prefix() {
    let (server, target, _cancel) = server(16);
    target
        .apply_delta(delta(1, vec![update(HOSTNAME, TypedValue::string("r1"))], vec![]))
        .unwrap();

    let mut list = subscription(Mode::Once, &[]);
    list.prefix.as_mut().unwrap().elem = path("/system").elem;
    let mut stream = server.subscribe(requests(list)).await.unwrap();

    assert_eq!(update_paths(&next(&mut stream).await), vec![HOSTNAME]);
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));
}

#[tokio::test]
async fn test_wildcard_target_is_accepted() {
    let (server, _target, _cancel) = server(16);
    let mut list = subscription(Mode::Once, &["/interfaces"]);
    list.prefix.as_mut().unwrap().target = "*".to_string();

    let mut stream = server.subscribe(requests(list)).await.unwrap();
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let (server, _target, _cancel) = server(16);
    let mut list = subscription(Mode::Once, &["/interfaces"]);
    list.prefix.as_mut().unwrap().target = "other".to_string();

    let status = server.subscribe(requests(list)).await.err().unwrap();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_first_message_must_be_a_subscription_list() {
    let (server, _target, _cancel) = server(16);
    let poll = stream::iter(vec![Ok(SubscribeRequest {
        request: Some(Request::Poll(Poll {})),
    })]);

    let status = server.subscribe(poll).await.err().unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);

    let empty = stream::iter(Vec::<Result<SubscribeRequest, Status>>::new());
    let status = server.subscribe(empty).await.err().unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_unknown_mode_is_rejected() {
    let (server, _target, _cancel) = server(16);
    let mut list = subscription(Mode::Once, &["/interfaces"]);
    list.mode = 42;

    let status = server.subscribe(requests(list)).await.err().unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_stream_forwards_only_matching_changes() {
    let (server, target, _cancel) = server(16);
    target
        .apply_delta(delta(1, vec![update(MTU, TypedValue::uint(1500))], vec![]))
        .unwrap();

    let mut stream = server
        .subscribe(requests(subscription(Mode::Stream, &["/interfaces/interface[name=*]/state"])))
        .await
        .unwrap();
    assert_eq!(update_paths(&next(&mut stream).await), vec![MTU]);
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));

    target
        .apply_delta(delta(
            2,
            vec![
                update(HOSTNAME, TypedValue::string("r1")),
                update(MTU, TypedValue::uint(9000)),
            ],
            vec![],
        ))
        .unwrap();
    let change = next(&mut stream).await;
    assert_eq!(update_paths(&change), vec![MTU]);

    target
        .apply_delta(delta(3, vec![], vec!["/interfaces/interface[name=eth0]"]))
        .unwrap();
    match next(&mut stream).await {
        Response::Update(n) => {
            assert!(n.update.is_empty());
            assert_eq!(n.delete, vec![path(MTU)]);
            assert_eq!(n.timestamp, 3);
        }
        other => panic!("expected a delete, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_updates_only_skips_the_initial_dump() {
    let (server, target, _cancel) = server(16);
    target
        .apply_delta(delta(1, vec![update(MTU, TypedValue::uint(1500))], vec![]))
        .unwrap();

    let mut list = subscription(Mode::Stream, &["/interfaces"]);
    list.updates_only = true;
    let mut stream = server.subscribe(requests(list)).await.unwrap();
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));

    target
        .apply_delta(delta(2, vec![update(MTU, TypedValue::uint(9000))], vec![]))
        .unwrap();
    assert_eq!(update_paths(&next(&mut stream).await), vec![MTU]);
}

#[tokio::test]
async fn test_stream_ends_when_cancelled() {
    let (server, _target, cancel) = server(16);
    let mut stream = server
        .subscribe(requests(subscription(Mode::Stream, &["/interfaces"])))
        .await
        .unwrap();
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));

    cancel.cancel();
    let end = tokio::time::timeout(Duration::from_secs(1), stream.next()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn test_lagging_stream_is_resource_exhausted() {
    let (server, target, _cancel) = server(1);
    let mut stream = server
        .subscribe(requests(subscription(Mode::Stream, &["/interfaces"])))
        .await
        .unwrap();
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));

    for ts in 1..=3 {
        target
            .apply_delta(delta(ts, vec![update(MTU, TypedValue::uint(1500 + ts as u64))], vec![]))
            .unwrap();
    }

    let status = loop {
        match stream.next().await {
            Some(Ok(_)) => continue,
            Some(Err(status)) => break status,
            None => panic!("stream ended without an error"),
        }
    };
    assert_eq!(status.code(), Code::ResourceExhausted);
}

#[tokio::test]
async fn test_poll_answers_each_poll_with_a_fresh_dump() {
    let (server, target, _cancel) = server(16);
    let (tx, rx) = mpsc::channel(4);
    tx.send(Ok(request(subscription(Mode::Poll, &["/interfaces"]))))
        .await
        .unwrap();

    let mut stream = server.subscribe(ReceiverStream::new(rx)).await.unwrap();
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));

    target
        .apply_delta(delta(1, vec![update(MTU, TypedValue::uint(1500))], vec![]))
        .unwrap();
    tx.send(Ok(SubscribeRequest {
        request: Some(Request::Poll(Poll {})),
    }))
    .await
    .unwrap();

    assert_eq!(update_paths(&next(&mut stream).await), vec![MTU]);
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));

    drop(tx);
    let end = tokio::time::timeout(Duration::from_secs(1), stream.next()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn test_poll_rejects_a_second_subscription_list() {
    let (server, _target, _cancel) = server(16);
    let (tx, rx) = mpsc::channel(4);
    tx.send(Ok(request(subscription(Mode::Poll, &["/interfaces"]))))
        .await
        .unwrap();
    let mut stream = server.subscribe(ReceiverStream::new(rx)).await.unwrap();
    assert_eq!(next(&mut stream).await, Response::SyncResponse(true));

    tx.send(Ok(request(subscription(Mode::Poll, &["/system"]))))
        .await
        .unwrap();
    let item = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.unwrap_err().code(), Code::InvalidArgument);
}
