//! Streaming behaviour of the chat relay: ordering, ceilings, faults and
//! cancellation.

use futures::StreamExt;
use homekey_domain::{Conversation, Message};
use homekey_llm::mock::{Ending, Script};
use homekey_llm::MockModel;
use homekey_relay::{ChatRelay, RelayError};
use std::sync::Arc;
use std::time::{Duration, Instant};

const CONTEXT: &str = "Property: Royal Orchid";

fn ask(text: &str) -> Conversation {
    Conversation::from(vec![Message::user(text)])
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_order() {
    let model = MockModel::default();
    let delay = Duration::from_millis(5);
    model.add_response(
        "first",
        Script::new(["a1", "a2", "a3", "a4"]).with_delay(delay),
    );
    model.add_response(
        "second",
        Script::new(["b1", "b2", "b3", "b4"]).with_delay(delay),
    );
    let relay = Arc::new(ChatRelay::new(Arc::new(model.clone())));

    let run = |prompt: &'static str| {
        let relay = Arc::clone(&relay);
        tokio::spawn(async move {
            let stream = relay.relay(ask(prompt), CONTEXT).await.unwrap();
            stream.collect::<Vec<_>>().await
        })
    };

    let (first, second) = tokio::join!(run("first"), run("second"));

    let expect = |prefix: &str| -> Vec<Result<String, RelayError>> {
        (1..=4).map(|i| Ok(format!("{}{}", prefix, i))).collect()
    };
    assert_eq!(first.unwrap(), expect("a"));
    assert_eq!(second.unwrap(), expect("b"));
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn test_stalled_model_times_out_near_ceiling() {
    let ceiling = Duration::from_millis(150);
    let relay = ChatRelay::new(Arc::new(MockModel::stalling())).with_ceiling(ceiling);

    let started = Instant::now();
    let stream = relay.relay(ask("hello?"), CONTEXT).await.unwrap();
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items, vec![Err(RelayError::Timeout(ceiling))]);
    let elapsed = started.elapsed();
    assert!(elapsed >= ceiling);
    assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_partial_reply_then_timeout() {
    let model = MockModel::from_script(
        Script::new(["one", "two"])
            .with_delay(Duration::from_millis(20))
            .ending(Ending::Stall),
    );
    let relay = ChatRelay::new(Arc::new(model)).with_ceiling(Duration::from_millis(300));

    let items: Vec<_> = relay
        .relay(ask("count"), CONTEXT)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        items,
        vec![
            Ok("one".to_string()),
            Ok("two".to_string()),
            Err(RelayError::Timeout(Duration::from_millis(300))),
        ]
    );
}

#[tokio::test]
async fn test_fault_after_two_chunks() {
    let relay = ChatRelay::new(Arc::new(MockModel::failing_after(
        ["The price ", "is "],
        "connection reset by peer",
    )));

    let items: Vec<_> = relay
        .relay(ask("price?"), CONTEXT)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        items,
        vec![
            Ok("The price ".to_string()),
            Ok("is ".to_string()),
            Err(RelayError::UpstreamFailure(
                "connection reset by peer".to_string()
            )),
        ]
    );
}

#[tokio::test]
async fn test_dropping_stream_cancels_model() {
    let model = MockModel::from_script(Script::new(["first"]).ending(Ending::Stall));
    let relay = ChatRelay::new(Arc::new(model.clone()));

    let mut stream = relay.relay(ask("hi"), CONTEXT).await.unwrap();
    assert_eq!(stream.next().await, Some(Ok("first".to_string())));
    drop(stream);

    // the pump and then the mock producer both have to notice
    for _ in 0..100 {
        if model.cancellation_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(model.cancellation_count(), 1);
}

#[tokio::test]
async fn test_completed_stream_is_not_cancelled() {
    let model = MockModel::new(["done"]);
    let relay = ChatRelay::new(Arc::new(model.clone()));

    let items: Vec<_> = relay
        .relay(ask("hi"), CONTEXT)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items, vec![Ok("done".to_string())]);
    assert_eq!(model.cancellation_count(), 0);
}

#[tokio::test]
async fn test_slow_open_times_out_within_ceiling() {
    let ceiling = Duration::from_millis(100);
    let model = MockModel::slow_to_connect(Duration::from_secs(5));
    let relay = ChatRelay::new(Arc::new(model.clone())).with_ceiling(ceiling);

    let started = Instant::now();
    let result = relay.relay(ask("hello?"), CONTEXT).await;

    assert_eq!(result.err(), Some(RelayError::Timeout(ceiling)));
    let elapsed = started.elapsed();
    assert!(elapsed >= ceiling);
    assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_timeout_reaches_reader_with_full_buffer() {
    let ceiling = Duration::from_millis(100);
    let model = MockModel::from_script(Script::new(["a", "b", "c"]).ending(Ending::Stall));
    let relay = ChatRelay::new(Arc::new(model))
        .with_buffer(1)
        .with_ceiling(ceiling);

    let stream = relay.relay(ask("letters"), CONTEXT).await.unwrap();
    // reader falls behind until well past the ceiling
    tokio::time::sleep(Duration::from_millis(300)).await;
    let items: Vec<_> = stream.collect().await;

    assert_eq!(
        items,
        vec![Ok("a".to_string()), Err(RelayError::Timeout(ceiling))]
    );
}

#[tokio::test]
async fn test_fault_reaches_reader_with_full_buffer() {
    let model = MockModel::failing_after(["a"], "connection reset by peer");
    let relay = ChatRelay::new(Arc::new(model))
        .with_buffer(1)
        .with_ceiling(Duration::from_millis(100));

    let stream = relay.relay(ask("letters"), CONTEXT).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let items: Vec<_> = stream.collect().await;

    assert_eq!(
        items,
        vec![
            Ok("a".to_string()),
            Err(RelayError::UpstreamFailure(
                "connection reset by peer".to_string()
            )),
        ]
    );
}

#[tokio::test]
async fn test_fault_after_backpressure_keeps_every_chunk() {
    let model = MockModel::failing_after(["a", "b", "c"], "stream interrupted");
    let relay = ChatRelay::new(Arc::new(model)).with_buffer(1);

    let mut stream = relay.relay(ask("letters"), CONTEXT).await.unwrap();
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    assert_eq!(
        items,
        vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Ok("c".to_string()),
            Err(RelayError::UpstreamFailure("stream interrupted".to_string())),
        ]
    );
}
