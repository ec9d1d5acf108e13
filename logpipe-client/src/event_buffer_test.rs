#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use logpipe_core::event::LogEvent;

#[cfg(test)]
use crate::batch::{EVENT_PADDING_BYTES, MAX_BATCH_SIZE_BYTES, MAX_BATCH_SIZE_EVENTS};
#[cfg(test)]
use crate::event_buffer::EventBuffer;

#[cfg(test)]
fn event(message: impl Into<String>) -> LogEvent {
    LogEvent::new(message, 0)
}

/// Every drained batch stays under the byte ceiling, and events come back
/// in order, none split or duplicated.
#[tokio::test]
async fn sealed_batches_respect_byte_ceiling() {
    let buffer = EventBuffer::new();

    // 16 of these fit in one batch; the 17th would push it over the limit.
    let message = "x".repeat(65_000);
    for index in 0..40 {
        buffer.add(event(format!("{index}-{message}"))).await;
    }

    let mut drained = Vec::new();
    loop {
        let batch = buffer.drain().await;
        if batch.is_empty() {
            break;
        }
        let size: usize = batch
            .iter()
            .map(|event| event.message.len() + EVENT_PADDING_BYTES)
            .sum();
        assert!(size <= MAX_BATCH_SIZE_BYTES);
        drained.push(batch);
    }

    assert_eq!(
        drained.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![16, 16, 8]
    );
    let flattened: Vec<_> = drained.concat();
    for (index, event) in flattened.iter().enumerate() {
        assert!(event.message.starts_with(&format!("{index}-")));
    }
}

/// The event-count ceiling seals a batch even when its bytes are tiny.
#[tokio::test]
async fn sealed_batches_respect_event_count_ceiling() {
    let buffer = EventBuffer::new();
    for _ in 0..MAX_BATCH_SIZE_EVENTS + 1 {
        buffer.add(event("x")).await;
    }

    assert_eq!(buffer.drain().await.len(), MAX_BATCH_SIZE_EVENTS);
    assert_eq!(buffer.drain().await.len(), 1);
    assert!(buffer.drain().await.is_empty());
}

#[tokio::test]
async fn events_drain_in_fifo_order() {
    let buffer = EventBuffer::new();
    for index in 0..100 {
        buffer.add(event(format!("line-{index}\n"))).await;
    }

    let drained = buffer.drain().await;
    let expected: Vec<_> = (0..100).map(|index| format!("line-{index}\n")).collect();
    assert_eq!(
        drained.iter().map(|event| event.message.clone()).collect::<Vec<_>>(),
        expected
    );
}

/// Draining until empty yields every added event exactly once, and each
/// producer's events keep their relative order.
#[tokio::test]
async fn concurrent_adds_drain_exactly_once() {
    let buffer = Arc::new(EventBuffer::new());

    let mut tasks = Vec::new();
    for producer in 0..4 {
        let buffer = Arc::clone(&buffer);
        tasks.push(tokio::spawn(async move {
            for index in 0..250 {
                buffer.add(event(format!("{producer}:{index}"))).await;
            }
        }));
    }
    for task in tasks {
        task.await.expect("producer task");
    }

    let mut positions: Vec<Vec<usize>> = vec![Vec::new(); 4];
    let mut total = 0;
    loop {
        let batch = buffer.drain().await;
        if batch.is_empty() {
            break;
        }
        for event in batch {
            let (producer, index) = event.message.split_once(':').expect("message shape");
            let producer: usize = producer.parse().expect("producer id");
            let index: usize = index.parse().expect("event index");
            positions[producer].push(index);
            total += 1;
        }
    }

    assert_eq!(total, 1000);
    for per_producer in positions {
        assert_eq!(per_producer, (0..250).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn empty_messages_are_dropped() {
    let buffer = EventBuffer::new();
    buffer.add(event("")).await;
    assert!(!buffer.has_pending().await);
    assert!(buffer.drain().await.is_empty());
}

/// A single event that can never fit a batch is dropped instead of
/// wedging the splitter.
#[tokio::test]
async fn oversized_single_event_is_dropped() {
    let buffer = EventBuffer::new();
    let too_big = "x".repeat(MAX_BATCH_SIZE_BYTES - EVENT_PADDING_BYTES + 1);
    buffer.add(event(too_big)).await;
    assert!(!buffer.has_pending().await);
    assert!(buffer.drain().await.is_empty());
}

#[tokio::test]
async fn has_pending_tracks_the_head_batch() {
    let buffer = EventBuffer::new();
    assert!(!buffer.has_pending().await);

    buffer.add(event("line\n")).await;
    assert!(buffer.has_pending().await);

    assert_eq!(buffer.drain().await.len(), 1);
    assert!(!buffer.has_pending().await);
}
