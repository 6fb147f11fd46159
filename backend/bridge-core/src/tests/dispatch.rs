use crate::dispatch::{EventDispatcher, EventSink};

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

struct Closed;

impl EventSink<u32> for Closed {
    fn deliver(&mut self, _event: u32) -> bool {
        false
    }
}

/// **VALUE**: Events queued from several native threads reach the sink in
/// per-thread FIFO order.
///
/// **WHY THIS MATTERS**: A data channel reporting Open then Closed must never
/// be seen by the client as Closed then Open.
///
/// **BUG THIS CATCHES**: Would catch spawning one task per event, which gives
/// no ordering guarantee.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_producers_on_threads_when_dispatched_then_each_thread_in_order() {
    // GIVEN: A dispatcher feeding an mpsc sink
    let (tx, mut rx) = mpsc::unbounded_channel::<(u32, u32)>();
    let dispatcher = EventDispatcher::spawn("order", tx);

    // WHEN: Four threads each emit 100 sequenced events
    let threads: Vec<_> = (0..4u32)
        .map(|thread| {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || {
                for seq in 0..100u32 {
                    dispatcher.emit((thread, seq));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("producer thread panicked");
    }

    // THEN: Every event arrives and each thread's sequence is increasing
    let mut last = [None::<u32>; 4];
    for _ in 0..400 {
        let (thread, seq) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Timed out waiting for event")
            .expect("Dispatcher stopped");
        let slot = &mut last[thread as usize];
        if let Some(previous) = *slot {
            assert!(seq > previous, "thread {thread}: {seq} after {previous}");
        }
        *slot = Some(seq);
    }
    assert!(last.iter().all(|seq| *seq == Some(99)));
}

/// **VALUE**: A producer returning None is skipped without stopping delivery.
///
/// **WHY THIS MATTERS**: Producers for disposed resources return None; later
/// events from live resources must still go out.
///
/// **BUG THIS CATCHES**: Would catch the loop ending on the first None.
#[tokio::test]
async fn given_none_producer_when_dispatched_then_dropped_and_next_delivered() {
    // GIVEN: A dispatcher
    let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
    let dispatcher = EventDispatcher::spawn("skip", tx);

    // WHEN: Queueing a None producer followed by a real event
    dispatcher.send(|| None);
    dispatcher.send(|| Some(7));

    // THEN: Only the real event arrives
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for event");
    assert_eq!(event, Some(7));
}

/// **VALUE**: A broadcast sink without subscribers keeps the dispatcher alive.
///
/// **WHY THIS MATTERS**: Native events fire before any client has connected;
/// the bridge must not stop delivering once one finally connects.
///
/// **BUG THIS CATCHES**: Would catch treating "no receivers" as a closed sink.
#[tokio::test]
async fn given_broadcast_without_subscribers_when_emitting_then_dispatcher_keeps_running() {
    // GIVEN: A broadcast sink with no receivers
    let (tx, _) = broadcast::channel::<u32>(16);
    let dispatcher = EventDispatcher::spawn("fanout", tx.clone());

    // WHEN: Emitting before anyone subscribes, then subscribing
    dispatcher.emit(1);
    let (done_tx, done_rx) = oneshot::channel();
    dispatcher.send(move || {
        let _ = done_tx.send(());
        None
    });
    done_rx.await.expect("Dispatcher stopped");
    let mut rx = tx.subscribe();
    dispatcher.emit(2);

    // THEN: The subscriber gets the later event
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Broadcast closed");
    assert_eq!(event, 2);
}

/// **VALUE**: A sink that refuses delivery stops the dispatcher.
///
/// **WHY THIS MATTERS**: Once the consumer is gone there is nothing to
/// deliver to; queued producers must not pile up forever.
///
/// **BUG THIS CATCHES**: Would catch the delivery loop ignoring the sink's
/// result.
#[tokio::test]
async fn given_closed_sink_when_event_delivered_then_dispatcher_stops() {
    // GIVEN: A dispatcher whose sink refuses everything
    let dispatcher = EventDispatcher::spawn("closed", Closed);

    // WHEN: Delivering one event
    dispatcher.emit(1);

    // THEN: Producers queued afterwards are dropped without running
    let (done_tx, done_rx) = oneshot::channel::<()>();
    dispatcher.send(move || {
        let _ = done_tx.send(());
        None
    });
    let outcome = tokio::time::timeout(Duration::from_secs(2), done_rx)
        .await
        .expect("Dispatcher kept its queue alive");
    assert!(outcome.is_err(), "Producer ran after the sink closed");
}
