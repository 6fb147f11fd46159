use crate::native::loopback::LoopbackDataChannel;
use crate::native::{DataChannelObserver, NativeDataChannel};
use crate::tests::support::Fixture;

use models::rtc::{DataBuffer, DataChannelInit, DataChannelState, PeerConnectionState};
use models::{BridgeEvent, Handle, INVALID_HANDLE};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A connected peer connection with one locally created, open channel.
fn open_channel(fixture: &Fixture) -> (Handle, Arc<LoopbackDataChannel>) {
    let connection = fixture.peer_connections.create();
    let native = fixture
        .hooks
        .rtc
        .last_connection()
        .expect("No native connection");
    native.emit_state(PeerConnectionState::Connected);
    let channel = fixture
        .peer_connections
        .create_data_channel(connection, "chat", &DataChannelInit::default())
        .expect("create_data_channel failed");
    let remote = native.data_channels().pop().expect("No native channel");
    (channel, remote)
}

fn channel_states(events: &[BridgeEvent], channel: Handle) -> Vec<DataChannelState> {
    events
        .iter()
        .filter_map(|event| match event {
            BridgeEvent::DataChannelStateChanged {
                data_channel,
                state,
            } if *data_channel == channel => Some(*state),
            _ => None,
        })
        .collect()
}

/// **VALUE**: Sent messages reach the native channel and incoming ones become
/// events carrying the payload unchanged.
///
/// **WHY THIS MATTERS**: Data channels carry the client's control protocol.
///
/// **BUG THIS CATCHES**: Would catch the binary flag or payload being altered
/// on either path.
#[tokio::test]
async fn given_open_channel_when_sending_then_native_sees_it_and_echo_arrives() {
    // GIVEN: An open channel that echoes
    let mut fixture = Fixture::new();
    let (channel, native) = open_channel(&fixture);
    fixture.settle().await;

    // WHEN: Sending a text and a binary message
    fixture.data_channels.send(channel, &DataBuffer::text("hello"));
    fixture
        .data_channels
        .send(channel, &DataBuffer::binary(vec![0u8, 1, 2]));

    // THEN: Both were sent natively and echoed back as events, in order
    assert_eq!(
        native.sent(),
        vec![DataBuffer::text("hello"), DataBuffer::binary(vec![0u8, 1, 2])]
    );
    let events = fixture.settle().await;
    assert_eq!(
        events,
        vec![
            BridgeEvent::DataChannelMessage {
                data_channel: channel,
                buffer: DataBuffer::text("hello"),
            },
            BridgeEvent::DataChannelMessage {
                data_channel: channel,
                buffer: DataBuffer::binary(vec![0u8, 1, 2]),
            },
        ]
    );
}

/// **VALUE**: Sending on a channel that is not open is dropped, not an error.
///
/// **WHY THIS MATTERS**: Sends are fire-and-forget; the client learns about
/// the channel state from events.
///
/// **BUG THIS CATCHES**: Would catch a panic or a queued message being
/// delivered later.
#[tokio::test]
async fn given_connecting_channel_when_sending_then_message_dropped() {
    // GIVEN: A channel on a connection that never connected
    let fixture = Fixture::new();
    let connection = fixture.peer_connections.create();
    let channel = fixture
        .peer_connections
        .create_data_channel(connection, "early", &DataChannelInit::default())
        .expect("create_data_channel failed");

    // WHEN: Sending
    fixture.data_channels.send(channel, &DataBuffer::text("too soon"));

    // THEN: Nothing reached the wire
    let native = fixture
        .hooks
        .rtc
        .last_connection()
        .expect("No native connection")
        .data_channels()
        .pop()
        .expect("No native channel");
    assert!(native.sent().is_empty());
    assert_eq!(
        fixture.data_channels.get(channel).expect("Channel missing").state(),
        DataChannelState::Connecting
    );
}

/// **VALUE**: A channel closed by the remote side reports Closing then Closed
/// and removes itself from the registry.
///
/// **WHY THIS MATTERS**: The client never disposes channels the remote side
/// closed; without self-removal they would leak.
///
/// **BUG THIS CATCHES**: Would catch a missing unregister on Closed, or the
/// Closed event being lost because the handle was removed first.
#[tokio::test]
async fn given_open_channel_when_remote_closes_then_closed_event_and_unregistered() {
    // GIVEN: An open channel
    let mut fixture = Fixture::new();
    let (channel, native) = open_channel(&fixture);
    fixture.settle().await;

    // WHEN: The remote side closes it
    native.remote_close();

    // THEN: Closing, then Closed, and the handle is gone
    let events = fixture.settle().await;
    assert_eq!(
        channel_states(&events, channel),
        vec![DataChannelState::Closing, DataChannelState::Closed]
    );
    assert!(fixture.data_channels.get(channel).is_none());
    assert_eq!(native.detach_calls(), 1);
    assert_eq!(native.close_calls(), 0);
}

/// **VALUE**: A native close racing a client dispose releases the channel
/// exactly once.
///
/// **WHY THIS MATTERS**: Native close callbacks come from SDK threads while
/// the client's dispose runs on the runtime.
///
/// **BUG THIS CATCHES**: Would catch a double dispose (two detaches) or a
/// channel left registered.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_remote_close_racing_dispose_when_both_run_then_released_once() {
    for _ in 0..20 {
        // GIVEN: An open channel
        let fixture = Fixture::new();
        let (channel, native) = open_channel(&fixture);

        // WHEN: The remote close and the client dispose run concurrently
        let closer = {
            let native = native.clone();
            std::thread::spawn(move || native.remote_close())
        };
        let disposer = {
            let api = fixture.data_channels.clone();
            std::thread::spawn(move || api.dispose(channel))
        };
        closer.join().expect("closer panicked");
        disposer.join().expect("disposer panicked");

        // THEN: Detached once and no longer addressable
        assert_eq!(native.detach_calls(), 1);
        assert!(fixture.data_channels.get(channel).is_none());
    }
}

/// **VALUE**: Client dispose of an open channel closes it natively without
/// reporting anything afterwards.
///
/// **WHY THIS MATTERS**: The client asked for the disposal; state events for a
/// handle it already dropped are noise.
///
/// **BUG THIS CATCHES**: Would catch the observer being detached after close
/// instead of before.
#[tokio::test]
async fn given_open_channel_when_disposed_then_closed_natively_without_events() {
    let mut fixture = Fixture::new();
    let (channel, native) = open_channel(&fixture);
    fixture.settle().await;

    fixture.data_channels.dispose(channel);

    assert_eq!(native.close_calls(), 1);
    assert!(!native.has_observer());
    assert!(fixture.settle().await.is_empty());
    assert!(fixture.data_channels.handles().is_empty());
}

/// **VALUE**: Sending on an unknown handle is a protocol violation.
///
/// **WHY THIS MATTERS**: The server relies on this panic to close the
/// offending connection.
///
/// **BUG THIS CATCHES**: Would catch sends to unknown handles being ignored.
#[tokio::test]
#[should_panic(expected = "No data channel with handle 3")]
async fn given_unknown_handle_when_sending_then_panics() {
    let fixture = Fixture::new();
    fixture.data_channels.send(3, &DataBuffer::text("lost"));
}

/// **VALUE**: A channel closed by the remote side disappears from its
/// connection's channel list too.
///
/// **WHY THIS MATTERS**: The connection releases the handles in that list
/// when it is disposed; stale entries would be reported as live children.
///
/// **BUG THIS CATCHES**: Would catch the channel unregistering itself without
/// telling its parent.
#[tokio::test]
async fn given_remote_channel_when_remote_closes_then_parent_forgets_it() {
    // GIVEN: A channel the remote peer opened
    let mut fixture = Fixture::new();
    let connection = fixture.peer_connections.create();
    let native = fixture
        .hooks
        .rtc
        .last_connection()
        .expect("No native connection");
    let remote = native.emit_remote_data_channel("chat");
    fixture.settle().await;
    let parent = fixture
        .peer_connections
        .get(connection)
        .expect("Connection missing");
    assert_eq!(parent.data_channel_handles().len(), 1);

    // WHEN: The remote side closes it
    remote.remote_close();
    fixture.settle().await;

    // THEN: Neither the registry nor the parent knows it any more
    assert!(fixture.data_channels.handles().is_empty());
    assert!(parent.data_channel_handles().is_empty());
}

/// Reports Open on the first state read with an observer attached, then
/// closes before the reader can act on it.
struct ClosesWhileRegistering {
    state: Mutex<DataChannelState>,
    observer: Mutex<Option<Arc<dyn DataChannelObserver>>>,
    detach_calls: AtomicUsize,
}

impl ClosesWhileRegistering {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DataChannelState::Open),
            observer: Mutex::new(None),
            detach_calls: AtomicUsize::new(0),
        })
    }
}

impl NativeDataChannel for ClosesWhileRegistering {
    fn label(&self) -> String {
        String::from("late")
    }

    fn ready_state(&self) -> DataChannelState {
        let observed = *self.state.lock();
        let observer = self.observer.lock().clone();
        if observed == DataChannelState::Open
            && let Some(observer) = observer
        {
            *self.state.lock() = DataChannelState::Closed;
            observer.on_state_change(DataChannelState::Closed);
        }
        observed
    }

    fn set_observer(&self, observer: Option<Arc<dyn DataChannelObserver>>) {
        if observer.is_none() {
            self.detach_calls.fetch_add(1, Ordering::SeqCst);
        }
        *self.observer.lock() = observer;
    }

    fn send(&self, _buffer: &DataBuffer) -> bool {
        false
    }

    fn close(&self) {}
}

/// **VALUE**: A channel that closes while it is being registered is not left
/// registered.
///
/// **WHY THIS MATTERS**: Its Closed callback fires before the handle is
/// addressable, so the self-removal it triggers finds nothing to remove.
///
/// **BUG THIS CATCHES**: Would catch a missing state check after the registry
/// insert, which leaks the channel until shutdown.
#[tokio::test]
async fn given_channel_closing_during_registration_when_registered_then_invalid_handle() {
    // GIVEN: A connection and a native channel that closes mid-registration
    let mut fixture = Fixture::new();
    let connection = fixture.peer_connections.create();
    let native = ClosesWhileRegistering::new();

    // WHEN: Registering it
    let handle = fixture.data_channels.register(native.clone(), connection);

    // THEN: No handle is issued, nothing stays registered, the observer is gone
    assert_eq!(handle, INVALID_HANDLE);
    assert!(fixture.data_channels.handles().is_empty());
    assert_eq!(native.detach_calls.load(Ordering::SeqCst), 1);
    assert!(native.observer.lock().is_none());
    fixture.settle().await;
}
