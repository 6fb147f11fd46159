use crate::config::BridgeConfig;
use crate::host::BridgeHost;
use crate::native::NativeBackend;
use crate::tests::support::EVENT_TIMEOUT;

use models::rtc::DataBuffer;
use models::{BridgeEvent, Handle};

use std::collections::HashSet;

/// **VALUE**: A remote data channel is always announced before any of its
/// messages reaches the client.
///
/// **WHY THIS MATTERS**: The client learns the channel handle from the
/// announcement; a message naming an unknown handle is dropped.
///
/// **BUG THIS CATCHES**: Would catch peer connections and data channels
/// emitting through separate delivery tasks, which the multi-thread runtime
/// is free to interleave.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_remote_channel_with_message_when_broadcast_then_announcement_first() {
    // GIVEN: A host over the loopback backend with one subscriber
    let (backend, hooks) = NativeBackend::loopback();
    let host = BridgeHost::new(&BridgeConfig::default(), backend);
    let mut rx = host.subscribe();
    let connection = host.peer_connections().create();
    let native = hooks.rtc.last_connection().expect("No native connection");

    // WHEN: The remote side opens channels and speaks on each right away
    const CHANNELS: usize = 50;
    for _ in 0..CHANNELS {
        let channel = native.emit_remote_data_channel("chat");
        channel.deliver(DataBuffer::text("hi"));
    }

    // THEN: Every message follows the announcement of its channel
    let mut announced: HashSet<Handle> = HashSet::new();
    let mut messages = 0;
    while messages < CHANNELS {
        let event = tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
            .await
            .expect("Timed out waiting for events")
            .expect("Broadcast closed");
        match event {
            BridgeEvent::DataChannel {
                connection: parent,
                data_channel,
            } => {
                assert_eq!(parent, connection);
                announced.insert(data_channel);
            }
            BridgeEvent::DataChannelMessage { data_channel, buffer } => {
                assert!(
                    announced.contains(&data_channel),
                    "Message on data channel #{data_channel} arrived before its announcement"
                );
                assert_eq!(buffer, DataBuffer::text("hi"));
                messages += 1;
            }
            _ => {}
        }
    }
    assert_eq!(announced.len(), CHANNELS);

    host.dispose_all();
}

/// **VALUE**: Client resource teardown releases remote channels together with
/// their connection.
///
/// **WHY THIS MATTERS**: A client reconnect disposes everything it created;
/// channels left behind would keep native resources alive.
///
/// **BUG THIS CATCHES**: Would catch channels surviving their connection in
/// the shared data channel registry.
#[tokio::test]
async fn given_connection_with_remote_channel_when_client_resources_disposed_then_all_released() {
    // GIVEN: A connection with a remote channel
    let (backend, hooks) = NativeBackend::loopback();
    let host = BridgeHost::new(&BridgeConfig::default(), backend);
    let connection = host.peer_connections().create();
    let native = hooks.rtc.last_connection().expect("No native connection");
    let channel = native.emit_remote_data_channel("chat");
    assert_eq!(host.data_channels().handles().len(), 1);

    // WHEN: Disposing what the client created
    host.dispose_client_resources();

    // THEN: Both are gone and the channel was closed natively
    assert!(host.peer_connections().get(connection).is_none());
    assert!(host.data_channels().handles().is_empty());
    assert_eq!(channel.close_calls(), 1);
}
