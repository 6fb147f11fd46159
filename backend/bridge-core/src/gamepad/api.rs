use crate::dispatch::EventDispatcher;
use crate::gamepad::classify::translate;
use crate::native::{ControlValue, GamepadBackend, GamepadObserver, NativeControl, PlayerIndex};
use crate::registry::{Lifecycle, ManagedResource, Registry};

use models::{BridgeEvent, Handle, INVALID_HANDLE};

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use log::{debug, info};
use parking_lot::Mutex;

/// A connected controller. The controller itself belongs to the OS.
pub struct Gamepad {
    lifecycle: Lifecycle,
    player: PlayerIndex,
}

impl Gamepad {
    pub fn player(&self) -> PlayerIndex {
        self.player
    }
}

impl ManagedResource for Gamepad {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn dispose(&self) {
        debug!("Gamepad for player {} released", self.player);
    }
}

/// Tracks controllers as the OS reports them. Unlike the other subsystems,
/// resources here are created by native notifications only.
pub struct GamepadApi {
    this: Weak<GamepadApi>,
    gamepads: Registry<Gamepad>,
    players: Mutex<HashMap<PlayerIndex, Handle>>,
    backend: Arc<dyn GamepadBackend>,
    events: EventDispatcher<BridgeEvent>,
}

impl GamepadApi {
    pub fn new(
        backend: Arc<dyn GamepadBackend>,
        events: EventDispatcher<BridgeEvent>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            gamepads: Registry::new("gamepad"),
            players: Mutex::new(HashMap::new()),
            backend,
            events,
        })
    }

    /// Subscribe to controller notifications and adopt controllers that
    /// are already connected.
    pub fn start(&self) {
        let observer = Arc::new(GamepadEvents {
            api: self.this.clone(),
        });
        let connected = self.backend.start(observer);
        info!("Gamepad monitoring started ({} connected)", connected.len());
        for player in connected {
            self.on_connected(player);
        }
    }

    pub fn active_gamepads(&self) -> Vec<Handle> {
        self.gamepads.handles()
    }

    pub fn get(&self, gamepad: Handle) -> Option<Arc<Gamepad>> {
        self.gamepads.get(gamepad)
    }

    fn on_connected(&self, player: PlayerIndex) {
        let mut players = self.players.lock();
        if players.contains_key(&player) {
            return;
        }
        let handle = self.gamepads.register(Arc::new(Gamepad {
            lifecycle: Lifecycle::new(),
            player,
        }));
        if handle == INVALID_HANDLE {
            return;
        }
        players.insert(player, handle);
        drop(players);

        info!("Gamepad #{} connected as player {}", handle, player);
        self.events.emit(BridgeEvent::GamepadConnected { gamepad: handle });
    }

    fn on_disconnected(&self, player: PlayerIndex) {
        let Some(handle) = self.players.lock().remove(&player) else {
            return;
        };
        self.gamepads.unregister(handle);
        info!("Gamepad #{} (player {}) disconnected", handle, player);
        self.events.emit(BridgeEvent::GamepadDisconnected { gamepad: handle });
    }

    fn on_control_changed(
        &self,
        player: PlayerIndex,
        control: NativeControl,
        value: ControlValue,
    ) {
        let Some(handle) = self.players.lock().get(&player).copied() else {
            return;
        };
        for event in translate(handle, control, value) {
            self.events.emit(BridgeEvent::GamepadInput(event));
        }
    }

    /// Stop monitoring and release every controller.
    pub fn dispose_all(&self) {
        self.backend.stop();
        self.players.lock().clear();
        self.gamepads.dispose_all();
    }
}

struct GamepadEvents {
    api: Weak<GamepadApi>,
}

impl GamepadObserver for GamepadEvents {
    fn on_connected(&self, player: PlayerIndex) {
        if let Some(api) = self.api.upgrade() {
            api.on_connected(player);
        }
    }

    fn on_disconnected(&self, player: PlayerIndex) {
        if let Some(api) = self.api.upgrade() {
            api.on_disconnected(player);
        }
    }

    fn on_control_changed(
        &self,
        player: PlayerIndex,
        control: NativeControl,
        value: ControlValue,
    ) {
        if let Some(api) = self.api.upgrade() {
            api.on_control_changed(player, control, value);
        }
    }
}
