use crate::error::bridge::BridgeError;
use crate::native::{NativeMediaTrack, VideoFrameObserver};
use crate::registry::{Lifecycle, ManagedResource};
use crate::rtc::media_track::MediaTrack;
use crate::rtc::video_view_api::VideoViewApi;

use common::ErrorLocation;
use models::rtc::MediaKind;
use models::{BridgeEvent, Handle};

use std::panic::Location;
use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::Mutex;

struct AttachedTrack {
    handle: Handle,
    native: Arc<dyn NativeMediaTrack>,
}

/// Renders one video track and reports its frame size.
pub struct VideoViewController {
    lifecycle: Lifecycle,
    this: Weak<VideoViewController>,
    api: Weak<VideoViewApi>,
    attached: Mutex<Option<AttachedTrack>>,
    frame_size: Mutex<Option<(u32, u32)>>,
}

impl VideoViewController {
    pub(crate) fn new(api: Weak<VideoViewApi>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            lifecycle: Lifecycle::new(),
            this: this.clone(),
            api,
            attached: Mutex::new(None),
            frame_size: Mutex::new(None),
        })
    }

    /// Handle of the track being rendered.
    pub fn track(&self) -> Option<Handle> {
        self.attached.lock().as_ref().map(|attached| attached.handle)
    }

    pub fn frame_size(&self) -> Option<(u32, u32)> {
        *self.frame_size.lock()
    }

    /// Render `track`, or stop rendering when `None`.
    pub(crate) fn set_track(
        &self,
        track: Option<(Handle, Arc<MediaTrack>)>,
    ) -> Result<(), BridgeError> {
        if let Some((handle, track)) = &track
            && track.kind() != MediaKind::Video
        {
            return Err(BridgeError::InvalidArgument {
                message: format!("Track #{} is not a video track", handle),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let previous = self.attached.lock().take();
        if let Some(previous) = previous {
            previous.native.detach_renderer(self.handle());
        }
        *self.frame_size.lock() = None;

        let Some((handle, track)) = track else {
            debug!("Video view #{} cleared", self.handle());
            return Ok(());
        };

        let native = track.native().clone();
        let observer = Arc::new(FrameObserver {
            controller: self.this.clone(),
        });
        native.attach_renderer(self.handle(), observer)?;
        *self.attached.lock() = Some(AttachedTrack { handle, native });
        debug!("Video view #{} renders track #{}", self.handle(), handle);
        Ok(())
    }

    fn on_frame_size_changed(&self, width: u32, height: u32) {
        {
            let mut size = self.frame_size.lock();
            if *size == Some((width, height)) {
                return;
            }
            *size = Some((width, height));
        }
        if let Some(api) = self.api.upgrade() {
            api.events().emit(BridgeEvent::VideoFrameSizeChanged {
                controller: self.handle(),
                width: i64::from(width),
                height: i64::from(height),
            });
        }
    }
}

impl ManagedResource for VideoViewController {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn dispose(&self) {
        let attached = self.attached.lock().take();
        if let Some(attached) = attached {
            attached.native.detach_renderer(self.handle());
        }
    }
}

struct FrameObserver {
    controller: Weak<VideoViewController>,
}

impl VideoFrameObserver for FrameObserver {
    fn on_frame_size_changed(&self, width: u32, height: u32) {
        if let Some(controller) = self.controller.upgrade()
            && !controller.is_disposed()
        {
            controller.on_frame_size_changed(width, height);
        }
    }
}
