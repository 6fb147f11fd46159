//! BLE discovery of timecode devices.

mod session;
mod session_api;

pub use session::ScanSession;
pub use session_api::DeviceScanApi;

use crate::native::{DeviceAdvertisement, NativeProductId};

use models::device::{DeviceInfo, DeviceProductId};

pub fn product_id_from_native(product_id: NativeProductId) -> DeviceProductId {
    match product_id {
        NativeProductId::SyncE => DeviceProductId::SyncE,
        NativeProductId::TrackE => DeviceProductId::TrackE,
        NativeProductId::Other(_) => DeviceProductId::Generic,
    }
}

pub fn device_info(advert: &DeviceAdvertisement) -> DeviceInfo {
    DeviceInfo {
        identifier: advert.identifier.clone(),
        name: advert.name.clone(),
        product_id: product_id_from_native(advert.product_id),
        is_in_green_mode: advert.green_mode,
        is_charging: advert.charging,
        is_drop_frame: advert.drop_frame,
        battery_level: i64::from(advert.battery_percent),
        frame_rate: advert.frame_rate,
        icon_index: i64::from(advert.icon),
        signal_strength: i64::from(advert.rssi),
        last_seen_timestamp: advert.last_seen_secs,
    }
}
