//! Finding attached decks through hidapi.

use std::ffi::CString;
use std::sync::LazyLock;

use deck_core::{DeckError, Result};
use hidapi::{DeviceInfo, HidApi};
use parking_lot::Mutex;
use streamdeck_xl_protocol::INFO;

use crate::hid::HidapiTransport;

/// Lazy handle to hidapi, shared by enumeration and device opening
static API: LazyLock<Mutex<Option<HidApi>>> = LazyLock::new(|| Mutex::new(None));

/// Run `f` against the process wide hidapi context, creating it on first use
pub(crate) fn with_api<T>(f: impl FnOnce(&mut HidApi) -> Result<T>) -> Result<T> {
    let mut guard = API.lock();
    if guard.is_none() {
        *guard = Some(HidApi::new()?);
    }
    let api = guard.as_mut().ok_or(DeckError::DeviceNotFound)?;
    f(api)
}

/// An attached deck as reported by the HID enumeration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeckListing {
    pub path: CString,
    pub serial: Option<String>,
    pub product: Option<String>,
}

impl DeckListing {
    /// Unopened transport for this deck
    pub fn transport(&self) -> HidapiTransport {
        HidapiTransport::new(self.path.clone(), self.serial.clone())
    }
}

/// Check if a HID device is an XL
fn matches(device: &DeviceInfo) -> bool {
    device.vendor_id() == INFO.vendor_id && device.product_id() == INFO.product_id
}

/// List every attached XL, in enumeration order
pub fn list_devices() -> Result<Vec<DeckListing>> {
    with_api(|api| {
        api.refresh_devices()?;
        let mut decks: Vec<DeckListing> = Vec::new();
        for device in api.device_list().filter(|d| matches(d)) {
            // composite devices show up once per interface
            if decks.iter().any(|d| d.path.as_c_str() == device.path()) {
                continue;
            }
            decks.push(DeckListing {
                path: device.path().to_owned(),
                serial: device.serial_number().map(str::to_string),
                product: device.product_string().map(str::to_string),
            });
        }
        tracing::debug!("found {} deck(s)", decks.len());
        Ok(decks)
    })
}

/// Transport for the first attached XL
pub fn find_first() -> Result<HidapiTransport> {
    list_devices()?
        .first()
        .map(DeckListing::transport)
        .ok_or(DeckError::DeviceNotFound)
}

/// Transport for the XL reporting `serial`
pub fn find_by_serial(serial: &str) -> Result<HidapiTransport> {
    list_devices()?
        .iter()
        .find(|d| d.serial.as_deref() == Some(serial))
        .map(DeckListing::transport)
        .ok_or(DeckError::DeviceNotFound)
}
