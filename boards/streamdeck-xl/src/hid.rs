//! hidapi backed transport.
//!
//! The device is opened twice: one handle carries output and feature reports,
//! the other is reserved for blocking input reads so a pending read never
//! delays an image upload. If the platform refuses a second handle, input
//! reads fall back to the shared one.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use deck_core::{DeckError, HidTransport, Result};
use hidapi::HidDevice;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::discovery::with_api;

pub struct HidapiTransport {
    path: CString,
    serial: Option<String>,
    device: Mutex<Option<HidDevice>>,
    input: Mutex<Option<HidDevice>>,
    open: AtomicBool,
}

impl HidapiTransport {
    pub fn new(path: CString, serial: Option<String>) -> Self {
        Self {
            path,
            serial,
            device: Mutex::new(None),
            input: Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }

    /// Serial number reported by the enumeration, if any
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn with_device<T>(&self, f: impl FnOnce(&HidDevice) -> Result<T>) -> Result<T> {
        let device = self.device.lock();
        f(device.as_ref().ok_or(DeckError::NotConnected)?)
    }
}

/// Prefix `payload` with its report id, the framing hidapi expects
fn framed(report_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.push(report_id);
    buf.extend_from_slice(payload);
    buf
}

impl HidTransport for HidapiTransport {
    fn open(&self) -> Result<()> {
        let mut device = self.device.lock();
        if device.is_some() {
            return Ok(());
        }
        let (main, input) = with_api(|api| {
            let main = api.open_path(&self.path)?;
            let input = match api.open_path(&self.path) {
                Ok(input) => Some(input),
                Err(e) => {
                    warn!("no dedicated input handle, sharing the command handle: {e}");
                    None
                },
            };
            Ok((main, input))
        })?;
        debug!("opened {:?}", self.path);
        *device = Some(main);
        *self.input.lock() = input;
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) {
        let mut device = self.device.lock();
        self.open.store(false, Ordering::Release);
        // waits out an in-flight input read
        self.input.lock().take();
        if device.take().is_some() {
            debug!("closed {:?}", self.path);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn write(&self, report_id: u8, payload: &[u8]) -> Result<usize> {
        let buf = framed(report_id, payload);
        self.with_device(|d| Ok(d.write(&buf)?))
    }

    fn send_feature(&self, report_id: u8, payload: &[u8]) -> Result<()> {
        let buf = framed(report_id, payload);
        self.with_device(|d| Ok(d.send_feature_report(&buf)?))
    }

    fn read_feature(&self, report_id: u8, buf: &mut [u8]) -> Result<usize> {
        let mut raw = vec![0u8; buf.len() + 1];
        raw[0] = report_id;
        let len = self.with_device(|d| Ok(d.get_feature_report(&mut raw)?))?;
        // strip the echoed report id
        let len = len.saturating_sub(1).min(buf.len());
        buf[..len].copy_from_slice(&raw[1..1 + len]);
        Ok(len)
    }

    fn read_input(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let timeout = timeout.as_millis().min(i32::MAX as u128) as i32;
        {
            let input = self.input.lock();
            if let Some(input) = input.as_ref() {
                return Ok(input.read_timeout(buf, timeout)?);
            }
        }
        self.with_device(|d| Ok(d.read_timeout(buf, timeout)?))
    }
}

impl Drop for HidapiTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_framing() {
        assert_eq!(framed(0x03, &[0x08, 50]), vec![0x03, 0x08, 50]);
        assert_eq!(framed(0x02, &[]), vec![0x02]);
    }

    #[test]
    fn unopened_transport_rejects_io() {
        let transport = HidapiTransport::new(CString::new("/dev/null").unwrap(), None);
        assert!(!transport.is_open());
        assert!(matches!(
            transport.send_feature(0x03, &[0; 32]),
            Err(DeckError::NotConnected)
        ));
        let mut buf = [0u8; 32];
        assert!(matches!(
            transport.read_feature(0x05, &mut buf),
            Err(DeckError::NotConnected)
        ));
    }
}
