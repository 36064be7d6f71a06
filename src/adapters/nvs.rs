//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the node.
//!
//! | namespace | key          | contents                           |
//! |-----------|--------------|------------------------------------|
//! | `artnode` | `nodecfg`    | [`NodeConfig`] as a postcard blob  |
//! | `rdm`     | `pwr_cycles` | RDM power-cycle counter (u32 LE)   |
//! | `wifi`    | `ssid`/`pass`| station credentials                |
//!
//! ESP-IDF NVS commits are atomic per `nvs_commit()`. The host backend is
//! an in-memory map keyed by `namespace::key`.

use log::info;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::NodeConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// Bindgen types IDF error macros inconsistently; pin them to `esp_err_t`.
#[cfg(target_os = "espidf")]
const OK: esp_err_t = ESP_OK as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_FOUND: esp_err_t = ESP_ERR_NVS_NOT_FOUND as esp_err_t;

const CONFIG_NAMESPACE: &str = "artnode";
const CONFIG_KEY: &str = "nodecfg";
const WIFI_NAMESPACE: &str = "wifi";

/// NVS keys and namespaces are limited to 15 characters.
const NVS_NAME_MAX: usize = 15;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

/// NUL-terminated copy of an NVS name, truncated to the 15-char limit.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn c_name(name: &str) -> [u8; NVS_NAME_MAX + 1] {
    let mut buf = [0u8; NVS_NAME_MAX + 1];
    let n = name.len().min(NVS_NAME_MAX);
    buf[..n].copy_from_slice(&name.as_bytes()[..n]);
    buf
}

impl NvsAdapter {
    /// Initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased and
    /// re-initialised. Anything else is reported as [`ConfigError::IoError`].
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let mut ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                log::warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != OK {
                    return Err(ConfigError::IoError);
                }
                ret = unsafe { nvs_flash_init() };
            }
            if ret != OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Station SSID and password, if provisioned.
    pub fn wifi_credentials(&self) -> Option<(heapless::String<32>, heapless::String<64>)> {
        let mut ssid_buf = [0u8; 32];
        let mut pass_buf = [0u8; 64];
        let ssid_len = self.read(WIFI_NAMESPACE, "ssid", &mut ssid_buf).ok()?;
        let pass_len = self
            .read(WIFI_NAMESPACE, "pass", &mut pass_buf)
            .unwrap_or(0);
        let ssid = core::str::from_utf8(&ssid_buf[..ssid_len]).ok()?;
        let pass = core::str::from_utf8(&pass_buf[..pass_len]).ok()?;
        Some((ssid.try_into().ok()?, pass.try_into().ok()?))
    }

    pub fn store_wifi_credentials(&mut self, ssid: &str, pass: &str) -> Result<(), StorageError> {
        self.write(WIFI_NAMESPACE, "ssid", ssid.as_bytes())?;
        self.write(WIFI_NAMESPACE, "pass", pass.as_bytes())
    }

    // ── Backend primitives ────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn get_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .store
            .borrow()
            .get(&Self::composite_key(namespace, key))
            .cloned())
    }

    #[cfg(not(target_os = "espidf"))]
    fn put_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn erase_blob(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    /// Open `namespace`, run `f` with the handle, close it again.
    #[cfg(target_os = "espidf")]
    fn with_handle<T>(
        namespace: &str,
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    ) -> Result<T, esp_err_t> {
        let ns = c_name(namespace);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn get_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let k = c_name(key);
        let result = Self::with_handle(namespace, false, |handle| {
            let mut size: usize = 0;
            let ret =
                unsafe { nvs_get_blob(handle, k.as_ptr().cast(), core::ptr::null_mut(), &mut size) };
            if ret != OK {
                return Err(ret);
            }
            if size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as esp_err_t);
            }
            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(handle, k.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
            };
            if ret != OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // A namespace that was never written cannot be opened read-only.
            Err(e) if e == NOT_FOUND => Ok(None),
            Err(e) => {
                log::warn!("NvsAdapter: read {}::{} failed ({})", namespace, key, e);
                Err(StorageError::IoError)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn put_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let k = c_name(key);
        Self::with_handle(namespace, true, |handle| {
            let ret =
                unsafe { nvs_set_blob(handle, k.as_ptr().cast(), data.as_ptr().cast(), data.len()) };
            if ret != OK {
                return Err(ret);
            }
            match unsafe { nvs_commit(handle) } {
                OK => Ok(()),
                e => Err(e),
            }
        })
        .map_err(|e| {
            log::warn!("NvsAdapter: write {}::{} failed ({})", namespace, key, e);
            StorageError::IoError
        })
    }

    #[cfg(target_os = "espidf")]
    fn erase_blob(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let k = c_name(key);
        Self::with_handle(namespace, true, |handle| {
            let ret = unsafe { nvs_erase_key(handle, k.as_ptr().cast()) };
            if ret != OK && ret != NOT_FOUND {
                return Err(ret);
            }
            match unsafe { nvs_commit(handle) } {
                OK => Ok(()),
                e => Err(e),
            }
        })
        .map_err(|_| StorageError::IoError)
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        let Some(bytes) = self
            .get_blob(CONFIG_NAMESPACE, CONFIG_KEY)
            .map_err(|_| ConfigError::IoError)?
        else {
            info!("NvsAdapter: no stored config, using defaults");
            return Ok(NodeConfig::default());
        };

        let cfg: NodeConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate().map_err(ConfigError::ValidationFailed)?;
        info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.put_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.get_blob(namespace, key)?.ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put_blob(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.erase_blob(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        matches!(self.get_blob(namespace, key), Ok(Some(_)))
    }
}
