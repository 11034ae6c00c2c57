//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StatePort`] for the parent controller: the node table,
//! parent relay assignments, comfort zone and effectiveness counters are
//! stored as one `postcard` blob.
//!
//! - Validation: the whole state is range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().
//! - Off-target builds use an in-memory simulation backend.

use crate::app::ports::{StateError, StatePort};
use crate::config::{PersistedState, validate_state};
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const STATE_NAMESPACE: &str = "ccsparent";

#[allow(dead_code)]
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StateError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(StateError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(StateError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StateError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(None),
        })
    }

    /// Open the state namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = STATE_NAMESPACE.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    fn decode(bytes: &[u8]) -> Result<PersistedState, StateError> {
        let state: PersistedState = postcard::from_bytes(bytes).map_err(|_| StateError::Corrupted)?;
        validate_state(&state).inspect_err(|e| warn!("NvsAdapter: stored state rejected: {}", e))?;
        Ok(state)
    }

    /// Replace the stored blob verbatim (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn write_raw(&self, bytes: Vec<u8>) {
        *self.store.borrow_mut() = Some(bytes);
    }

    /// Forget the stored state (factory reset).
    #[cfg(not(target_os = "espidf"))]
    pub fn erase(&self) {
        *self.store.borrow_mut() = None;
    }

    #[cfg(target_os = "espidf")]
    pub fn erase(&self) {
        let result = Self::with_nvs_handle(true, |handle| {
            let ret = unsafe { nvs_erase_all(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        if let Err(e) = result {
            warn!("NvsAdapter: erase failed {}", e);
        }
    }
}

impl StatePort for NvsAdapter {
    fn load_state(&self) -> Result<PersistedState, StateError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.store.borrow().as_deref() {
                let state = Self::decode(bytes)?;
                info!("NvsAdapter: loaded state from store");
                Ok(state)
            } else {
                info!("NvsAdapter: no stored state, using defaults");
                Ok(PersistedState::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let key_cstr = b"state\0";
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let state = Self::decode(&bytes)?;
                    info!("NvsAdapter: loaded state from NVS ({} bytes)", bytes.len());
                    Ok(state)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored state, using defaults");
                    Ok(PersistedState::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}", e);
                    Err(StateError::IoError)
                }
            }
        }
    }

    fn save_state(&self, state: &PersistedState) -> Result<(), StateError> {
        validate_state(state)?;
        let bytes = postcard::to_allocvec(state).map_err(|_| StateError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            *self.store.borrow_mut() = Some(bytes);
            info!("NvsAdapter: state saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            if bytes.len() > MAX_BLOB_SIZE {
                return Err(StateError::StorageFull);
            }
            let result = Self::with_nvs_handle(true, |handle| {
                let key_cstr = b"state\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    return Err(ret);
                }
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: state saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(StateError::StorageFull),
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(StateError::IoError)
                }
            }
        }
    }
}

impl Default for NvsAdapter {
    /// Adapter without flash init, for when `new()` fails.  Every
    /// operation then reports an I/O error on device.
    fn default() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(None),
        }
    }
}
