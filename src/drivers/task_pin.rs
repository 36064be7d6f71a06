//! Core-pinned thread spawning.
//!
//! ESP-IDF implements `std::thread` on pthreads, and `esp_pthread_set_cfg()`
//! sets the core, priority and stack for the *next* `pthread_create()` from
//! the calling thread. Config and spawn therefore happen back to back here
//! and nowhere else.
//!
//! The node runs two tasks:
//!
//! | task      | core | why                                        |
//! |-----------|------|--------------------------------------------|
//! | `dmx-out` | App  | break/MAB spin waits must not be preempted |
//! | `artnet`  | Pro  | next to the Wi-Fi and lwIP tasks           |

use std::io;
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// PRO_CPU: protocol stacks (Wi-Fi, lwIP).
    Pro = 0,
    /// APP_CPU: DMX output.
    App = 1,
}

/// Spawn `f` pinned to `core`. `name` must be NUL terminated (`"artnet\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by IDF and `name`
    // is a static NUL-terminated string.
    let ret = unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr().cast();
        esp_idf_svc::sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_svc::sys::ESP_OK as esp_idf_svc::sys::esp_err_t {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );
    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
}

/// Host fallback: no affinity or priority, stack size only.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::debug!("Spawning '{}' (sim, stack={}KB)", display_name, stack_kb);
    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
