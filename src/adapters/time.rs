//! Monotonic time and microsecond delays.
//!
//! - **`target_os = "espidf"`** wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`** uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! [`MonotonicClock`] also implements [`DelayNs`] as a spin wait. Break and
//! mark-after-break are far shorter than a FreeRTOS tick, so sleeping is
//! not an option for them.

use core::time::Duration;

use embedded_hal::delay::DelayNs;

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.uptime_us() / 1_000_000
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since the clock was created.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Busy-wait for `us` microseconds.
    pub fn spin_us(&self, us: u32) {
        let deadline = self.uptime_us() + u64::from(us);
        while self.uptime_us() < deadline {
            core::hint::spin_loop();
        }
    }
}

impl DelayNs for MonotonicClock {
    fn delay_ns(&mut self, ns: u32) {
        self.spin_us(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.spin_us(us);
    }
}

// ── Time source for rate limiters ─────────────────────────────

/// Time since boot, in the shape `burster` expects for a time provider.
#[cfg(target_os = "espidf")]
pub fn platform_now() -> Duration {
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
pub fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
