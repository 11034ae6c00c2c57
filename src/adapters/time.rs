//! ESP32 time adapter.
//!
//! Provides monotonic time queries and the local-midnight edge that drives
//! the daily effectiveness reset.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` and the
//!   newlib `localtime_r()` wall clock.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use crate::app::ports::ClockPort;

const SECS_PER_DAY: u64 = 86_400;

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Monotonic milliseconds, used for bus receive deadlines.
    pub fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    /// Local calendar day as `year * 1000 + day_of_year`.  `None` if the
    /// wall clock is not set (e.g. RTC not loaded yet).
    #[cfg(target_os = "espidf")]
    pub fn current_day(&self) -> Option<u32> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01)
        const EPOCH_2020: i64 = 1_577_836_800;
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        Some(tm.tm_year as u32 * 1000 + tm.tm_yday as u32)
    }

    /// No wall clock in simulation.
    #[cfg(not(target_os = "espidf"))]
    pub fn current_day(&self) -> Option<u32> {
        None
    }

    /// Day number used for midnight detection: the calendar day when the
    /// wall clock is set, otherwise whole days of uptime.
    pub fn day_number(&self) -> u32 {
        self.current_day()
            .unwrap_or((self.uptime_us() / 1_000_000 / SECS_PER_DAY) as u32)
    }
}

// ───────────────────────────────────────────────────────────────
// Midnight clock
// ───────────────────────────────────────────────────────────────

/// Reports `true` exactly once each time the day number changes.
///
/// The first observation after boot only latches the current day; a
/// restart is not a midnight.
#[derive(Debug, Default)]
pub struct MidnightClock {
    time: Esp32TimeAdapter,
    last_day: Option<u32>,
}

impl MidnightClock {
    pub fn new(time: Esp32TimeAdapter) -> Self {
        Self { time, last_day: None }
    }

    pub fn time(&self) -> &Esp32TimeAdapter {
        &self.time
    }

    /// Feed a day number; returns `true` on a change of day.
    pub fn observe(&mut self, day: u32) -> bool {
        match self.last_day.replace(day) {
            Some(prev) => prev != day,
            None => false,
        }
    }
}

impl ClockPort for MidnightClock {
    fn is_midnight_tick(&mut self) -> bool {
        let day = self.time.day_number();
        self.observe(day)
    }
}

impl core::fmt::Debug for Esp32TimeAdapter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Esp32TimeAdapter")
            .field("uptime_us", &self.uptime_us())
            .finish()
    }
}
