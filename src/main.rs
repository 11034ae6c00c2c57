//! CCS Parent Firmware: Main Entry Point
//!
//! Hexagonal architecture with a fixed-period step loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Rs485Bus          HardwareAdapter         NvsAdapter          │
//! │  (BusTransport)    (Interior+Relays+Clock) (StatePort)         │
//! │  LogEventSink                                                  │
//! │  (EventSink)                                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ResourceManager (pure logic)                │    │
//! │  │  Sequencer · PNet session · Decision · Tracker         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use ccs_parent::adapters::hardware::HardwareAdapter;
use ccs_parent::adapters::log_sink::LogEventSink;
use ccs_parent::adapters::nvs::NvsAdapter;
use ccs_parent::adapters::rs485::Rs485Bus;
use ccs_parent::adapters::time::{Esp32TimeAdapter, MidnightClock};
use ccs_parent::app::ports::StatePort;
use ccs_parent::app::service::ResourceManager;
use ccs_parent::config::PersistedState;
use ccs_parent::drivers::gpio::GpioOutput;
use ccs_parent::drivers::uart::PnetUart;
use ccs_parent::drivers::{hw_init, watchdog::Watchdog};
use ccs_parent::pins;
use ccs_parent::sensors::interior::{Calibration, InteriorSensors};

/// Status line every this many steps (one full sequencer pass).
const STATUS_EVERY_STEPS: u64 = ccs_parent::sequencer::STEP_COUNT as u64;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CCS Parent v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Load persisted state from NVS (or defaults) ────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let state = match nvs.load_state() {
        Ok(state) => {
            info!("State loaded from NVS");
            state
        }
        Err(e) => {
            warn!("NVS state load failed ({}), using defaults", e);
            PersistedState::default()
        }
    };
    let config = state.config;

    // ── 4. Construct adapters ─────────────────────────────────
    let mut bus = Rs485Bus::new(
        PnetUart::new(pins::PNET_UART_PORT),
        GpioOutput::new(pins::PNET_DE_GPIO),
    );
    let mut hw = HardwareAdapter::new(
        InteriorSensors::new(Calibration::default()),
        GpioOutput::new(pins::PARENT_RELAY1_GPIO),
        GpioOutput::new(pins::PARENT_RELAY2_GPIO),
        MidnightClock::new(Esp32TimeAdapter::new()),
    );
    hw.all_off();
    let mut log_sink = LogEventSink::new();

    // ── 5. Construct the resource manager ─────────────────────
    let mut app = ResourceManager::restore(state);
    app.start(&mut log_sink);

    let watchdog = Watchdog::new(config.step_period_ms);
    let time = Esp32TimeAdapter::new();

    info!("System ready. Entering step loop ({} ms).", config.step_period_ms);

    // ── 6. Step loop ──────────────────────────────────────────
    loop {
        let started_ms = time.uptime_ms();

        if let Some(report) = app.tick(&mut bus, &mut hw, &mut log_sink) {
            if report.result.is_err() {
                info!("Step {:2} -> {}", report.step.index, report.code());
            }
        }

        if app.tick_count() % STATUS_EVERY_STEPS == 0 {
            log_sink.log_status(&app.status_snapshot());
        }

        // Config auto-save (5s debounce after last change).
        app.auto_save_if_needed(&nvs);

        watchdog.feed();

        let spent_ms = time.uptime_ms().saturating_sub(started_ms);
        let period_ms = u64::from(app.config().step_period_ms);
        std::thread::sleep(std::time::Duration::from_millis(
            period_ms.saturating_sub(spent_ms),
        ));
    }
}
