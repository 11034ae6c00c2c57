//! RS-485 PNet bus adapter.
//!
//! Implements [`BusTransport`] over a byte-level [`SerialPort`] and the
//! transceiver's driver-enable pin (any `embedded-hal` [`OutputPin`]).
//!
//! ```text
//!   NodeSession ──▶ BusTransport ──▶ Rs485Bus ──▶ SerialPort (UART)
//!                                        └──────▶ OutputPin  (DE, /RE)
//! ```
//!
//! The driver is enabled only between `set_transmit(true)` and
//! `set_transmit(false)`; `send_line` waits for the shift register to
//! drain, so the session can release the bus immediately afterwards.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::adapters::time::Esp32TimeAdapter;
use crate::drivers::uart::PnetUart;
use crate::pnet::codec::{Line, LineAssembler};
use crate::pnet::transport::BusTransport;

/// Wait for the last stop bit before the DE line drops.
const TX_DRAIN_TIMEOUT_MS: u32 = 100;

/// Byte-level serial port under the bus.
pub trait SerialPort {
    type Error: core::fmt::Debug;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Block until every queued byte has left the wire.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// One byte, or `None` once `timeout_ms` passes without input.
    fn read_byte(&mut self, timeout_ms: u32) -> Option<u8>;

    /// Discard unread input (echo of our own request, line noise).
    fn clear_input(&mut self);
}

impl SerialPort for PnetUart {
    type Error = i32;

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), i32> {
        while !bytes.is_empty() {
            match self.write(bytes)? {
                0 => return Err(-1),
                n => bytes = &bytes[n.min(bytes.len())..],
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), i32> {
        self.wait_tx_done(TX_DRAIN_TIMEOUT_MS)
    }

    fn read_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        PnetUart::read_byte(self, timeout_ms)
    }

    fn clear_input(&mut self) {
        PnetUart::clear_input(self);
    }
}

/// Half-duplex RS-485 bus.
pub struct Rs485Bus<S, D> {
    serial: S,
    driver_enable: D,
    assembler: LineAssembler,
    time: Esp32TimeAdapter,
}

impl<S: SerialPort, D: OutputPin> Rs485Bus<S, D> {
    pub fn new(serial: S, mut driver_enable: D) -> Self {
        if driver_enable.set_low().is_err() {
            warn!("PNET: failed to release bus driver at init");
        }
        Self {
            serial,
            driver_enable,
            assembler: LineAssembler::new(),
            time: Esp32TimeAdapter::new(),
        }
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn driver_enable(&self) -> &D {
        &self.driver_enable
    }
}

impl<S: SerialPort, D: OutputPin> BusTransport for Rs485Bus<S, D> {
    type Error = S::Error;

    fn set_transmit(&mut self, enable: bool) {
        if enable {
            self.serial.clear_input();
            self.assembler.reset();
        }
        let result = if enable {
            self.driver_enable.set_high()
        } else {
            self.driver_enable.set_low()
        };
        if result.is_err() {
            warn!("PNET: driver-enable pin write failed (enable={})", enable);
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), S::Error> {
        debug!("PNET tx: {:?}", line);
        self.serial.write_all(line.as_bytes())?;
        self.serial.flush()
    }

    fn receive_line(&mut self, timeout_ms: u32) -> Option<Line> {
        let deadline = self.time.uptime_ms() + u64::from(timeout_ms);
        loop {
            let now = self.time.uptime_ms();
            if now >= deadline {
                return None;
            }
            let remaining = (deadline - now) as u32;
            let byte = self.serial.read_byte(remaining)?;
            if let Some(line) = self.assembler.push(byte) {
                debug!("PNET rx: {:?}", line.as_str());
                return Some(line);
            }
        }
    }
}
