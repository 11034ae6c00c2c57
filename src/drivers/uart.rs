//! PNet UART driver.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: thin wrapper over the UART driver installed by hw_init.
//! On host/test: writes are discarded and reads always time out.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Byte-level access to the PNet UART.
pub struct PnetUart {
    #[allow(dead_code)]
    port: i32,
}

impl PnetUart {
    /// Port must already be installed by `hw_init::init_peripherals`.
    pub fn new(port: i32) -> Self {
        Self { port }
    }

    #[cfg(target_os = "espidf")]
    fn ticks(timeout_ms: u32) -> u32 {
        (timeout_ms * configTICK_RATE_HZ / 1000).max(1)
    }

    /// Queue bytes for transmission.  Returns the number accepted.
    #[cfg(target_os = "espidf")]
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, i32> {
        // SAFETY: driver installed at boot; buffer outlives the call.
        let n = unsafe { uart_write_bytes(self.port, bytes.as_ptr() as *const _, bytes.len()) };
        if n < 0 { Err(n) } else { Ok(n as usize) }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, i32> {
        Ok(bytes.len())
    }

    /// Block until the shift register is empty.
    #[cfg(target_os = "espidf")]
    pub fn wait_tx_done(&mut self, timeout_ms: u32) -> Result<(), i32> {
        let ret = unsafe { uart_wait_tx_done(self.port, Self::ticks(timeout_ms)) };
        if ret == ESP_OK { Ok(()) } else { Err(ret) }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn wait_tx_done(&mut self, _timeout_ms: u32) -> Result<(), i32> {
        Ok(())
    }

    /// One byte, or `None` once `timeout_ms` passes without input.
    #[cfg(target_os = "espidf")]
    pub fn read_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        let mut byte = 0u8;
        let n = unsafe {
            uart_read_bytes(self.port, (&raw mut byte).cast(), 1, Self::ticks(timeout_ms))
        };
        (n == 1).then_some(byte)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read_byte(&mut self, _timeout_ms: u32) -> Option<u8> {
        None
    }

    /// Drop anything already sitting in the RX ring buffer.
    #[cfg(target_os = "espidf")]
    pub fn clear_input(&mut self) {
        unsafe {
            uart_flush_input(self.port);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn clear_input(&mut self) {}
}
