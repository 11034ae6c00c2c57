//! GPIO / peripheral pin assignments for the CCS parent board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// PNet RS-485 bus (half-duplex transceiver on UART1)
// ---------------------------------------------------------------------------

/// UART peripheral carrying the PNet bus.
pub const PNET_UART_PORT: i32 = 1;
pub const PNET_UART_TX_GPIO: i32 = 17;
pub const PNET_UART_RX_GPIO: i32 = 18;
/// Digital output: HIGH = driver enabled (transmit), LOW = receive.
/// DE and /RE are tied together on the transceiver.
pub const PNET_DE_GPIO: i32 = 16;
pub const PNET_BAUD: u32 = 9600;
/// Driver RX ring buffer (bytes).
pub const PNET_RX_BUFFER: i32 = 256;

// ---------------------------------------------------------------------------
// Parent relays (AC / heater contactor drivers)
// ---------------------------------------------------------------------------

/// Digital output: HIGH = relay 1 energised.
pub const PARENT_RELAY1_GPIO: i32 = 38;
/// Digital output: HIGH = relay 2 energised.
pub const PARENT_RELAY2_GPIO: i32 = 39;

// ---------------------------------------------------------------------------
// Interior sensors (ADC1)
// ---------------------------------------------------------------------------

/// MCP9700A linear temperature sensor, ADC1 channel 4 (GPIO 5).
pub const INTERIOR_TEMP_ADC_GPIO: i32 = 5;
/// HIH5030 ratiometric humidity sensor, ADC1 channel 5 (GPIO 6).
pub const INTERIOR_RH_ADC_GPIO: i32 = 6;
