//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                  |
//! |------------|---------------------|------------------------------|
//! | `hardware` | InteriorSensorPort  | ESP32 ADC (MCP9700A, HIH5030)|
//! |            | ParentRelayPort     | GPIO relay drivers           |
//! |            | ClockPort           | `time::MidnightClock`        |
//! | `log_sink` | EventSink           | Serial log output            |
//! | `nvs`      | StatePort           | NVS / in-memory store        |
//! | `rs485`    | BusTransport        | UART1 + RS-485 DE pin        |
//! | `time`     | ClockPort           | ESP32 timer + wall clock     |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod rs485;
pub mod time;
