//! PNet: the parent's polling protocol to its child nodes.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      PNet Stack                          │
//! │                                                          │
//! │  ┌──────────────┐   ┌──────────┐   ┌──────────────────┐ │
//! │  │ BusTransport │──▶│  Codec   │──▶│  NodeSession     │ │
//! │  │ (trait)      │   │ (lines)  │   │  → NodeTable     │ │
//! │  └──────────────┘   └──────────┘   └──────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every exchange is one CR-terminated ASCII request from the parent and
//! at most one CR-terminated response from the addressed child.

pub mod codec;
pub mod session;
pub mod transport;
