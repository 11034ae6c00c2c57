//! Parent-local sensor drivers.
//!
//! Child sensors are read over PNet; only the parent's own interior
//! temperature and humidity are sampled here.

pub mod interior;
