//! Adapter implementations of the ports.

pub mod outbound;
