//! Ports for the storage subsystem.

pub mod outbound;
