//! Clients for external HTTP APIs

pub mod paysim;
