//! HTTP layer for the `RelayTV` delivery service.

pub mod http;
