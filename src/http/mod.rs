//! HTTP facade and the transport it drives.

mod client;
mod transport;

pub use client::HttpEasy;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse, resolve_url};
