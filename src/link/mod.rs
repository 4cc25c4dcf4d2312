//! Raw frame transport.
//!
//! The exchange engine only needs "send one frame" and "receive the next frame with a
//! timeout" on a named interface; [`Link`] is that capability. [`RawSocket`] provides it
//! on Linux through an `AF_PACKET` socket, [`Loopback`] is a scripted in-memory double.

use std::time::Duration;

mod loopback;
#[cfg(target_os = "linux")]
mod raw_socket;

pub use loopback::Loopback;
#[cfg(target_os = "linux")]
pub use raw_socket::RawSocket;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("interface {iface}: {source}")]
    Io {
        iface: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid interface name {0:?}")]
    BadInterface(String),
}

pub trait Link {
    /// Transmit one complete frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError>;

    /// Next inbound frame, or `None` if nothing arrives within `timeout`.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LinkError>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        (**self).send(frame)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LinkError> {
        (**self).recv(timeout)
    }
}
