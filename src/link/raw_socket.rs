use super::{Link, LinkError};
use crate::frame::MacAddr;
use std::ffi::CString;
use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

const ETH_P_ALL: u16 = 0x0003;
const PACKET_OUTGOING: u8 = 4;
const RECV_BUF_LEN: usize = 1 << 16;

/// `AF_PACKET` raw socket bound to one named interface.
///
/// Receives every frame seen on the interface; frames this host transmits are
/// skipped so a request is never mistaken for its own reply.
#[derive(Debug)]
pub struct RawSocket {
    fd: libc::c_int,
    iface: String,
    ifindex: libc::c_int,
}

impl RawSocket {
    /// Open and bind a socket to `iface`. Needs `CAP_NET_RAW`.
    pub fn open(iface: &str) -> Result<Self, LinkError> {
        if iface.is_empty() || iface.len() >= libc::IF_NAMESIZE {
            return Err(LinkError::BadInterface(iface.to_string()));
        }
        let name = CString::new(iface).map_err(|_| LinkError::BadInterface(iface.to_string()))?;

        let ifindex = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if ifindex == 0 {
            return Err(io_error(iface, io::Error::last_os_error()));
        }

        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                ETH_P_ALL.to_be() as libc::c_int,
            )
        };
        if fd == -1 {
            return Err(io_error(iface, io::Error::last_os_error()));
        }

        let sock = RawSocket {
            fd,
            iface: iface.to_string(),
            ifindex: ifindex as libc::c_int,
        };
        sock.bind()?;
        tracing::debug!(iface, ifindex, "raw socket bound");
        Ok(sock)
    }

    fn bind(&self) -> Result<(), LinkError> {
        let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as u16;
        addr.sll_protocol = ETH_P_ALL.to_be();
        addr.sll_ifindex = self.ifindex;

        let res = unsafe {
            libc::bind(
                self.fd,
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if res == -1 {
            return Err(self.last_error());
        }
        Ok(())
    }

    pub fn interface(&self) -> &str {
        &self.iface
    }

    /// Link address of the bound interface, as reported by the OS.
    pub fn hardware_addr(&self) -> Result<MacAddr, LinkError> {
        #[repr(C)]
        struct Request {
            name: [libc::c_char; libc::IF_NAMESIZE],
            hwaddr: libc::sockaddr,
            _pad: [u8; 8],
        }

        let mut req = Request {
            name: [0; libc::IF_NAMESIZE],
            hwaddr: unsafe { mem::zeroed() },
            _pad: [0; 8],
        };
        for (dst, b) in req.name.iter_mut().zip(self.iface.as_bytes()) {
            *dst = *b as libc::c_char;
        }

        let res = unsafe { libc::ioctl(self.fd, libc::SIOCGIFHWADDR, &mut req as *mut Request) };
        if res == -1 {
            return Err(self.last_error());
        }

        let mut mac = [0u8; 6];
        for (m, b) in mac.iter_mut().zip(req.hwaddr.sa_data.iter()) {
            *m = *b as u8;
        }
        Ok(MacAddr(mac))
    }

    fn last_error(&self) -> LinkError {
        io_error(&self.iface, io::Error::last_os_error())
    }
}

fn io_error(iface: &str, source: io::Error) -> LinkError {
    LinkError::Io {
        iface: iface.to_string(),
        source,
    }
}

impl Link for RawSocket {
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        let n = unsafe {
            libc::send(
                self.fd,
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
            )
        };
        if n == -1 {
            return Err(self.last_error());
        }
        if n as usize != frame.len() {
            return Err(io_error(
                &self.iface,
                io::Error::new(io::ErrorKind::WriteZero, "short raw frame write"),
            ));
        }
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LinkError> {
        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; RECV_BUF_LEN];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
            let mut pfd = libc::pollfd {
                fd: self.fd,
                events: libc::POLLIN,
                revents: 0,
            };

            let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
            if ready == -1 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(io_error(&self.iface, err));
            }
            if ready == 0 {
                return Ok(None);
            }

            let mut from: libc::sockaddr_ll = unsafe { mem::zeroed() };
            let mut from_len = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
            let n = unsafe {
                libc::recvfrom(
                    self.fd,
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                    0,
                    &mut from as *mut libc::sockaddr_ll as *mut libc::sockaddr,
                    &mut from_len,
                )
            };
            if n == -1 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(io_error(&self.iface, err));
            }
            if from.sll_pkttype == PACKET_OUTGOING {
                tracing::trace!(len = n, "skipping own outgoing frame");
                continue;
            }
            buf.truncate(n as usize);
            return Ok(Some(buf));
        }
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
