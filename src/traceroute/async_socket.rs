use std::io;
use std::io::Read;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

/// A non-blocking system socket driven by tokio readiness events.
///
/// Dropping the value deregisters and closes the underlying descriptor.
pub struct AsyncSocket {
    socket_async_fd: AsyncFd<SocketWrapper>,
}

impl AsyncSocket {
    /// Opening a raw socket requires the `CAP_NET_RAW` capability (or root);
    /// without it this returns a "permission denied" error.
    pub fn new(domain: Domain, ty: Type, protocol: Option<Protocol>) -> io::Result<Self> {
        let socket = SocketWrapper::new(domain, ty, protocol)?;

        let socket_async_fd = AsyncFd::new(socket)?;

        Ok(Self {
            socket_async_fd,
        })
    }

    pub async fn send_to(&self, buf: &[u8], socket_addr: SocketAddr) -> io::Result<usize> {
        self.socket_async_fd
            .async_io(Interest::WRITABLE, |socket| socket.send_to(buf, socket_addr))
            .await
    }

    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket_async_fd
            .async_io(Interest::READABLE, |socket| socket.recv(buf))
            .await
    }

    pub fn set_ttl(&self, ttl: u32) -> io::Result<()> {
        self.socket_async_fd.get_ref().set_ttl(ttl)
    }
}

struct SocketWrapper {
    socket: Socket,
}

impl SocketWrapper {
    fn new(domain: Domain, ty: Type, protocol: Option<Protocol>) -> io::Result<Self> {
        let socket = Socket::new(domain, ty, protocol)?;

        socket.set_nonblocking(true)?;

        Ok(Self { socket })
    }

    fn send_to(&self, buf: &[u8], socket_addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, &socket_addr.into())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.socket).read(buf)
    }

    fn set_ttl(&self, ttl: u32) -> io::Result<()> {
        self.socket.set_ttl(ttl)
    }
}

impl AsRawFd for SocketWrapper {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
