//! Owning handles to host OS resources: files and IPv4 sockets.
//!
//! Both carry a `closed` flag and idempotent `close`; operations on a
//! closed handle surface as thrown runtime errors, carrying the
//! underlying system-error string where one exists.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Socket, Type};

/// An open (or closed) file plus the path and mode it was opened with.
pub struct FileHandle {
    pub path: String,
    pub mode: String,
    file: Option<File>,
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl FileHandle {
    /// Open with a C-style mode string: `r`, `w`, `a`, `r+`, `w+`, `a+`.
    pub fn open(path: &str, mode: &str) -> Result<Self, String> {
        let mut options = OpenOptions::new();
        match mode {
            "r" => options.read(true),
            "w" => options.write(true).create(true).truncate(true),
            "a" => options.append(true).create(true),
            "r+" => options.read(true).write(true),
            "w+" => options.read(true).write(true).create(true).truncate(true),
            "a+" => options.read(true).append(true).create(true),
            _ => return Err(format!("invalid file mode `{}`", mode)),
        };
        let file = options
            .open(path)
            .map_err(|e| format!("cannot open {}: {}", path, e))?;
        Ok(Self {
            path: path.to_string(),
            mode: mode.to_string(),
            file: Some(file),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn live(&mut self) -> Result<&mut File, String> {
        self.file
            .as_mut()
            .ok_or_else(|| "operation on closed file".to_string())
    }

    /// Read `n` bytes, or to EOF when `n` is None.
    pub fn read(&mut self, n: Option<usize>) -> Result<Vec<u8>, String> {
        let file = self.live()?;
        let mut data = Vec::new();
        match n {
            Some(limit) => {
                data.resize(limit, 0);
                let read = file.read(&mut data).map_err(|e| e.to_string())?;
                data.truncate(read);
            }
            None => {
                file.read_to_end(&mut data).map_err(|e| e.to_string())?;
            }
        }
        Ok(data)
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, String> {
        let file = self.live()?;
        file.write(bytes).map_err(|e| e.to_string())
    }

    pub fn seek(&mut self, pos: u64) -> Result<u64, String> {
        let file = self.live()?;
        file.seek(SeekFrom::Start(pos)).map_err(|e| e.to_string())
    }

    pub fn tell(&mut self) -> Result<u64, String> {
        let file = self.live()?;
        file.stream_position().map_err(|e| e.to_string())
    }

    /// Idempotent: closing a closed file is a no-op.
    pub fn close(&mut self) {
        self.file.take();
    }
}

/// Socket role, IPv4 only. A socket starts unbound and becomes a
/// listener, a connected stream, or a datagram endpoint.
pub enum SocketKind {
    /// `socket(AF_INET, SOCK_STREAM)` before bind/connect.
    TcpUnbound,
    /// `socket(AF_INET, SOCK_DGRAM)` before bind.
    UdpUnbound,
    Listener(TcpListener),
    Stream(TcpStream),
    Datagram(UdpSocket),
    Closed,
}

pub struct SocketHandle {
    pub kind: SocketKind,
    /// Address recorded by `bind`, consumed by `listen`.
    pub bound_addr: Option<String>,
    /// `SO_REUSEADDR`, applied when the underlying socket is bound.
    reuse_addr: bool,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            SocketKind::TcpUnbound => "tcp",
            SocketKind::UdpUnbound => "udp",
            SocketKind::Listener(_) => "listener",
            SocketKind::Stream(_) => "stream",
            SocketKind::Datagram(_) => "datagram",
            SocketKind::Closed => "closed",
        };
        f.debug_struct("SocketHandle").field("kind", &kind).finish()
    }
}

impl SocketHandle {
    pub fn new_tcp() -> Self {
        Self {
            kind: SocketKind::TcpUnbound,
            bound_addr: None,
            reuse_addr: false,
            timeout: None,
        }
    }

    pub fn new_udp() -> Self {
        Self {
            kind: SocketKind::UdpUnbound,
            bound_addr: None,
            reuse_addr: false,
            timeout: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.kind, SocketKind::Closed)
    }

    /// Record (TCP) or establish (UDP) the local address.
    pub fn bind(&mut self, host: &str, port: u16) -> Result<(), String> {
        let addr = format!("{}:{}", host, port);
        match self.kind {
            SocketKind::TcpUnbound => {
                // TCP defers the actual bind to listen(), matching the
                // bind-then-listen calling convention.
                self.bound_addr = Some(addr);
                Ok(())
            }
            SocketKind::UdpUnbound => {
                let socket = self.open_bound(&addr, Type::DGRAM)?;
                let socket: UdpSocket = socket.into();
                self.apply_timeout_udp(&socket)?;
                self.kind = SocketKind::Datagram(socket);
                Ok(())
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("socket already bound".to_string()),
        }
    }

    pub fn listen(&mut self, backlog: u32) -> Result<(), String> {
        match &self.kind {
            SocketKind::TcpUnbound => {
                let addr = self
                    .bound_addr
                    .clone()
                    .ok_or_else(|| "listen before bind".to_string())?;
                let socket = self.open_bound(&addr, Type::STREAM)?;
                socket
                    .listen(backlog.min(i32::MAX as u32) as i32)
                    .map_err(|e| e.to_string())?;
                self.kind = SocketKind::Listener(socket.into());
                Ok(())
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("listen on non-TCP socket".to_string()),
        }
    }

    /// Open an IPv4 socket, apply `SO_REUSEADDR` per `setsockopt`, and
    /// bind it. Options must land before the bind to take effect.
    fn open_bound(&self, addr: &str, ty: Type) -> Result<Socket, String> {
        let sock_addr: SocketAddr = addr
            .to_socket_addrs()
            .map_err(|e| e.to_string())?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| format!("no IPv4 address for {}", addr))?;
        let socket = Socket::new(Domain::IPV4, ty, None).map_err(|e| e.to_string())?;
        socket
            .set_reuse_address(self.reuse_addr)
            .map_err(|e| e.to_string())?;
        socket.bind(&sock_addr.into()).map_err(|e| e.to_string())?;
        Ok(socket)
    }

    /// Block for one inbound connection; returns a new stream handle and
    /// the peer address.
    pub fn accept(&mut self) -> Result<(SocketHandle, String), String> {
        match &self.kind {
            SocketKind::Listener(listener) => {
                let (stream, peer) = listener.accept().map_err(|e| e.to_string())?;
                let handle = SocketHandle {
                    kind: SocketKind::Stream(stream),
                    bound_addr: None,
                    reuse_addr: false,
                    timeout: self.timeout,
                };
                handle.apply_timeout()?;
                Ok((handle, peer.to_string()))
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("accept on non-listening socket".to_string()),
        }
    }

    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), String> {
        match self.kind {
            SocketKind::TcpUnbound => {
                let stream =
                    TcpStream::connect((host, port)).map_err(|e| e.to_string())?;
                self.kind = SocketKind::Stream(stream);
                self.apply_timeout()?;
                Ok(())
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("connect on non-TCP socket".to_string()),
        }
    }

    pub fn send(&mut self, bytes: &[u8]) -> Result<usize, String> {
        match &mut self.kind {
            SocketKind::Stream(stream) => stream.write(bytes).map_err(|e| e.to_string()),
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("send on unconnected socket".to_string()),
        }
    }

    pub fn recv(&mut self, max: usize) -> Result<Vec<u8>, String> {
        match &mut self.kind {
            SocketKind::Stream(stream) => {
                let mut data = vec![0; max];
                let read = stream.read(&mut data).map_err(|e| e.to_string())?;
                data.truncate(read);
                Ok(data)
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("recv on unconnected socket".to_string()),
        }
    }

    pub fn sendto(&mut self, bytes: &[u8], host: &str, port: u16) -> Result<usize, String> {
        match &mut self.kind {
            SocketKind::Datagram(socket) => socket
                .send_to(bytes, (host, port))
                .map_err(|e| e.to_string()),
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("sendto on non-datagram socket".to_string()),
        }
    }

    /// Receive one datagram; returns the payload and the sender address.
    pub fn recvfrom(&mut self, max: usize) -> Result<(Vec<u8>, String), String> {
        match &mut self.kind {
            SocketKind::Datagram(socket) => {
                let mut data = vec![0; max];
                let (read, peer) = socket.recv_from(&mut data).map_err(|e| e.to_string())?;
                data.truncate(read);
                Ok((data, peer.to_string()))
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("recvfrom on non-datagram socket".to_string()),
        }
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), String> {
        self.timeout = timeout;
        self.apply_timeout()
    }

    /// `SO_REUSEADDR` takes effect at bind time, so it can only be set
    /// while the socket is still unbound.
    pub fn set_reuse_addr(&mut self, on: bool) -> Result<(), String> {
        match self.kind {
            SocketKind::TcpUnbound | SocketKind::UdpUnbound => {
                self.reuse_addr = on;
                Ok(())
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("reuseaddr must be set before bind".to_string()),
        }
    }

    pub fn set_nodelay(&mut self, on: bool) -> Result<(), String> {
        match &self.kind {
            SocketKind::Stream(stream) => {
                stream.set_nodelay(on).map_err(|e| e.to_string())
            }
            SocketKind::Closed => Err("operation on closed socket".to_string()),
            _ => Err("nodelay on non-stream socket".to_string()),
        }
    }

    fn apply_timeout(&self) -> Result<(), String> {
        if let SocketKind::Stream(stream) = &self.kind {
            stream
                .set_read_timeout(self.timeout)
                .and_then(|_| stream.set_write_timeout(self.timeout))
                .map_err(|e| e.to_string())?;
        }
        if let SocketKind::Datagram(socket) = &self.kind {
            self.apply_timeout_udp(socket)?;
        }
        Ok(())
    }

    fn apply_timeout_udp(&self, socket: &UdpSocket) -> Result<(), String> {
        socket
            .set_read_timeout(self.timeout)
            .and_then(|_| socket.set_write_timeout(self.timeout))
            .map_err(|e| e.to_string())
    }

    /// Idempotent close.
    pub fn close(&mut self) {
        self.kind = SocketKind::Closed;
    }
}
