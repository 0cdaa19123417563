use std::io::{self, Error, ErrorKind, Write};
use std::mem;

use socket2::{Domain, SockAddr, Socket};

/// Somewhere finished frames go.
pub trait Transmit {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Raw `AF_PACKET` socket bound to one interface. Frames are sent verbatim,
/// link header and trailing FCS included.
pub struct RawLinkSocket {
    socket: Socket,
}

impl RawLinkSocket {
    pub fn bind(ifindex: u32) -> io::Result<Self> {
        // No protocol: this socket only ever sends, so the kernel delivers nothing to it
        let stype = socket2::Type::raw().cloexec();
        let socket = Socket::new(Domain::from(libc::AF_PACKET), stype, None)?;

        let mut sll: libc::sockaddr_ll = unsafe { mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        sll.sll_ifindex = ifindex as i32;
        let sock_addr = unsafe {
            SockAddr::from_raw_parts(
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        socket.bind(&sock_addr)?;

        Ok(RawLinkSocket { socket })
    }
}

impl Transmit for RawLinkSocket {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        let sent = self.socket.send(frame)?;
        if sent != frame.len() {
            return Err(Error::new(
                ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, frame.len()),
            ));
        }
        Ok(())
    }
}

/// Dry-run sink: one line of lower-case hex per frame.
pub struct HexDump<W: Write> {
    out: W,
}

impl<W: Write> HexDump<W> {
    pub fn new(out: W) -> Self {
        HexDump { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Transmit for HexDump<W> {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        let line: String = frame.iter().map(|b| format!("{:02x}", b)).collect();
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }
}
