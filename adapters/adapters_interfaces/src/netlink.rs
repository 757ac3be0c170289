//! Interface Index by Netlink
//!
//! Dumps the kernel link table once over an `AF_NETLINK`/`NETLINK_ROUTE`
//! socket (`RTM_GETLINK`) and resolves interface names against it.

use std::collections::HashMap;
use std::mem::MaybeUninit;

use entities_socket_common::{SockResult, SocketError};
use log::trace;
use socket2::{Domain, Protocol, Socket, Type};

use crate::enumerator::InterfaceEnumerator;
use crate::ifaddrs;
use crate::interface::{InterfaceAddress, NO_INDEX};

const NLMSG_HDRLEN: usize = 16;
const IFINFOMSG_LEN: usize = 16;
const NLA_HDRLEN: usize = 4;
const NLA_TYPE_MASK: u16 = 0x3fff;

const NLMSG_ERROR: u16 = libc::NLMSG_ERROR as u16;
const NLMSG_DONE: u16 = libc::NLMSG_DONE as u16;
const RTM_NEWLINK: u16 = libc::RTM_NEWLINK as u16;
const RTM_GETLINK: u16 = libc::RTM_GETLINK as u16;
const IFLA_IFNAME: u16 = libc::IFLA_IFNAME as u16;
const DUMP_FLAGS: u16 = (libc::NLM_F_REQUEST | libc::NLM_F_DUMP) as u16;

const RECV_BUFFER_SIZE: usize = 64 * 1024;

fn align(len: usize) -> usize {
    (len + 3) & !3
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_ne_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_ne_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn malformed() -> SocketError {
    SocketError::Fail(libc::EPROTO)
}

fn dump_request(seq: u32) -> Vec<u8> {
    let len = (NLMSG_HDRLEN + IFINFOMSG_LEN) as u32;
    let mut req = Vec::with_capacity(len as usize);
    req.extend_from_slice(&len.to_ne_bytes());
    req.extend_from_slice(&RTM_GETLINK.to_ne_bytes());
    req.extend_from_slice(&DUMP_FLAGS.to_ne_bytes());
    req.extend_from_slice(&seq.to_ne_bytes());
    req.extend_from_slice(&0u32.to_ne_bytes());
    // ifinfomsg with ifi_family = AF_UNSPEC
    req.resize(len as usize, 0);
    req
}

/// Record the name and index carried by one `RTM_NEWLINK` message
fn parse_link(msg: &[u8], links: &mut HashMap<String, u32>) {
    if msg.len() < NLMSG_HDRLEN + IFINFOMSG_LEN {
        return;
    }
    let index = read_u32(msg, NLMSG_HDRLEN + 4);

    let mut at = NLMSG_HDRLEN + IFINFOMSG_LEN;
    while at + NLA_HDRLEN <= msg.len() {
        let len = read_u16(msg, at) as usize;
        let kind = read_u16(msg, at + 2) & NLA_TYPE_MASK;
        if len < NLA_HDRLEN || at + len > msg.len() {
            break;
        }
        if kind == IFLA_IFNAME {
            let payload = &msg[at + NLA_HDRLEN..at + len];
            let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
            let name = String::from_utf8_lossy(&payload[..end]).into_owned();
            trace!("netlink link {} index {}", name, index);
            links.insert(name, index);
            return;
        }
        at += align(len);
    }
}

/// Parse one datagram of a link dump into `links`
///
/// Returns `Ok(true)` once the end-of-dump message has been seen.
fn parse_dump(buf: &[u8], links: &mut HashMap<String, u32>) -> SockResult<bool> {
    let mut at = 0;
    while at + NLMSG_HDRLEN <= buf.len() {
        let len = read_u32(buf, at) as usize;
        if len < NLMSG_HDRLEN || at + len > buf.len() {
            return Err(malformed());
        }
        let msg = &buf[at..at + len];
        match read_u16(msg, 4) {
            NLMSG_DONE => return Ok(true),
            NLMSG_ERROR => {
                if msg.len() < NLMSG_HDRLEN + 4 {
                    return Err(malformed());
                }
                // Negated errno; zero acknowledges the request
                match read_u32(msg, NLMSG_HDRLEN) as i32 {
                    0 => {}
                    code if code < 0 && code != i32::MIN => {
                        return Err(SocketError::Fail(-code))
                    }
                    _ => return Err(malformed()),
                }
            }
            RTM_NEWLINK => parse_link(msg, links),
            _ => {}
        }
        at += align(len);
    }
    Ok(false)
}

/// Dump the kernel link table as a name to index map
pub fn link_indices() -> SockResult<HashMap<String, u32>> {
    let socket = Socket::new(
        Domain::from(libc::AF_NETLINK),
        Type::RAW,
        Some(Protocol::from(libc::NETLINK_ROUTE)),
    )?;
    socket.send(&dump_request(1))?;

    let mut links = HashMap::new();
    let mut buf = vec![MaybeUninit::<u8>::uninit(); RECV_BUFFER_SIZE];
    loop {
        let n = socket.recv(&mut buf)?;
        if n == 0 {
            return Err(malformed());
        }
        // SAFETY: `recv` initialized the first `n` bytes.
        let data = unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, n) };
        if parse_dump(data, &mut links)? {
            return Ok(links);
        }
    }
}

/// Enumerates interfaces, resolving indices from one netlink link dump
#[derive(Debug, Default)]
pub struct NetlinkEnumerator;

impl NetlinkEnumerator {
    /// Create the enumerator
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceEnumerator for NetlinkEnumerator {
    fn name(&self) -> &'static str {
        "netlink"
    }

    fn query(&self) -> SockResult<Vec<InterfaceAddress>> {
        let links = link_indices()?;
        ifaddrs::walk(|name| {
            let device = name.split(':').next().unwrap_or(name);
            Ok(links.get(device).copied().unwrap_or_else(|| {
                trace!("no link entry for {}", name);
                NO_INDEX
            }))
        })
    }
}
