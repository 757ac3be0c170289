//! Socket Waitset Module
//!
//! Blocks a receive thread until one of a dynamic set of sockets becomes
//! readable. Each member pairs a caller-chosen connection token with a
//! socket handle. An internal trigger pair lets any thread wake a blocked
//! [`SockWaitset::wait`], for instance after changing membership.
//!
//! Slot 0 of every select belongs to the trigger; user entries are numbered
//! from 0 in the order they were added, with [`SockWaitset::remove`] moving
//! the last entry into the vacated slot.

use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream as TriggerStream;
#[cfg(windows)]
use std::net::TcpStream as TriggerStream;

use entities_socket_common::{SockResult, SocketError};
use log::{debug, warn};

use crate::config::WaitsetConfig;
use crate::handle::SocketHandle;
use crate::select::{self, is_selectable, HandleSet};

#[cfg(unix)]
fn trigger_pair() -> SockResult<(TriggerStream, TriggerStream)> {
    Ok(TriggerStream::pair()?)
}

#[cfg(windows)]
fn trigger_pair() -> SockResult<(TriggerStream, TriggerStream)> {
    use std::net::{Ipv4Addr, TcpListener};

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    let writer = TriggerStream::connect(listener.local_addr()?)?;
    let (reader, _) = listener.accept()?;
    Ok((reader, writer))
}

#[cfg(unix)]
fn is_interrupted(err: &SocketError) -> bool {
    matches!(err.os_error(), Some(code) if code == libc::EINTR || code == libc::EAGAIN)
}

#[cfg(windows)]
fn is_interrupted(err: &SocketError) -> bool {
    use windows_sys::Win32::Networking::WinSock::{WSAEINTR, WSAEWOULDBLOCK};
    matches!(err.os_error(), Some(code) if code == WSAEINTR as i32 || code == WSAEWOULDBLOCK as i32)
}

/// Socket waitset
///
/// `C` is the connection token reported back by [`WaitsetEvents`]; tokens are
/// compared with `==` to detect duplicates and to find entries to remove.
pub struct SockWaitset<C> {
    reader: TriggerStream,
    writer: TriggerStream,
    entries: Mutex<Vec<(C, SocketHandle)>>,
    config: WaitsetConfig,
}

impl<C: Clone + PartialEq> SockWaitset<C> {
    /// Create an empty waitset with the default configuration
    pub fn new() -> SockResult<Self> {
        Self::with_config(WaitsetConfig::default())
    }

    /// Create an empty waitset
    pub fn with_config(config: WaitsetConfig) -> SockResult<Self> {
        let (reader, writer) = trigger_pair()?;
        // A full trigger buffer already guarantees a wakeup.
        writer.set_nonblocking(true)?;
        let growth = config.growth.max(1);
        debug!(
            "created waitset with trigger {:?}",
            SocketHandle::of(&reader)
        );
        Ok(Self {
            reader,
            writer,
            entries: Mutex::new(Vec::with_capacity(growth)),
            config: WaitsetConfig { growth },
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(C, SocketHandle)>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a connection
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Added
    /// * `Ok(false)` - `conn` was already a member; nothing changed
    /// * `Err(SocketError::Invalid)` - `handle` cannot be waited on
    pub fn add(&self, conn: C, handle: SocketHandle) -> SockResult<bool> {
        if !is_selectable(handle) {
            return Err(SocketError::Invalid);
        }
        let mut entries = self.lock();
        if entries.iter().any(|(c, _)| *c == conn) {
            return Ok(false);
        }
        if entries.len() == entries.capacity() {
            entries.reserve_exact(self.config.growth);
        }
        entries.push((conn, handle));
        Ok(true)
    }

    /// Remove a connection, moving the last entry into its slot
    ///
    /// Returns whether `conn` was a member.
    pub fn remove(&self, conn: &C) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|(c, _)| c == conn) {
            Some(idx) => {
                entries.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    /// Keep only the first `index` entries
    pub fn purge(&self, index: usize) {
        self.lock().truncate(index);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the waitset has no entries
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wake a thread blocked in [`SockWaitset::wait`]
    ///
    /// Failure to write the trigger is logged, not returned.
    pub fn trigger(&self) {
        match (&self.writer).write(&[0u8]) {
            Ok(1) => {}
            Ok(n) => warn!("waitset trigger wrote {} bytes", n),
            Err(err) => match SocketError::from(err) {
                SocketError::WouldBlock => {}
                err => warn!("waitset trigger failed: {}", err),
            },
        }
    }

    /// Block until a member is readable or the waitset is triggered
    pub fn wait(&self) -> SockResult<WaitsetEvents<C>> {
        self.wait_timeout(None)
    }

    /// [`SockWaitset::wait`] with an upper bound on the blocking time
    ///
    /// Membership is snapshotted on entry; changes made while waiting take
    /// effect on the next call.
    ///
    /// # Returns
    ///
    /// * `Ok(events)` - Readable entries; empty on timeout or when only the
    ///   trigger fired
    /// * `Err(SocketError)` - select failed for a reason other than an
    ///   interruption
    pub fn wait_timeout(&self, timeout: Option<Duration>) -> SockResult<WaitsetEvents<C>> {
        let snapshot = self.lock().clone();
        let trigger = SocketHandle::of(&self.reader);

        let mut ready = HandleSet::new();
        let n = loop {
            ready.clear();
            ready.insert(trigger)?;
            for (_, handle) in &snapshot {
                ready.insert(*handle)?;
            }
            match select::wait(Some(&mut ready), None, None, timeout) {
                Ok(n) => break n,
                Err(err) if is_interrupted(&err) => continue,
                Err(err) => {
                    warn!("waitset select failed: {}", err);
                    return Err(err);
                }
            }
        };

        if n > 0 && ready.contains(trigger) {
            let mut buf = [0u8; 1];
            if let Err(err) = (&self.reader).read_exact(&mut buf) {
                warn!("waitset trigger read failed: {}", err);
            }
        }

        Ok(WaitsetEvents {
            entries: snapshot,
            ready,
            index: 0,
        })
    }
}

impl<C> std::fmt::Debug for SockWaitset<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SockWaitset")
            .field("trigger", &SocketHandle::of(&self.reader))
            .field("config", &self.config)
            .finish()
    }
}

/// Outcome of one [`SockWaitset::wait`]
pub struct WaitsetEvents<C> {
    entries: Vec<(C, SocketHandle)>,
    ready: HandleSet,
    index: usize,
}

impl<C: Clone> WaitsetEvents<C> {
    /// Next readable entry as `(index, conn)`, or `None` once exhausted
    pub fn next_event(&mut self) -> Option<(usize, C)> {
        while self.index < self.entries.len() {
            let idx = self.index;
            self.index += 1;
            let (conn, handle) = &self.entries[idx];
            if self.ready.contains(*handle) {
                return Some((idx, conn.clone()));
            }
        }
        None
    }
}

impl<C: Clone> Iterator for WaitsetEvents<C> {
    type Item = (usize, C);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}
