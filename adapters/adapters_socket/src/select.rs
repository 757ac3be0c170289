//! Readiness Multiplexing Module
//!
//! Waits until any handle in a set becomes readable, writable or exceptional,
//! over the platform `select` call: `libc::select` on `fd_set` bitmaps on
//! Unix, Winsock `select` on `FD_SET` arrays on Windows. The sets are mutated
//! in place to hold only the ready members on return.

use std::time::Duration;

use entities_socket_common::{SockResult, SocketError};

use crate::handle::SocketHandle;

/// Set of socket handles passed to [`wait`]
#[cfg(unix)]
#[derive(Clone)]
pub struct HandleSet {
    fds: libc::fd_set,
    // Highest descriptor ever inserted, -1 when none.
    max: libc::c_int,
}

#[cfg(unix)]
impl HandleSet {
    /// Create an empty set
    pub fn new() -> Self {
        let mut fds = std::mem::MaybeUninit::<libc::fd_set>::uninit();
        // SAFETY: FD_ZERO initializes the whole set.
        let fds = unsafe {
            libc::FD_ZERO(fds.as_mut_ptr());
            fds.assume_init()
        };
        Self { fds, max: -1 }
    }

    /// Add a handle
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The handle is a member
    /// * `Err(SocketError::Invalid)` - Invalid handle, or a descriptor beyond
    ///   the platform set capacity
    pub fn insert(&mut self, handle: SocketHandle) -> SockResult<()> {
        if !is_selectable(handle) {
            return Err(SocketError::Invalid);
        }
        let fd = handle.as_raw();
        // SAFETY: `fd` is within 0..FD_SETSIZE.
        unsafe { libc::FD_SET(fd, &mut self.fds) };
        self.max = self.max.max(fd);
        Ok(())
    }

    /// Remove a handle; removing a non-member does nothing
    pub fn remove(&mut self, handle: SocketHandle) {
        if is_selectable(handle) {
            // SAFETY: `fd` is within 0..FD_SETSIZE.
            unsafe { libc::FD_CLR(handle.as_raw(), &mut self.fds) };
        }
    }

    /// Whether `handle` is a member
    pub fn contains(&self, handle: SocketHandle) -> bool {
        // SAFETY: `fd` is within 0..FD_SETSIZE.
        is_selectable(handle) && unsafe { libc::FD_ISSET(handle.as_raw(), &self.fds) }
    }

    /// Remove every member
    pub fn clear(&mut self) {
        // SAFETY: `self.fds` is a valid set.
        unsafe { libc::FD_ZERO(&mut self.fds) };
        self.max = -1;
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.handles().next().is_none()
    }

    /// Iterate over the members in ascending order
    pub fn handles(&self) -> impl Iterator<Item = SocketHandle> + '_ {
        (0..=self.max)
            .map(SocketHandle::from_raw)
            .filter(move |handle| self.contains(*handle))
    }

    fn nfds(&self) -> libc::c_int {
        self.max + 1
    }

    fn as_mut_ptr(&mut self) -> *mut libc::fd_set {
        &mut self.fds
    }
}

/// Whether `handle` can be stored in a [`HandleSet`]
#[cfg(unix)]
pub fn is_selectable(handle: SocketHandle) -> bool {
    handle.is_valid() && (handle.as_raw() as usize) < libc::FD_SETSIZE as usize
}

/// Longest timeout handed to the platform; anything longer blocks indefinitely
const MAX_TIMEOUT_SECS: u64 = 100_000_000;

fn bounded(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| t.as_secs() < MAX_TIMEOUT_SECS)
}

/// `FD_SET::fd_array` length
#[cfg(windows)]
const SET_CAPACITY: usize = 64;

/// Set of socket handles passed to [`wait`]
#[cfg(windows)]
#[derive(Clone, Default)]
pub struct HandleSet {
    handles: Vec<SocketHandle>,
}

#[cfg(windows)]
impl HandleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The handle is a member
    /// * `Err(SocketError::Invalid)` - Invalid handle, or the set is full
    pub fn insert(&mut self, handle: SocketHandle) -> SockResult<()> {
        if !is_selectable(handle) {
            return Err(SocketError::Invalid);
        }
        if !self.handles.contains(&handle) {
            if self.handles.len() == SET_CAPACITY {
                return Err(SocketError::Invalid);
            }
            self.handles.push(handle);
        }
        Ok(())
    }

    /// Remove a handle; removing a non-member does nothing
    pub fn remove(&mut self, handle: SocketHandle) {
        self.handles.retain(|h| *h != handle);
    }

    /// Whether `handle` is a member
    pub fn contains(&self, handle: SocketHandle) -> bool {
        self.handles.contains(&handle)
    }

    /// Remove every member
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterate over the members in insertion order
    pub fn handles(&self) -> impl Iterator<Item = SocketHandle> + '_ {
        self.handles.iter().copied()
    }

    fn to_fd_set(&self) -> windows_sys::Win32::Networking::WinSock::FD_SET {
        let mut fds = windows_sys::Win32::Networking::WinSock::FD_SET {
            fd_count: self.handles.len() as u32,
            fd_array: [0; SET_CAPACITY],
        };
        for (slot, handle) in fds.fd_array.iter_mut().zip(&self.handles) {
            *slot = handle.as_raw() as usize;
        }
        fds
    }

    fn retain_ready(&mut self, fds: &windows_sys::Win32::Networking::WinSock::FD_SET) {
        let ready = &fds.fd_array[..fds.fd_count as usize];
        self.handles.retain(|h| ready.contains(&(h.as_raw() as usize)));
    }
}

/// Whether `handle` can be stored in a [`HandleSet`]
#[cfg(windows)]
pub fn is_selectable(handle: SocketHandle) -> bool {
    handle.is_valid()
}

#[cfg(unix)]
impl Default for HandleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handles()).finish()
    }
}

/// Wait for readiness on up to three handle sets
///
/// `Some(Duration::ZERO)` polls; `None` blocks until a handle is ready.
/// Timeouts too long for the platform call are treated as `None`.
///
/// # Returns
///
/// * `Ok(0)` - Timed out; every set is emptied
/// * `Ok(n)` - Number of ready members; each set holds only its ready members
/// * `Err(SocketError)` - Platform error, e.g. `Fail(EINTR)` on a signal
#[cfg(unix)]
pub fn wait(
    read: Option<&mut HandleSet>,
    write: Option<&mut HandleSet>,
    error: Option<&mut HandleSet>,
    timeout: Option<Duration>,
) -> SockResult<usize> {
    let nfds = [read.as_deref(), write.as_deref(), error.as_deref()]
        .into_iter()
        .flatten()
        .map(HandleSet::nfds)
        .max()
        .unwrap_or(0);

    let mut tv = bounded(timeout).map(|t| libc::timeval {
        tv_sec: t.as_secs() as libc::time_t,
        tv_usec: t.subsec_micros() as libc::suseconds_t,
    });
    let tv_ptr = tv
        .as_mut()
        .map_or(std::ptr::null_mut(), |tv| tv as *mut libc::timeval);

    let ptr = |set: Option<&mut HandleSet>| set.map_or(std::ptr::null_mut(), HandleSet::as_mut_ptr);

    // SAFETY: each pointer is null or refers to a live, initialized fd_set,
    // and `tv_ptr` is null or points to `tv`, which outlives the call.
    let n = unsafe { libc::select(nfds, ptr(read), ptr(write), ptr(error), tv_ptr) };
    if n < 0 {
        return Err(SocketError::last_os_error());
    }
    Ok(n as usize)
}

/// Wait for readiness on up to three handle sets
///
/// Same contract as on Unix, except that with every set empty a `None`
/// timeout is `Invalid` and a finite one sleeps and returns `Ok(0)`.
#[cfg(windows)]
pub fn wait(
    read: Option<&mut HandleSet>,
    write: Option<&mut HandleSet>,
    error: Option<&mut HandleSet>,
    timeout: Option<Duration>,
) -> SockResult<usize> {
    use windows_sys::Win32::Networking::WinSock::{self, FD_SET, TIMEVAL};

    let timeout = bounded(timeout);
    let mut sets = [read, write, error];
    let mut fds: [Option<FD_SET>; 3] = [None, None, None];
    for (slot, set) in fds.iter_mut().zip(&sets) {
        *slot = set.as_deref().filter(|s| !s.is_empty()).map(HandleSet::to_fd_set);
    }

    // Winsock rejects a call with no sockets at all.
    if fds.iter().all(Option::is_none) {
        return match timeout {
            Some(t) => {
                std::thread::sleep(t);
                Ok(0)
            }
            None => Err(SocketError::Invalid),
        };
    }

    let tv = timeout.map(|t| TIMEVAL {
        tv_sec: t.as_secs() as i32,
        tv_usec: t.subsec_micros() as i32,
    });
    let tv_ptr = tv.as_ref().map_or(std::ptr::null(), |tv| tv as *const TIMEVAL);
    let [r, w, e] = &mut fds;
    let ptr = |set: &mut Option<FD_SET>| set.as_mut().map_or(std::ptr::null_mut(), |s| s as *mut FD_SET);

    // SAFETY: each pointer is null or refers to a live FD_SET built above,
    // and `tv_ptr` is null or points to `tv`, which outlives the call.
    let n = unsafe { WinSock::select(0, ptr(r), ptr(w), ptr(e), tv_ptr) };
    if n == WinSock::SOCKET_ERROR {
        // SAFETY: reads the calling thread's Winsock error state.
        let code = unsafe { WinSock::WSAGetLastError() };
        return Err(SocketError::from(std::io::Error::from_raw_os_error(code)));
    }

    for (set, ready) in sets.iter_mut().zip(&fds) {
        if let Some(set) = set.as_deref_mut() {
            match ready {
                Some(ready) => set.retain_ready(ready),
                None => set.clear(),
            }
        }
    }
    Ok(n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::time::Instant;

    fn udp_pair() -> (UdpSocket, UdpSocket) {
        let a = UdpSocket::bind("127.0.0.1:0").unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").unwrap();
        (a, b)
    }

    #[test]
    fn test_insert_and_contains() {
        let (a, b) = udp_pair();
        let mut set = HandleSet::new();
        assert!(set.is_empty());
        set.insert(SocketHandle::of(&a)).unwrap();
        assert!(set.contains(SocketHandle::of(&a)));
        assert!(!set.contains(SocketHandle::of(&b)));

        set.remove(SocketHandle::of(&a));
        assert!(!set.contains(SocketHandle::of(&a)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_invalid_handle() {
        let mut set = HandleSet::new();
        assert_eq!(set.insert(SocketHandle::INVALID), Err(SocketError::Invalid));
    }

    #[cfg(unix)]
    #[test]
    fn test_insert_beyond_fd_setsize() {
        let mut set = HandleSet::new();
        let too_large = SocketHandle::from_raw(libc::FD_SETSIZE as libc::c_int);
        assert_eq!(set.insert(too_large), Err(SocketError::Invalid));
    }

    #[cfg(windows)]
    #[test]
    fn test_insert_beyond_capacity() {
        let sockets: Vec<UdpSocket> = (0..=SET_CAPACITY)
            .map(|_| UdpSocket::bind("127.0.0.1:0").unwrap())
            .collect();
        let mut set = HandleSet::new();
        for socket in &sockets[..SET_CAPACITY] {
            set.insert(SocketHandle::of(socket)).unwrap();
        }
        set.insert(SocketHandle::of(&sockets[0])).unwrap();
        assert_eq!(
            set.insert(SocketHandle::of(&sockets[SET_CAPACITY])),
            Err(SocketError::Invalid)
        );
    }

    #[test]
    fn test_bounded_timeout() {
        assert_eq!(bounded(None), None);
        assert_eq!(bounded(Some(Duration::ZERO)), Some(Duration::ZERO));
        let day = Duration::from_secs(86_400);
        assert_eq!(bounded(Some(day)), Some(day));
        assert_eq!(bounded(Some(Duration::from_secs(MAX_TIMEOUT_SECS))), None);
        assert_eq!(bounded(Some(Duration::MAX)), None);
    }

    #[test]
    fn test_wait_times_out() {
        let (a, _b) = udp_pair();
        let mut read = HandleSet::new();
        read.insert(SocketHandle::of(&a)).unwrap();

        let start = Instant::now();
        let n = wait(Some(&mut read), None, None, Some(Duration::from_millis(50))).unwrap();
        assert_eq!(n, 0);
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert!(!read.contains(SocketHandle::of(&a)));
    }

    #[test]
    fn test_wait_reports_readable() {
        let (a, b) = udp_pair();
        b.send_to(b"ping", a.local_addr().unwrap()).unwrap();

        let mut read = HandleSet::new();
        read.insert(SocketHandle::of(&a)).unwrap();
        read.insert(SocketHandle::of(&b)).unwrap();

        let n = wait(Some(&mut read), None, None, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(n, 1);
        assert!(read.contains(SocketHandle::of(&a)));
        assert!(!read.contains(SocketHandle::of(&b)));
    }

    #[test]
    fn test_max_timeout_reports_readable() {
        let (a, b) = udp_pair();
        b.send_to(b"ping", a.local_addr().unwrap()).unwrap();

        let mut read = HandleSet::new();
        read.insert(SocketHandle::of(&a)).unwrap();

        assert_eq!(wait(Some(&mut read), None, None, Some(Duration::MAX)), Ok(1));
        assert!(read.contains(SocketHandle::of(&a)));
    }

    #[test]
    fn test_zero_timeout_polls_writable() {
        let (a, _b) = udp_pair();
        let mut write = HandleSet::new();
        write.insert(SocketHandle::of(&a)).unwrap();

        let n = wait(None, Some(&mut write), None, Some(Duration::ZERO)).unwrap();
        assert_eq!(n, 1);
        assert_eq!(write.handles().collect::<Vec<_>>(), vec![SocketHandle::of(&a)]);
    }
}
