//! UDP receive loop
//!
//! Runs on its own OS thread doing blocking reads. Shutdown is cooperative:
//! the stop flag is lowered, a wake datagram unblocks the pending read, the
//! loop exits and the socket closes when the thread drops it. The socket
//! read timeout bounds shutdown if the wake datagram is lost.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::input::LatchWriter;
use crate::net::packet::{decode, MAX_DATAGRAM_SIZE};

/// Pause after an unexpected socket error so a broken socket can't spin
const ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Receiver setup errors
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("failed to bind UDP receiver on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure UDP socket: {0}")]
    Configure(#[source] io::Error),

    #[error("failed to spawn receive thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Packet counters, readable from any thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverStats {
    pub received: u64,
    pub decoded: u64,
    pub rejected: u64,
}

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    decoded: AtomicU64,
    rejected: AtomicU64,
}

/// Handle to a running receive thread
pub struct EyeDataReceiver {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl EyeDataReceiver {
    /// Bind the socket and start the receive thread
    pub fn start(
        bind_addr: SocketAddr,
        read_timeout: Duration,
        writer: LatchWriter,
    ) -> Result<Self, ReceiverError> {
        let socket = UdpSocket::bind(bind_addr).map_err(|source| ReceiverError::Bind {
            addr: bind_addr,
            source,
        })?;

        // A zero timeout means "block forever" to std, which it rejects
        let timeout = Some(read_timeout).filter(|t| !t.is_zero());
        socket
            .set_read_timeout(timeout)
            .map_err(ReceiverError::Configure)?;
        let local_addr = socket.local_addr().map_err(ReceiverError::Configure)?;

        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let thread_running = running.clone();
        let thread_counters = counters.clone();
        let handle = thread::Builder::new()
            .name("eye-receiver".to_string())
            .spawn(move || receive_loop(socket, writer, thread_running, thread_counters))
            .map_err(ReceiverError::Spawn)?;

        info!(addr = %local_addr, "UDP receiver started");

        Ok(Self {
            local_addr,
            running,
            counters,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            received: self.counters.received.load(Ordering::Relaxed),
            decoded: self.counters.decoded.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Stop the receive thread and wait for it to exit
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.running.store(false, Ordering::Release);
        if let Err(e) = send_wake(self.local_addr) {
            debug!(error = %e, "Wake datagram failed, waiting for read timeout");
        }

        if handle.join().is_err() {
            error!("UDP receive thread panicked");
        } else {
            info!(addr = %self.local_addr, "UDP receiver stopped");
        }
    }
}

impl Drop for EyeDataReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(
    socket: UdpSocket,
    writer: LatchWriter,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                counters.received.fetch_add(1, Ordering::Relaxed);

                match decode(&buf[..len]) {
                    Ok(sample) => {
                        trace!(from = %from, ?sample, "Eye sample");
                        writer.publish(sample);
                        counters.decoded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        counters.rejected.fetch_add(1, Ordering::Relaxed);
                        warn!(from = %from, len, error = %e, "Dropping undecodable eye packet");
                    }
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                error!(error = %e, "UDP receive error");
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    debug!("UDP receive loop exited");
}

/// Send an empty datagram to the receiver so its blocking read returns
fn send_wake(local_addr: SocketAddr) -> io::Result<()> {
    let (target, bind): (SocketAddr, SocketAddr) = match local_addr.ip() {
        IpAddr::V4(ip) => {
            let ip = if ip.is_unspecified() { Ipv4Addr::LOCALHOST } else { ip };
            ((ip, local_addr.port()).into(), (Ipv4Addr::UNSPECIFIED, 0).into())
        }
        IpAddr::V6(ip) => {
            let ip = if ip.is_unspecified() { Ipv6Addr::LOCALHOST } else { ip };
            ((ip, local_addr.port()).into(), (Ipv6Addr::UNSPECIFIED, 0).into())
        }
    };

    UdpSocket::bind(bind)?.send_to(&[], target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{input_latch, LatchReader, LatchResetPolicy, LatchSnapshot};
    use std::time::Instant;

    fn start_local(timeout: Duration) -> (EyeDataReceiver, LatchReader) {
        let (writer, reader) = input_latch(LatchResetPolicy::ResetEveryConsume);
        let receiver =
            EyeDataReceiver::start("127.0.0.1:0".parse().unwrap(), timeout, writer).unwrap();
        (receiver, reader)
    }

    fn wait_for(reader: &LatchReader) -> Option<LatchSnapshot> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(snap) = reader.consume() {
                return Some(snap);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_receives_and_publishes() {
        let (receiver, reader) = start_local(Duration::from_millis(100));
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender
            .send_to(
                br#"{"gazeX": 0.8, "isLeftClosed": true, "isRightClosed": false}"#,
                receiver.local_addr(),
            )
            .unwrap();

        let snap = wait_for(&reader).expect("sample never arrived");
        assert_eq!(snap.gaze_x, 0.8);
        assert!(snap.left_closed);
        assert_eq!(receiver.stats().decoded, 1);
    }

    #[test]
    fn test_bad_packet_does_not_stop_loop() {
        let (receiver, reader) = start_local(Duration::from_millis(100));
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.send_to(b"garbage", receiver.local_addr()).unwrap();
        sender
            .send_to(br#"{"gazeX": -1.0}"#, receiver.local_addr())
            .unwrap();

        let snap = wait_for(&reader).expect("loop died after bad packet");
        assert_eq!(snap.gaze_x, -1.0);
        assert!(receiver.is_running());

        let stats = receiver.stats();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.decoded, 1);
    }

    #[test]
    fn test_stop_unblocks_pending_read() {
        // Long timeout: stop must not rely on it
        let (mut receiver, _reader) = start_local(Duration::from_secs(30));
        assert!(receiver.is_running());

        let started = Instant::now();
        receiver.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!receiver.is_running());

        // Second stop is a no-op
        receiver.stop();
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let (writer, _reader) = input_latch(LatchResetPolicy::ResetEveryConsume);

        let result = EyeDataReceiver::start(
            taken.local_addr().unwrap(),
            Duration::from_millis(100),
            writer,
        );
        assert!(matches!(result, Err(ReceiverError::Bind { .. })));
    }
}
