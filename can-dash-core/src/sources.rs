//! Frame sources
//!
//! The ingestion loop pulls frames through the [`FrameSource`] trait so the
//! bus transport stays outside the core. Implementations:
//!
//! - [`ChannelSource`]: frames pushed from another thread over an `mpsc` channel
//! - [`CandumpReplay`]: a `candump -L` text log, optionally paced in real time
//! - `SocketCanSource`: a live Linux SocketCAN interface (feature `socketcan`)

use crate::types::{CanFrame, SourceError};
use chrono::DateTime;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

#[cfg(all(feature = "socketcan", target_os = "linux"))]
pub use self::socketcan_source::SocketCanSource;

/// A blocking supplier of raw frames
pub trait FrameSource {
    /// Wait up to `timeout` for the next frame
    ///
    /// `Ok(None)` means nothing arrived in time and is not an error.
    /// `Err(SourceError::Closed)` means no frame will ever arrive again.
    fn recv(&mut self, timeout: Duration) -> Result<Option<CanFrame>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn recv(&mut self, timeout: Duration) -> Result<Option<CanFrame>, SourceError> {
        (**self).recv(timeout)
    }
}

/// Frames delivered in-process over a channel
pub struct ChannelSource {
    receiver: Receiver<CanFrame>,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<CanFrame>) -> Self {
        Self { receiver }
    }

    /// Create a source together with the sender that feeds it
    pub fn channel() -> (Sender<CanFrame>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self::new(receiver))
    }
}

impl FrameSource for ChannelSource {
    fn recv(&mut self, timeout: Duration) -> Result<Option<CanFrame>, SourceError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Closed),
        }
    }
}

/// Real-time pacing anchor: log time ↔ wall-clock time of the first frame
struct Pacing {
    log_start: Option<crate::types::Timestamp>,
    wall_start: Instant,
}

/// Replays a `candump -L` log, e.g. `(1436509052.249713) vcan0 3E9#00190000`
pub struct CandumpReplay<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    pending: Option<CanFrame>,
    pacing: Option<Pacing>,
}

impl CandumpReplay<BufReader<File>> {
    /// Open a log file for replay
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        log::info!("Replaying candump log: {:?}", path);
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> CandumpReplay<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
            pacing: None,
        }
    }

    /// Deliver frames at the pace they were logged instead of as fast as possible
    pub fn realtime(mut self, enabled: bool) -> Self {
        self.pacing = enabled.then(|| Pacing {
            log_start: None,
            wall_start: Instant::now(),
        });
        self
    }

    /// Next well-formed frame from the log, skipping malformed lines
    fn next_frame(&mut self) -> Result<CanFrame, SourceError> {
        loop {
            let Some(line) = self.lines.next() else {
                return Err(SourceError::Closed);
            };
            let line = line?;
            self.line_no += 1;

            match parse_candump_line(&line) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => continue,
                Err(e) => log::warn!("candump line {}: {}", self.line_no, e),
            }
        }
    }
}

impl<R: BufRead> FrameSource for CandumpReplay<R> {
    fn recv(&mut self, timeout: Duration) -> Result<Option<CanFrame>, SourceError> {
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => self.next_frame()?,
        };

        let Some(pacing) = self.pacing.as_mut() else {
            return Ok(Some(frame));
        };

        let log_start = *pacing.log_start.get_or_insert(frame.timestamp);
        if frame.timestamp == log_start {
            pacing.wall_start = Instant::now();
        }
        let offset = (frame.timestamp - log_start).to_std().unwrap_or_default();
        let due = pacing.wall_start + offset;
        let now = Instant::now();

        if due > now {
            let wait = due - now;
            if wait > timeout {
                std::thread::sleep(timeout);
                self.pending = Some(frame);
                return Ok(None);
            }
            std::thread::sleep(wait);
        }

        Ok(Some(frame))
    }
}

/// Parse one `candump -L` line
///
/// Blank lines and remote-request frames yield `Ok(None)`.
pub fn parse_candump_line(line: &str) -> Result<Option<CanFrame>, SourceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let (Some(stamp), Some(_interface), Some(body)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(SourceError::Parse(format!("expected 3 fields: '{}'", line)));
    };

    let timestamp = parse_stamp(stamp)?;

    let (id_text, data_text) = body
        .split_once('#')
        .ok_or_else(|| SourceError::Parse(format!("missing '#' in '{}'", body)))?;

    let can_id = u32::from_str_radix(id_text, 16)
        .map_err(|e| SourceError::Parse(format!("bad CAN ID '{}': {}", id_text, e)))?;

    if data_text.starts_with('R') {
        return Ok(None);
    }
    if data_text.starts_with('#') {
        return Err(SourceError::Parse(format!("CAN FD frames are not supported: '{}'", body)));
    }

    let data = parse_hex_bytes(data_text)?;

    Ok(Some(CanFrame {
        timestamp,
        can_id,
        is_extended: id_text.len() > 3,
        data,
    }))
}

fn parse_stamp(stamp: &str) -> Result<crate::types::Timestamp, SourceError> {
    let inner = stamp
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| SourceError::Parse(format!("bad timestamp '{}'", stamp)))?;

    let (secs_text, frac_text) = inner.split_once('.').unwrap_or((inner, "0"));
    let secs: i64 = secs_text
        .parse()
        .map_err(|_| SourceError::Parse(format!("bad timestamp '{}'", stamp)))?;

    // Right-pad (or cut) the fraction to nanoseconds
    let frac: String = frac_text.chars().chain(std::iter::repeat('0')).take(9).collect();
    let nanos: u32 = frac
        .parse()
        .map_err(|_| SourceError::Parse(format!("bad timestamp '{}'", stamp)))?;

    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| SourceError::Parse(format!("timestamp out of range '{}'", stamp)))
}

fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, SourceError> {
    if text.len() % 2 != 0 {
        return Err(SourceError::Parse(format!("odd number of hex digits '{}'", text)));
    }

    (0..text.len())
        .step_by(2)
        .map(|i| {
            text.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| SourceError::Parse(format!("bad payload '{}'", text)))
        })
        .collect()
}

#[cfg(all(feature = "socketcan", target_os = "linux"))]
mod socketcan_source {
    use super::FrameSource;
    use crate::types::{CanFrame, SourceError};
    use chrono::Utc;
    use socketcan::{CanSocket, EmbeddedFrame, Id, Socket};
    use std::io;
    use std::time::Duration;

    /// Live frames from a SocketCAN interface (`can0`, `vcan0`, ...)
    pub struct SocketCanSource {
        socket: CanSocket,
        interface: String,
        read_timeout: Option<Duration>,
    }

    impl SocketCanSource {
        pub fn open(interface: &str) -> Result<Self, SourceError> {
            log::info!("Running on CANBUS {}", interface);
            let socket = CanSocket::open(interface)?;
            Ok(Self {
                socket,
                interface: interface.to_string(),
                read_timeout: None,
            })
        }

        pub fn interface(&self) -> &str {
            &self.interface
        }
    }

    impl FrameSource for SocketCanSource {
        fn recv(&mut self, timeout: Duration) -> Result<Option<CanFrame>, SourceError> {
            if self.read_timeout != Some(timeout) {
                self.socket.set_read_timeout(timeout)?;
                self.read_timeout = Some(timeout);
            }

            match self.socket.read_frame() {
                Ok(socketcan::CanFrame::Data(frame)) => {
                    let (can_id, is_extended) = match frame.id() {
                        Id::Standard(id) => (id.as_raw() as u32, false),
                        Id::Extended(id) => (id.as_raw(), true),
                    };
                    Ok(Some(CanFrame {
                        timestamp: Utc::now(),
                        can_id,
                        is_extended,
                        data: frame.data().to_vec(),
                    }))
                }
                Ok(_) => Ok(None),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    const LOG: &str = "\
(1436509052.249713) vcan0 3E9#0019800C00000000
(1436509052.259713) vcan0 1E5#38FF

(1436509052.269713) vcan0 not-a-frame
(1436509052.279713) vcan0 18DAF110#0102
(1436509052.289713) vcan0 7DF#R
";

    #[test]
    fn test_parse_candump_line() {
        let frame = parse_candump_line("(1436509052.249713) vcan0 3E9#0019800C00000000")
            .unwrap()
            .unwrap();
        assert_eq!(frame.can_id, 0x3E9);
        assert!(!frame.is_extended);
        assert_eq!(frame.data, vec![0x00, 0x19, 0x80, 0x0C, 0, 0, 0, 0]);
        assert_eq!(
            frame.timestamp,
            Utc.timestamp_opt(1436509052, 249_713_000).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_candump_line("(1.0) vcan0 3E9#ABC").is_err());
        assert!(parse_candump_line("(1.0) vcan0 XYZ#00").is_err());
        assert!(parse_candump_line("1.0 vcan0 3E9#00").is_err());
        assert!(parse_candump_line("(1.0) vcan0 3E9##100").is_err());
        assert!(parse_candump_line("(1.0) vcan0").is_err());
    }

    #[test]
    fn test_replay_skips_bad_lines_and_closes() {
        let mut source = CandumpReplay::from_reader(Cursor::new(LOG));
        let timeout = Duration::from_millis(10);

        let ids: Vec<u32> = std::iter::from_fn(|| source.recv(timeout).ok().flatten())
            .map(|f| f.can_id)
            .collect();
        assert_eq!(ids, vec![0x3E9, 0x1E5, 0x18DAF110]);
        assert!(matches!(source.recv(timeout), Err(SourceError::Closed)));
    }

    #[test]
    fn test_realtime_replay_times_out_between_frames() {
        let log = "(100.000000) vcan0 100#01\n(101.000000) vcan0 100#02\n";
        let mut source = CandumpReplay::from_reader(Cursor::new(log)).realtime(true);
        let timeout = Duration::from_millis(20);

        assert_eq!(source.recv(timeout).unwrap().unwrap().data, vec![0x01]);
        // Second frame is due one second later: the receive times out and keeps it
        assert!(source.recv(timeout).unwrap().is_none());
        assert!(source.pending.is_some());
    }

    #[test]
    fn test_channel_source() {
        let (sender, mut source) = ChannelSource::channel();
        let timeout = Duration::from_millis(10);

        assert!(source.recv(timeout).unwrap().is_none());

        let frame = CanFrame::new(Utc::now(), 0x3E9, vec![0u8; 8]);
        sender.send(frame.clone()).unwrap();
        assert_eq!(source.recv(timeout).unwrap(), Some(frame));

        drop(sender);
        assert!(matches!(source.recv(timeout), Err(SourceError::Closed)));
    }
}
