//! Serial driver for the SDS011 particulate sensor.
//!
//! The driver is deliberately thin: it exchanges single command/reply pairs
//! and reports failures without retrying. Retry and backoff policy belong to
//! the duty-cycle controller.
//!
//! Two traits form the seam between the controller and the hardware:
//!
//! - [`SensorDevice`] - an open sensor connection
//! - [`DeviceOpener`] - a factory that opens connections on demand
//!
//! Production code uses [`Sds011Opener`] / [`Sds011Device`]; tests substitute
//! scripted implementations.

use std::io::{self, Read, Write};
use std::time::Duration;

use thiserror::Error;

use super::protocol::{self, FrameError, Sample, FRAME_HEADER, REPLY_LEN};

/// SDS011 serial parameters are fixed: 9600 baud, 8N1.
const BAUD_RATE: u32 = 9600;

/// How many non-header bytes to discard while hunting for a frame start
/// before declaring the stream garbage.
const MAX_HEADER_SCAN: usize = 64;

/// Driver-level failures.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The serial port could not be opened or claimed.
    #[error("serial device '{port}' unavailable: {source}")]
    DeviceUnavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// A command write failed or the sensor acknowledged it badly.
    #[error("sensor command failed: {0}")]
    Command(String),

    /// No reply frame arrived within the device timeout.
    #[error("timed out waiting for a sensor frame")]
    Timeout,

    /// Bytes arrived but did not form a valid frame.
    #[error("malformed sensor frame: {0}")]
    Frame(#[from] FrameError),
}

/// An open connection to a particulate sensor.
///
/// All calls block for at most the device timeout configured at open time.
pub trait SensorDevice: Send {
    /// Turn the fan on and put the sensor into query mode.
    fn wake(&mut self) -> Result<(), DriverError>;

    /// Turn the fan off.
    fn sleep(&mut self) -> Result<(), DriverError>;

    /// Request and read one measurement frame.
    fn read_sample(&mut self) -> Result<Sample, DriverError>;

    /// Release the connection. Idempotent; the handle is unusable afterwards.
    fn close(&mut self);
}

/// Factory for sensor connections.
///
/// The controller opens on demand and re-opens after device loss, so the
/// opener must be callable any number of times.
pub trait DeviceOpener: Send {
    fn open(&self) -> Result<Box<dyn SensorDevice>, DriverError>;
}

/// SDS011 driver over any byte stream.
///
/// Generic over the transport so the command/reply exchange can be tested
/// against an in-memory port; production uses the boxed `serialport` handle.
pub struct Sds011Device<P> {
    port: P,
}

impl<P: Read + Write + Send> Sds011Device<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    fn send_command(&mut self, packet: &[u8; protocol::COMMAND_LEN]) -> Result<(), DriverError> {
        self.port
            .write_all(packet)
            .map_err(|e| DriverError::Command(format!("command write failed: {e}")))
    }

    /// Read one reply frame, scanning past any stray bytes before the header.
    fn read_frame(&mut self) -> Result<[u8; REPLY_LEN], DriverError> {
        let mut byte = [0u8; 1];
        let mut scanned = 0;
        loop {
            self.port.read_exact(&mut byte).map_err(map_read_error)?;
            if byte[0] == FRAME_HEADER {
                break;
            }
            scanned += 1;
            if scanned >= MAX_HEADER_SCAN {
                return Err(FrameError::HeaderNotFound(MAX_HEADER_SCAN).into());
            }
        }

        let mut frame = [0u8; REPLY_LEN];
        frame[0] = FRAME_HEADER;
        self.port
            .read_exact(&mut frame[1..])
            .map_err(map_read_error)?;
        Ok(frame)
    }

    fn read_ack(&mut self) -> Result<(), DriverError> {
        let frame = self.read_frame()?;
        protocol::validate_ack(&frame)
            .map_err(|e| DriverError::Command(format!("bad acknowledgment: {e}")))
    }
}

impl<P: Read + Write + Send> SensorDevice for Sds011Device<P> {
    fn wake(&mut self) -> Result<(), DriverError> {
        self.send_command(&protocol::wake_command())?;
        self.read_ack()?;
        // Query mode: the sensor stays quiet until polled, so the read loop
        // never has to discard unsolicited frames.
        self.send_command(&protocol::query_mode_command())?;
        self.read_ack()
    }

    fn sleep(&mut self) -> Result<(), DriverError> {
        self.send_command(&protocol::sleep_command())?;
        self.read_ack()
    }

    fn read_sample(&mut self) -> Result<Sample, DriverError> {
        self.send_command(&protocol::query_data_command())?;
        let frame = self.read_frame()?;
        Ok(protocol::parse_data_frame(&frame)?)
    }

    fn close(&mut self) {
        let _ = self.port.flush();
    }
}

/// Classify a transport read failure: expired timeouts are their own kind,
/// everything else means the device itself is misbehaving.
fn map_read_error(error: io::Error) -> DriverError {
    match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => DriverError::Timeout,
        _ => DriverError::Command(format!("serial read failed: {error}")),
    }
}

/// Opens [`Sds011Device`]s on a real serial port.
#[derive(Debug, Clone)]
pub struct Sds011Opener {
    port: String,
    timeout: Duration,
}

impl Sds011Opener {
    /// Create an opener for the given port path and per-read timeout.
    pub fn new(port: impl Into<String>, timeout: Duration) -> Self {
        Self {
            port: port.into(),
            timeout,
        }
    }

    /// The configured port path.
    pub fn port(&self) -> &str {
        &self.port
    }
}

impl DeviceOpener for Sds011Opener {
    fn open(&self) -> Result<Box<dyn SensorDevice>, DriverError> {
        let port = serialport::new(&self.port, BAUD_RATE)
            .timeout(self.timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|source| DriverError::DeviceUnavailable {
                port: self.port.clone(),
                source,
            })?;
        Ok(Box::new(Sds011Device::new(port)))
    }
}
