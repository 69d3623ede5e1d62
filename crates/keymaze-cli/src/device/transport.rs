//! Byte transport between the host and the watch
//!
//! The data cable embeds a PL-2303 USB-to-serial bridge, so the watch shows
//! up as a plain serial port.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use crate::error::Result;

/// Serial line speed used by the watch in PC mode
pub const BAUD_RATE: u32 = 57_600;

/// Poll interval while draining stale input
pub const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Minimal duplex channel consumed by the protocol client
pub trait Transport {
    /// Write all bytes
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `len` bytes; returns fewer when the read timeout expires
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Number of bytes already received and not read yet
    fn bytes_waiting(&mut self) -> Result<usize>;

    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Discard everything waiting on the input side
    fn drain(&mut self) -> Result<()> {
        loop {
            thread::sleep(DRAIN_POLL);
            let pending = match self.bytes_waiting() {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(error = %e, "Cannot query pending input, assuming none");
                    0
                }
            };
            if pending == 0 {
                return Ok(());
            }
            self.read(pending)?;
        }
    }
}

/// Serial port connection to a Keymaze watch
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialTransport {
    /// Open the port, deassert RTS/DTR and drop any stale input
    pub fn open(port_name: &str) -> Result<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_secs(1))
            .open()?;

        let mut transport = Self {
            port,
            name: port_name.to_string(),
        };
        transport.port.write_request_to_send(false)?;
        transport.port.write_data_terminal_ready(false)?;
        transport.drain()?;

        tracing::debug!(port = port_name, baud = BAUD_RATE, "Serial port opened");
        Ok(transport)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn bytes_waiting(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout)?;
        Ok(())
    }
}

/// Serial port visible on this host
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

/// List serial ports, USB bridges first
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()?
        .into_iter()
        .map(|port| {
            let description = match &port.port_type {
                SerialPortType::UsbPort(info) => Some(format!(
                    "{:04x}:{:04x} {}",
                    info.vid,
                    info.pid,
                    info.product.as_deref().unwrap_or("")
                )),
                _ => None,
            };
            PortInfo {
                kind: port_type_name(&port.port_type),
                name: port.port_name,
                description,
            }
        })
        .collect();
    ports.sort_by_key(|p| p.kind != "USB");
    Ok(ports)
}

fn port_type_name(port_type: &SerialPortType) -> &'static str {
    match port_type {
        SerialPortType::UsbPort(_) => "USB",
        SerialPortType::BluetoothPort => "Bluetooth",
        SerialPortType::PciPort => "PCI",
        SerialPortType::Unknown => "Unknown",
    }
}
