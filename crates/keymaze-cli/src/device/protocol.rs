//! Keymaze protocol client
//!
//! The protocol has been reverse-engineered from the serial stream of the
//! vendor's desktop application. Each exchange is a single request followed
//! by a single response; the watch sometimes ignores a request, so the
//! request is re-sent ("knocked") a few times until a valid header shows up.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::codec::{self, CatalogRecord, CATALOG_ENTRY_LEN, HEADER_EXT_LEN};
use super::frame::{self, hexdump, ResponseHeader, HEADER_LEN};
use super::transport::Transport;
use super::{CommandSet, DeviceSource};
use crate::error::{ProtocolError, Result};
use crate::models::{CatalogEntry, DeviceIdentity, TrackDownload};

/// Attempts to obtain a response header before giving up
pub const KNOCK_ATTEMPTS: usize = 4;

/// Read timeout while waiting for a fresh response header
pub const HEADER_TIMEOUT: Duration = Duration::from_secs(2);

/// Read timeout for the rest of a response
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound on the point buffer reserved from the announced point count
const MAX_PREALLOC: usize = 4096;

/// Body of a validated response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Command code echoed by the watch
    pub command: u8,
    pub body: Vec<u8>,
}

/// Client for the Keymaze serial protocol
pub struct ProtocolClient<T> {
    transport: T,
    commands: CommandSet,
}

impl<T: Transport> ProtocolClient<T> {
    /// Create a client using the Keymaze 500/700 command codes
    pub fn new(transport: T) -> Self {
        Self::with_commands(transport, CommandSet::default())
    }

    pub fn with_commands(transport: T, commands: CommandSet) -> Self {
        Self {
            transport,
            commands,
        }
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send a request and wait for its response
    ///
    /// A response echoing `command` or any code in `accept` qualifies. Only
    /// the header handshake is retried; a short or corrupted body fails.
    pub fn request(&mut self, command: u8, params: &[u8], accept: &[u8]) -> Result<Response> {
        let request = frame::encode_request(self.commands.prefix, command, params);
        self.transport.set_timeout(HEADER_TIMEOUT)?;

        let mut header = None;
        for knock in 0..KNOCK_ATTEMPTS {
            self.transport.drain()?;
            debug!(knock, "Write:\n{}", hexdump(&request));
            self.transport.write(&request)?;

            let bytes = self.transport.read(HEADER_LEN)?;
            let Some(candidate) = ResponseHeader::parse(&bytes) else {
                debug!(knock, received = bytes.len(), "No response header");
                self.transport.drain()?;
                continue;
            };
            if candidate.command != command && !accept.contains(&candidate.command) {
                warn!("Unexpected response {}", hexdump(&bytes).trim_end());
                self.transport.drain()?;
                continue;
            }
            header = Some(candidate);
            break;
        }
        let header = header.ok_or(ProtocolError::NoAnswer)?;

        self.transport.set_timeout(READ_TIMEOUT)?;
        let length = usize::from(header.length);
        debug!("{} bytes to receive", length);
        let payload = self.transport.read(length + 1)?;
        if payload.len() < length + 1 {
            return Err(ProtocolError::Communication(format!(
                "short response, {} of {} bytes",
                payload.len(),
                length + 1
            ))
            .into());
        }

        let (body, trailer) = payload.split_at(length);
        debug!("Read:\n{}", hexdump(body));
        let received = trailer[0];
        let computed = header.checksum(body);
        if received != computed {
            return Err(ProtocolError::Checksum { received, computed }.into());
        }

        Ok(Response {
            command: header.command,
            body: body.to_vec(),
        })
    }

    /// Obtain the device and owner information
    pub fn get_information(&mut self) -> Result<DeviceIdentity> {
        let resp = self.request(self.commands.get_info, &[], &[])?;
        Ok(codec::decode_device_info(&resp.body)?)
    }

    /// Obtain the catalog of all recorded activities
    pub fn get_catalog(&mut self) -> Result<Vec<CatalogEntry>> {
        let resp = self.request(self.commands.directory, &[], &[])?;
        let entries = codec::decode_catalog(&resp.body)?;
        debug!(count = entries.len(), "Catalog received");
        Ok(entries)
    }

    /// Obtain every point of one activity
    pub fn get_track(&mut self, track: u16) -> Result<TrackDownload> {
        let mut params = Vec::with_capacity(4);
        params.extend_from_slice(&1u16.to_be_bytes());
        params.extend_from_slice(&track.to_be_bytes());

        let resp = self.request(self.commands.get_header, &params, &[])?;
        let needed = CATALOG_ENTRY_LEN + HEADER_EXT_LEN;
        if resp.body.len() < needed {
            return Err(ProtocolError::MissingData {
                expected: needed,
                actual: resp.body.len(),
            }
            .into());
        }
        let entry = CatalogRecord::decode(&resp.body[..CATALOG_ENTRY_LEN])?.into_entry()?;
        let totals = codec::decode_totals(&resp.body[CATALOG_ENTRY_LEN..needed])?;
        let expected = totals.point_count as usize;
        info!(track, points = expected, "Downloading track");

        let accept = [self.commands.no_more_data, self.commands.get_header];
        let mut points = Vec::with_capacity(expected.min(MAX_PREALLOC));
        while points.len() < expected {
            let resp = self.request(self.commands.get_next, &[], &accept)?;
            if resp.command == self.commands.no_more_data {
                debug!(received = points.len(), "No more points");
                break;
            }
            // Each batch repeats a catalog record, which carries nothing new
            if resp.body.len() < CATALOG_ENTRY_LEN {
                return Err(ProtocolError::MissingData {
                    expected: CATALOG_ENTRY_LEN,
                    actual: resp.body.len(),
                }
                .into());
            }
            let (batch, rest) = codec::decode_points(&resp.body[CATALOG_ENTRY_LEN..]);
            if !rest.is_empty() {
                warn!("Remaining bytes:\n{}", hexdump(rest));
            }
            if batch.is_empty() {
                warn!(
                    received = points.len(),
                    expected, "Empty point batch, stopping transfer"
                );
                break;
            }
            points.extend(batch);
            debug!(
                "TP: {}% ({}/{})",
                100 * points.len().min(expected) / expected.max(1),
                points.len(),
                expected
            );
        }

        Ok(TrackDownload {
            entry,
            totals,
            points,
        })
    }
}

impl<T: Transport> DeviceSource for ProtocolClient<T> {
    fn get_information(&mut self) -> Result<DeviceIdentity> {
        ProtocolClient::get_information(self)
    }

    fn get_catalog(&mut self) -> Result<Vec<CatalogEntry>> {
        ProtocolClient::get_catalog(self)
    }

    fn get_track(&mut self, track: u16) -> Result<TrackDownload> {
        ProtocolClient::get_track(self, track)
    }
}
