// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! The device handle.

use smpt_sys::{Smpt_ack, Smpt_device, Smpt_get_extended_version_ack, Smpt_ll_channel_config, Smpt_ll_init};
use tracing::{debug, info};

use crate::{
    Error, Result,
    api::SmptApiHandle,
    lifecycle::{self, ForeignBuffer, Scoped},
};

/// A ScienceMode device record bound to one serial port.
///
/// The record is heap allocated and owned exclusively by this handle. Dropping the
/// handle closes the port if it is still open. Every method takes `&mut self`; sharing a
/// device across threads needs an external lock.
pub struct Device {
    api: SmptApiHandle,
    raw: Scoped<Box<Smpt_device>>,
}

impl Device {
    /// Allocates a zeroed device record.
    pub fn new(api: SmptApiHandle) -> Self {
        let release_api = api.clone();
        let raw = Scoped::new(Box::<Smpt_device>::default(), move |mut device| {
            if is_open(&device) {
                debug!("closing serial port of dropped device");
                release_api.close_serial_port(&mut device)?;
            }
            Ok(())
        });
        Self { api, raw }
    }

    /// Checks whether `port` names a usable serial port.
    pub fn check_serial_port(api: &SmptApiHandle, port: &str) -> Result<bool> {
        let port = lifecycle::to_c_string(port)?;
        api.check_serial_port(&port)
    }

    /// Allocates a device record and opens `port` on it.
    pub fn open(api: SmptApiHandle, port: &str) -> Result<Self> {
        let mut device = Self::new(api);
        device.open_serial_port(port)?;
        Ok(device)
    }

    pub fn open_serial_port(&mut self, port: &str) -> Result<()> {
        let port_c = lifecycle::to_c_string(port)?;
        let api = self.api.clone();
        api.open_serial_port(self.raw_mut()?, &port_c)?;
        info!(port, "opened serial port");
        Ok(())
    }

    pub fn close_serial_port(&mut self) -> Result<()> {
        let api = self.api.clone();
        api.close_serial_port(self.raw_mut()?)?;
        info!("closed serial port");
        Ok(())
    }

    /// Closes the port if open and frees the record. Later calls fail with
    /// [`Error::Released`].
    pub fn release(&mut self) -> Result<()> {
        self.raw.release()
    }

    pub fn is_open(&self) -> bool {
        self.raw.get().is_some_and(|device| is_open(device))
    }

    /// Name of the open serial port.
    pub fn port_name(&self) -> Option<String> {
        self.raw
            .get()
            .filter(|device| is_open(device))
            .map(|device| lifecycle::from_c_char_array(&device.serial_port_name))
    }

    /// Returns the current sequence number and advances the counter.
    pub fn next_packet_number(&mut self) -> Result<u8> {
        let api = self.api.clone();
        api.packet_number_generator_next(self.raw_mut()?)
    }

    /// The sequence number the next command will carry.
    pub fn current_packet_number(&self) -> Result<u8> {
        self.raw
            .get()
            .map(|device| device.current_packet_number as u8)
            .ok_or(Error::Released)
    }

    pub fn new_packet_received(&mut self) -> Result<bool> {
        let api = self.api.clone();
        api.new_packet_received(self.raw_mut()?)
    }

    pub fn last_ack(&mut self) -> Result<Smpt_ack> {
        let api = self.api.clone();
        api.last_ack(self.raw_mut()?)
    }

    /// Fetches the last acknowledgement and maps its result byte.
    pub fn check_last_ack(&mut self) -> Result<Smpt_ack> {
        let ack = self.last_ack()?;
        Error::from_result(u8::try_from(ack.result).unwrap_or(u8::MAX))?;
        Ok(ack)
    }

    /// The outgoing packet of the device record.
    pub fn packet_buffer(&mut self) -> Result<ForeignBuffer<'_>> {
        let device = self.raw_mut()?;
        let len = (device.packet_length as usize).min(device.packet.len());
        Ok(ForeignBuffer::from_slice(&mut device.packet[..len]))
    }

    /// Requests the extended version. Returns the packet number used.
    pub fn send_get_extended_version(&mut self) -> Result<u8> {
        let packet_number = self.next_packet_number()?;
        let api = self.api.clone();
        api.send_get_extended_version(self.raw_mut()?, packet_number)?;
        Ok(packet_number)
    }

    pub fn get_extended_version_ack(&mut self) -> Result<Smpt_get_extended_version_ack> {
        let api = self.api.clone();
        api.get_extended_version_ack(self.raw_mut()?)
    }

    /// Initialises low-level mode. The packet number is filled in here.
    pub fn send_ll_init(&mut self, mut ll_init: Smpt_ll_init) -> Result<u8> {
        ll_init.packet_number = self.next_packet_number()?;
        let api = self.api.clone();
        api.send_ll_init(self.raw_mut()?, &ll_init)?;
        Ok(ll_init.packet_number)
    }

    pub fn send_ll_channel_config(&mut self, config: &Smpt_ll_channel_config) -> Result<()> {
        let api = self.api.clone();
        api.send_ll_channel_config(self.raw_mut()?, config)
    }

    /// Leaves low-level mode. Returns the packet number used.
    pub fn send_ll_stop(&mut self) -> Result<u8> {
        let packet_number = self.next_packet_number()?;
        let api = self.api.clone();
        api.send_ll_stop(self.raw_mut()?, packet_number)?;
        Ok(packet_number)
    }

    fn raw_mut(&mut self) -> Result<&mut Smpt_device> {
        self.raw
            .get_mut()
            .map(|device| device.as_mut())
            .ok_or(Error::Released)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("binding", &self.api.kind())
            .field("port", &self.port_name())
            .field("released", &self.raw.is_released())
            .finish()
    }
}

fn is_open(device: &Smpt_device) -> bool {
    device.serial_port_name[0] != 0
}

/// Version string carried by an extended-version acknowledgement.
pub fn version_string(ack: &Smpt_get_extended_version_ack) -> String {
    lifecycle::from_c_char_array(&ack.version_string)
}
