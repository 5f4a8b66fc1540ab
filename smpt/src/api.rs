// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! The ScienceMode call surface.
//!
//! [`SmptApi`] is implemented twice: [`NativeApi`] forwards to a loaded library, and
//! [`SimulatedApi`] stands in when no library can be loaded so that dependent code keeps
//! working with reduced functionality. The binding is chosen once, by [`select_api`], and
//! [`api`] keeps the process-wide choice.

use std::{
    ffi::CStr,
    path::Path,
    sync::{Arc, OnceLock},
};

use serde::Serialize;
use smpt_sys::{
    Smpt_ack, Smpt_device, Smpt_get_extended_version_ack, Smpt_ll_channel_config, Smpt_ll_init,
    SmptLibrary,
};
use tracing::{debug, info, warn};

use crate::{
    Error, Result,
    config::LoaderConfig,
    lifecycle, resolver,
    resolver::{DynamicLoader, LibraryArtifact, LibraryLoader, Resolver},
    sequence,
};

/// Shared handle to the selected binding.
pub type SmptApiHandle = Arc<dyn SmptApi>;

/// Which implementation is behind an [`SmptApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Native,
    Simulated,
}

/// Functions of the ScienceMode library.
///
/// The six core functions are required. The command functions default to
/// [`Error::FunctionUnavailable`].
pub trait SmptApi: Send + Sync {
    fn kind(&self) -> BindingKind;

    fn check_serial_port(&self, port: &CStr) -> Result<bool>;

    fn open_serial_port(&self, device: &mut Smpt_device, port: &CStr) -> Result<()>;

    fn close_serial_port(&self, device: &mut Smpt_device) -> Result<()>;

    /// Returns the device's current sequence number and advances it.
    fn packet_number_generator_next(&self, device: &mut Smpt_device) -> Result<u8>;

    fn new_packet_received(&self, device: &mut Smpt_device) -> Result<bool>;

    fn last_ack(&self, device: &mut Smpt_device) -> Result<Smpt_ack>;

    fn send_get_extended_version(&self, _device: &mut Smpt_device, _packet_number: u8) -> Result<()> {
        Err(Error::FunctionUnavailable("smpt_send_get_extended_version"))
    }

    fn get_extended_version_ack(
        &self,
        _device: &mut Smpt_device,
    ) -> Result<Smpt_get_extended_version_ack> {
        Err(Error::FunctionUnavailable("smpt_get_get_extended_version_ack"))
    }

    fn send_ll_init(&self, _device: &mut Smpt_device, _ll_init: &Smpt_ll_init) -> Result<()> {
        Err(Error::FunctionUnavailable("smpt_send_ll_init"))
    }

    fn send_ll_channel_config(
        &self,
        _device: &mut Smpt_device,
        _config: &Smpt_ll_channel_config,
    ) -> Result<()> {
        Err(Error::FunctionUnavailable("smpt_send_ll_channel_config"))
    }

    fn send_ll_stop(&self, _device: &mut Smpt_device, _packet_number: u8) -> Result<()> {
        Err(Error::FunctionUnavailable("smpt_send_ll_stop"))
    }
}

/// Binding backed by a loaded ScienceMode library.
pub struct NativeApi {
    library: SmptLibrary,
    artifact: Option<LibraryArtifact>,
}

impl NativeApi {
    pub fn new(library: SmptLibrary, artifact: Option<LibraryArtifact>) -> Self {
        Self { library, artifact }
    }

    /// The file the library was loaded from, when it came from the resolver.
    pub fn artifact(&self) -> Option<&LibraryArtifact> {
        self.artifact.as_ref()
    }
}

fn sym<F: Copy>(entry: &core::result::Result<F, libloading::Error>, name: &'static str) -> Result<F> {
    entry
        .as_ref()
        .copied()
        .map_err(|_| Error::FunctionUnavailable(name))
}

fn succeeded(ok: bool, name: &'static str) -> Result<()> {
    if ok { Ok(()) } else { Err(Error::CallFailed(name)) }
}

impl SmptApi for NativeApi {
    fn kind(&self) -> BindingKind {
        BindingKind::Native
    }

    fn check_serial_port(&self, port: &CStr) -> Result<bool> {
        let f = sym(&self.library.smpt_check_serial_port, "smpt_check_serial_port")?;
        Ok(unsafe { f(port.as_ptr()) })
    }

    fn open_serial_port(&self, device: &mut Smpt_device, port: &CStr) -> Result<()> {
        let f = sym(&self.library.smpt_open_serial_port, "smpt_open_serial_port")?;
        succeeded(unsafe { f(device, port.as_ptr()) }, "smpt_open_serial_port")
    }

    fn close_serial_port(&self, device: &mut Smpt_device) -> Result<()> {
        let f = sym(&self.library.smpt_close_serial_port, "smpt_close_serial_port")?;
        succeeded(unsafe { f(device) }, "smpt_close_serial_port")
    }

    fn packet_number_generator_next(&self, device: &mut Smpt_device) -> Result<u8> {
        let f = sym(
            &self.library.smpt_packet_number_generator_next,
            "smpt_packet_number_generator_next",
        )?;
        Ok(unsafe { f(device) })
    }

    fn new_packet_received(&self, device: &mut Smpt_device) -> Result<bool> {
        let f = sym(&self.library.smpt_new_packet_received, "smpt_new_packet_received")?;
        Ok(unsafe { f(device) })
    }

    fn last_ack(&self, device: &mut Smpt_device) -> Result<Smpt_ack> {
        let f = sym(&self.library.smpt_last_ack, "smpt_last_ack")?;
        let mut ack = Smpt_ack::default();
        unsafe { f(device, &mut ack) };
        Ok(ack)
    }

    fn send_get_extended_version(&self, device: &mut Smpt_device, packet_number: u8) -> Result<()> {
        let name = "smpt_send_get_extended_version";
        let f = sym(&self.library.smpt_send_get_extended_version, name)?;
        succeeded(unsafe { f(device, packet_number) }, name)
    }

    fn get_extended_version_ack(
        &self,
        device: &mut Smpt_device,
    ) -> Result<Smpt_get_extended_version_ack> {
        let name = "smpt_get_get_extended_version_ack";
        let f = sym(&self.library.smpt_get_get_extended_version_ack, name)?;
        let mut ack = Smpt_get_extended_version_ack::default();
        succeeded(unsafe { f(device, &mut ack) }, name)?;
        Ok(ack)
    }

    fn send_ll_init(&self, device: &mut Smpt_device, ll_init: &Smpt_ll_init) -> Result<()> {
        let f = sym(&self.library.smpt_send_ll_init, "smpt_send_ll_init")?;
        succeeded(unsafe { f(device, ll_init) }, "smpt_send_ll_init")
    }

    fn send_ll_channel_config(
        &self,
        device: &mut Smpt_device,
        config: &Smpt_ll_channel_config,
    ) -> Result<()> {
        let name = "smpt_send_ll_channel_config";
        let f = sym(&self.library.smpt_send_ll_channel_config, name)?;
        succeeded(unsafe { f(device, config) }, name)
    }

    fn send_ll_stop(&self, device: &mut Smpt_device, packet_number: u8) -> Result<()> {
        let f = sym(&self.library.smpt_send_ll_stop, "smpt_send_ll_stop")?;
        succeeded(unsafe { f(device, packet_number) }, "smpt_send_ll_stop")
    }
}

/// Stand-in binding used when no library is available.
///
/// Ports always check as present and open without touching any hardware. No packet is
/// ever received. Commands beyond the core functions are unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedApi;

impl SmptApi for SimulatedApi {
    fn kind(&self) -> BindingKind {
        BindingKind::Simulated
    }

    fn check_serial_port(&self, port: &CStr) -> Result<bool> {
        debug!(port = %port.to_string_lossy(), "simulated port check");
        Ok(true)
    }

    fn open_serial_port(&self, device: &mut Smpt_device, port: &CStr) -> Result<()> {
        let port = port.to_string_lossy();
        lifecycle::write_c_char_array(&mut device.serial_port_name, &port);
        device.current_packet_number = sequence::FIRST as _;
        info!(port = %port, "opened simulated serial port");
        Ok(())
    }

    fn close_serial_port(&self, device: &mut Smpt_device) -> Result<()> {
        device.serial_port_name.fill(0);
        debug!("closed simulated serial port");
        Ok(())
    }

    fn packet_number_generator_next(&self, device: &mut Smpt_device) -> Result<u8> {
        let mut counter = device.current_packet_number as u8;
        let current = sequence::next(&mut counter);
        device.current_packet_number = counter as _;
        Ok(current)
    }

    fn new_packet_received(&self, _device: &mut Smpt_device) -> Result<bool> {
        Ok(false)
    }

    fn last_ack(&self, _device: &mut Smpt_device) -> Result<Smpt_ack> {
        Ok(Smpt_ack::default())
    }
}

/// Loads the library at `path` and wraps it in a [`NativeApi`].
///
/// # Errors
///
/// Returns [`Error::LibLoading`] if the library cannot be opened.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> Result<(), smpt::Error> {
/// let api = smpt::load_api("libsmpt.so")?;
/// # Ok(())
/// # }
/// ```
pub fn load_api(path: impl AsRef<Path>) -> Result<SmptApiHandle> {
    let library = DynamicLoader.load(path.as_ref())?;
    Ok(Arc::new(NativeApi::new(library, None)))
}

/// Resolves the library from `config` and returns the native binding.
///
/// # Errors
///
/// Returns [`Error::NoLibrary`] when no shared library loads.
pub fn load_native(config: &LoaderConfig) -> Result<SmptApiHandle> {
    match Resolver::new(config).resolve(&mut DynamicLoader).loaded {
        Some((artifact, library)) => Ok(Arc::new(NativeApi::new(library, Some(artifact)))),
        None => Err(Error::NoLibrary),
    }
}

/// Resolves the library from `config` and returns the native binding, or the
/// simulated one when nothing loads.
pub fn select_api(config: &LoaderConfig) -> SmptApiHandle {
    let resolution = Resolver::new(config).resolve(&mut DynamicLoader);
    select_from(resolution)
}

/// Picks the binding for a finished resolution.
pub fn select_from(resolution: resolver::Resolution<SmptLibrary>) -> SmptApiHandle {
    match resolution.loaded {
        Some((artifact, library)) => {
            info!(path = %artifact.path.display(), binding = "native", "selected ScienceMode binding");
            Arc::new(NativeApi::new(library, Some(artifact)))
        }
        None => {
            warn!(
                attempts = resolution.attempts.len(),
                static_libraries = resolution.static_artifacts.len(),
                binding = "simulated",
                "selected ScienceMode binding"
            );
            Arc::new(SimulatedApi)
        }
    }
}

static API: OnceLock<SmptApiHandle> = OnceLock::new();

/// The process-wide binding, selected on first use from the default configuration and
/// `SMPT_LIB_DIR`.
pub fn api() -> SmptApiHandle {
    API.get_or_init(|| select_api(&LoaderConfig::default().from_env()))
        .clone()
}
