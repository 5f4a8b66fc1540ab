// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! # smpt - ScienceMode protocol client
//!
//! Safe Rust bindings for the ScienceMode library, which drives stimulation devices over
//! a serial port.
//!
//! ## Overview
//!
//! This crate wraps the raw FFI ([`smpt_sys`]) with:
//!
//! - a resolver that finds and loads the native library from a ranked list of
//!   directories ([`resolver`])
//! - a call-surface trait with a native and a simulated binding ([`SmptApi`]). The
//!   simulated one is selected when no library loads, so code depending on the library
//!   keeps running with reduced functionality
//! - scoped release of foreign structures and marshalling helpers ([`lifecycle`])
//! - the device handle ([`Device`]) and its packet sequence numbers ([`sequence`])
//!
//! ## Architecture
//!
//! ```text
//! LoaderConfig ──► Resolver ──► NativeApi ─┐
//!                          └──► SimulatedApi ─┴─► SmptApiHandle ──► Device
//! ```
//!
//! ## Examples
//!
//! ```no_run
//! use smpt::{Device, api};
//! use smpt_sys::Smpt_ll_init;
//!
//! # fn main() -> Result<(), smpt::Error> {
//! let mut device = Device::open(api(), "/dev/ttyUSB0")?;
//! let packet_number = device.send_ll_init(Smpt_ll_init::default())?;
//! while !device.new_packet_received()? {}
//! let ack = device.check_last_ack()?;
//! assert_eq!(ack.packet_number, packet_number);
//! # Ok(())
//! # }
//! ```
//!
//! ## Sequence numbers
//!
//! The first packet number after opening a port is 0. The counter then counts up and
//! restarts at 1 after 255. Acknowledgements echo the packet number of the command
//! they answer.
//!
//! ## Thread Safety
//!
//! - [`SmptApiHandle`] is `Send + Sync` and can be shared across threads
//! - [`Device`] is `Send` but not `Sync`; callers that share one need a lock

mod error;

pub mod api;
pub mod config;
pub mod device;
pub mod lifecycle;
pub mod resolver;
pub mod sequence;

pub use api::{
    BindingKind, NativeApi, SimulatedApi, SmptApi, SmptApiHandle, api, load_api, load_native,
    select_api,
};
pub use config::LoaderConfig;
pub use device::Device;
pub use error::{Error, ResultCode, Result};
pub use resolver::{ArtifactKind, LibraryArtifact, LibraryLoader, Resolution, Resolver};
