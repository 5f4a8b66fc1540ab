// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! # smpt-sys: Raw FFI surface of the ScienceMode library
//!
//! This crate provides low-level, unsafe Rust declarations for the ScienceMode
//! (`smpt`) protocol client library, loaded at runtime via `libloading`.
//!
//! ## Overview
//!
//! `smpt-sys` exposes:
//! - `#[repr(C)]` records for the device handle, the low-level commands and the
//!   acknowledgements
//! - The result-code constants (`Smpt_Result_*`)
//! - [`SmptLibrary`], a table with one entry per exported function. A symbol missing
//!   from the loaded library shows up as an `Err` entry instead of failing the load.
//! - [`BINDING_DESCRIPTOR`], the textual descriptor generated from the vendor headers
//!   when this crate was built
//!
//! ## Build Process
//!
//! The build script turns the vendor headers into the descriptor, then runs `bindgen`
//! over the same headers, restricted to what the descriptor declares. When no headers
//! are found or libclang is unavailable, hand-written records matching the minimal
//! descriptor are used instead, after checking them against whatever the headers
//! declare. [`BINDINGS_FROM_HEADERS`] tells which one was compiled in.
//!
//! ## Usage
//!
//! **Most users should NOT use this crate directly.** Use the safe `smpt` crate, which
//! finds and loads the library, manages device lifetimes and maps result codes to
//! errors.
//!
//! ## Safety
//!
//! All functions are `unsafe` and require the caller to uphold the library's
//! invariants:
//! - A device must be opened before any command is sent on it
//! - Devices are NOT thread-safe
//! - Pointers must remain valid for the duration of a call

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]

extern crate libloading;

/// Binding descriptor generated from the vendor headers at build time.
pub const BINDING_DESCRIPTOR: &str = include_str!(concat!(env!("OUT_DIR"), "/smpt.cdef"));

/// `true` when the records and function table were generated from the vendor headers,
/// `false` when the hand-written fallback is in use.
pub const BINDINGS_FROM_HEADERS: bool = cfg!(smpt_bindgen);

// Suppress expected warnings from bindgen-generated code.
#[cfg(smpt_bindgen)]
#[allow(missing_docs)]
#[allow(unsafe_op_in_unsafe_fn)]
#[allow(deref_nullptr)]
#[allow(rustdoc::broken_intra_doc_links)]
#[allow(rustdoc::invalid_html_tags)]
mod generated {
    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
}
#[cfg(smpt_bindgen)]
pub use generated::*;

#[cfg(not(smpt_bindgen))]
mod fallback;
#[cfg(not(smpt_bindgen))]
pub use fallback::*;
