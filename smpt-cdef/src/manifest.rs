// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! The header manifest: which vendor headers the pipeline reads.
//!
//! This list is a versioned contract with the vendor library. A header added to the
//! vendor tree without a manifest entry contributes nothing to the descriptor.

use serde::Serialize;

use crate::locator::Layout;

/// Entry-point headers that transitively include the whole tree.
const ROOT_HEADERS: [&str; 4] = [
    "general/smpt_client.h",
    "dyscom-level/smpt_dl_client.h",
    "low-level/smpt_ll_client.h",
    "mid-level/smpt_ml_client.h",
];

/// Headers whose top-level `#define` constants are harvested.
const DEFINE_HEADERS: [&str; 43] = [
    "general/smpt_client_data.h",
    "general/smpt_definitions_data_types.h",
    "general/smpt_client_cmd_lists.h",
    "general/smpt_definitions.h",
    "general/smpt_definitions_internal.h",
    "general/smpt_messages.h",
    "general/packet/smpt_packet_general.h",
    "general/packet/smpt_packet_internal.h",
    "general/packet/smpt_packet_validity.h",
    "general/packet/smpt_packet_utils.h",
    "general/packet/smpt_packet_client.h",
    "general/packet/smpt_packet_server.h",
    "general/packet_input_buffer/smpt_packet_input_buffer.h",
    "general/packet_input_buffer/smpt_packet_input_buffer_definitions.h",
    "general/packet_input_buffer/smpt_packet_input_buffer_internal.h",
    "general/packet_output_buffer/smpt_packet_output_buffer.h",
    "general/serial_port/smpt_serial_port.h",
    "general/serial_port/smpt_serial_port_windows.h",
    "general/serial_port/smpt_serial_port_linux.h",
    "general/smpt_definitions_file_transfer.h",
    "general/smpt_file.h",
    "general/smpt_packet_number_generator.h",
    "general/smpt_definitions_power.h",
    "general/smpt_client_power.h",
    "general/smpt_client_utils.h",
    "low-level/smpt_ll_definitions.h",
    "low-level/smpt_ll_packet_client.h",
    "low-level/smpt_ll_packet_server.h",
    "low-level/smpt_ll_packet_validity.h",
    "low-level/smpt_ll_definitions_data_types.h",
    "low-level/smpt_ll_messages.h",
    "mid-level/smpt_ml_definitions.h",
    "mid-level/smpt_ml_packet_client.h",
    "mid-level/smpt_ml_packet_server.h",
    "mid-level/smpt_ml_packet_validity.h",
    "mid-level/smpt_ml_packet_utils.h",
    "mid-level/smpt_ml_definitions_data_types.h",
    "dyscom-level/smpt_dl_definitions.h",
    "dyscom-level/smpt_dl_packet_client.h",
    "dyscom-level/smpt_dl_packet_server.h",
    "dyscom-level/smpt_dl_packet_validity.h",
    "dyscom-level/smpt_dl_packet_utils.h",
    "dyscom-level/smpt_dl_definitions_data_types.h",
];

/// Ordered header lists, relative to the include root, `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderManifest {
    /// Headers handed to the parser.
    pub root_headers: Vec<String>,
    /// Headers scanned for `#define` constants.
    pub define_headers: Vec<String>,
}

impl HeaderManifest {
    /// The vendor manifest, spelled for the given layout.
    ///
    /// A flattened tree keeps every header in one directory, so only the file name of
    /// each entry is kept.
    pub fn vendor(layout: Layout) -> Self {
        let spell = |path: &&str| match layout {
            Layout::Nested => path.to_string(),
            Layout::Flattened => path.rsplit('/').next().unwrap_or(path).to_string(),
        };
        Self {
            root_headers: ROOT_HEADERS.iter().map(spell).collect(),
            define_headers: DEFINE_HEADERS.iter().map(spell).collect(),
        }
    }

    /// A custom manifest.
    pub fn new<R, D>(root_headers: R, define_headers: D) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            root_headers: root_headers.into_iter().map(Into::into).collect(),
            define_headers: define_headers.into_iter().map(Into::into).collect(),
        }
    }
}
