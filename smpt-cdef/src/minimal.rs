// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Hand-written declarations used when no header could be parsed at all.
//!
//! They cover the device record, the records of the low-level commands and the
//! acknowledgements, and the six functions the lifecycle layer cannot do without.

use crate::collector::Accumulator;

pub const MINIMAL_TYPES: [&str; 5] = [
    "typedef struct { unsigned int packet_length; unsigned char packet[1200]; unsigned char cmd_list_data[1000]; signed char current_packet_number; char serial_port_name[256]; unsigned char packet_input_buffer_data[120000]; unsigned char packet_input_buffer_state[100]; } Smpt_device;",
    "typedef struct { unsigned char packet_number; unsigned char electrode_count; unsigned char reserved[14]; } Smpt_ll_init;",
    "typedef struct { unsigned char channel_number; unsigned char pulse_width; unsigned char current; unsigned char reserved[13]; } Smpt_ll_channel_config;",
    "typedef struct { unsigned char packet_number; unsigned char version_major; unsigned char version_minor; unsigned char version_patch; char version_string[64]; unsigned char reserved[16]; } Smpt_get_extended_version_ack;",
    "typedef struct { unsigned char packet_number; unsigned short command_number; unsigned char result; } Smpt_ack;",
];

pub const MINIMAL_FUNCTIONS: [&str; 6] = [
    "bool smpt_open_serial_port(Smpt_device *const device, const char *const device_name);",
    "bool smpt_close_serial_port(Smpt_device *const device);",
    "bool smpt_check_serial_port(const char *const device_name);",
    "unsigned char smpt_packet_number_generator_next(Smpt_device *const device);",
    "bool smpt_new_packet_received(Smpt_device *const device);",
    "void smpt_last_ack(Smpt_device *const device, Smpt_ack *const ack);",
];

const MINIMAL_NAMES: [&str; 11] = [
    "Smpt_device",
    "Smpt_ll_init",
    "Smpt_ll_channel_config",
    "Smpt_get_extended_version_ack",
    "Smpt_ack",
    "smpt_open_serial_port",
    "smpt_close_serial_port",
    "smpt_check_serial_port",
    "smpt_packet_number_generator_next",
    "smpt_new_packet_received",
    "smpt_last_ack",
];

/// An accumulator holding only the minimal declarations.
pub fn minimal_accumulator() -> Accumulator {
    let mut acc = Accumulator::new();
    for entry in MINIMAL_TYPES {
        acc.push_type(entry.to_string());
    }
    for entry in MINIMAL_FUNCTIONS {
        acc.push_function(entry.to_string());
    }
    for name in MINIMAL_NAMES {
        acc.declare(name);
    }
    acc
}
