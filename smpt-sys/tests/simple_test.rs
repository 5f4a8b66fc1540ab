// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Smoke tests for the build-time descriptor and the raw records.

/// The descriptor always starts with the result-code enumeration and always declares
/// the device record and the core functions, even when built without vendor headers.
#[test]
fn there_is_a_generated_descriptor() {
    let descriptor = smpt_sys::BINDING_DESCRIPTOR;
    assert!(descriptor.starts_with("typedef enum { Smpt_Result_Successful = 0,"));
    assert!(descriptor.contains("Smpt_device"));
    assert!(descriptor.contains("smpt_packet_number_generator_next"));
    assert!(descriptor.lines().all(|line| !line.is_empty()));
}

#[test]
fn records_are_zero_initialised() {
    let device = smpt_sys::Smpt_device::default();
    assert_eq!(device.current_packet_number, 0);
    assert!(device.serial_port_name.iter().all(|&c| c == 0));

    let ack = smpt_sys::Smpt_ack {
        packet_number: 3,
        result: smpt_sys::Smpt_Result_Busy as u8,
        ..Default::default()
    };
    println!("ack: {:?}", ack);
}

/// The records compiled into the crate are the ones the descriptor declares.
#[test]
fn records_are_declared_by_the_descriptor() {
    let descriptor = smpt_sys::BINDING_DESCRIPTOR;
    for record in [
        "Smpt_device",
        "Smpt_ll_init",
        "Smpt_ll_channel_config",
        "Smpt_get_extended_version_ack",
        "Smpt_ack",
    ] {
        assert!(
            descriptor.contains(&format!("}} {record};")),
            "{record} missing from descriptor"
        );
    }
    if !smpt_sys::BINDINGS_FROM_HEADERS {
        assert!(descriptor.contains("unsigned char packet[1200];"));
    }
}
