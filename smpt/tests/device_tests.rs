// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Device handle tests against the simulated binding.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use smpt::{
    BindingKind, Device, Error, SimulatedApi, SmptApi, SmptApiHandle, device::version_string,
};
use smpt_sys::{Smpt_ack, Smpt_device, Smpt_get_extended_version_ack, Smpt_ll_init};

fn simulated() -> SmptApiHandle {
    Arc::new(SimulatedApi)
}

#[test]
fn first_packet_number_is_zero_and_wraps_to_one() {
    let mut device = Device::open(simulated(), "COM1").unwrap();

    assert_eq!(device.next_packet_number().unwrap(), 0);
    for expected in 1..=255u8 {
        assert_eq!(device.next_packet_number().unwrap(), expected);
    }
    assert_eq!(device.next_packet_number().unwrap(), 1);
    assert_eq!(device.next_packet_number().unwrap(), 2);
    assert_eq!(device.current_packet_number().unwrap(), 3);
}

#[test]
fn reopening_resets_the_sequence() {
    let mut device = Device::open(simulated(), "COM1").unwrap();
    device.next_packet_number().unwrap();
    device.next_packet_number().unwrap();
    device.close_serial_port().unwrap();
    device.open_serial_port("COM2").unwrap();
    assert_eq!(device.next_packet_number().unwrap(), 0);
}

#[test]
fn simulated_port_lifecycle() {
    let api = simulated();
    assert_eq!(api.kind(), BindingKind::Simulated);
    assert!(Device::check_serial_port(&api, "/dev/does-not-exist").unwrap());

    let mut device = Device::new(api);
    assert!(!device.is_open());
    assert_eq!(device.port_name(), None);

    device.open_serial_port("/dev/ttyUSB0").unwrap();
    assert!(device.is_open());
    assert_eq!(device.port_name().as_deref(), Some("/dev/ttyUSB0"));
    assert!(!device.new_packet_received().unwrap());
    assert_eq!(device.last_ack().unwrap(), Smpt_ack::default());
    assert!(device.check_last_ack().is_ok());

    device.close_serial_port().unwrap();
    assert!(!device.is_open());
}

#[test]
fn long_port_names_are_truncated() {
    let long = "x".repeat(300);
    let device = Device::open(simulated(), &long).unwrap();
    assert_eq!(device.port_name().map(|name| name.len()), Some(255));
}

#[test]
fn simulated_binding_reports_missing_commands() {
    let mut device = Device::open(simulated(), "COM1").unwrap();
    assert!(matches!(
        device.send_ll_init(Smpt_ll_init::default()),
        Err(Error::FunctionUnavailable("smpt_send_ll_init"))
    ));
    assert!(matches!(
        device.get_extended_version_ack(),
        Err(Error::FunctionUnavailable("smpt_get_get_extended_version_ack"))
    ));
    assert!(matches!(
        device.send_ll_stop(),
        Err(Error::FunctionUnavailable("smpt_send_ll_stop"))
    ));
}

#[test]
fn released_device_rejects_calls() {
    let mut device = Device::open(simulated(), "COM1").unwrap();
    device.release().unwrap();
    assert!(matches!(device.next_packet_number(), Err(Error::Released)));
    assert!(matches!(device.current_packet_number(), Err(Error::Released)));
    assert!(device.release().is_ok());
}

/// Records close calls and answers commands like a device that acknowledges with
/// `result`.
struct RecordingApi {
    closes: AtomicUsize,
    sent: Mutex<Vec<u8>>,
    result: u8,
}

impl RecordingApi {
    fn new(result: u8) -> Arc<Self> {
        Arc::new(Self {
            closes: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            result,
        })
    }
}

impl SmptApi for RecordingApi {
    fn kind(&self) -> BindingKind {
        BindingKind::Native
    }

    fn check_serial_port(&self, port: &std::ffi::CStr) -> smpt::Result<bool> {
        SimulatedApi.check_serial_port(port)
    }

    fn open_serial_port(&self, device: &mut Smpt_device, port: &std::ffi::CStr) -> smpt::Result<()> {
        SimulatedApi.open_serial_port(device, port)
    }

    fn close_serial_port(&self, device: &mut Smpt_device) -> smpt::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        SimulatedApi.close_serial_port(device)
    }

    fn packet_number_generator_next(&self, device: &mut Smpt_device) -> smpt::Result<u8> {
        SimulatedApi.packet_number_generator_next(device)
    }

    fn new_packet_received(&self, _device: &mut Smpt_device) -> smpt::Result<bool> {
        Ok(true)
    }

    fn last_ack(&self, _device: &mut Smpt_device) -> smpt::Result<Smpt_ack> {
        let packet_number = self.sent.lock().unwrap().last().copied().unwrap_or(0);
        Ok(Smpt_ack {
            packet_number,
            result: self.result,
            ..Default::default()
        })
    }

    fn send_get_extended_version(&self, _device: &mut Smpt_device, packet_number: u8) -> smpt::Result<()> {
        self.sent.lock().unwrap().push(packet_number);
        Ok(())
    }

    fn get_extended_version_ack(
        &self,
        _device: &mut Smpt_device,
    ) -> smpt::Result<Smpt_get_extended_version_ack> {
        let mut ack = Smpt_get_extended_version_ack {
            version_major: 4,
            ..Default::default()
        };
        for (slot, byte) in ack.version_string.iter_mut().zip(b"4.0.0") {
            *slot = *byte as std::ffi::c_char;
        }
        Ok(ack)
    }

    fn send_ll_init(&self, _device: &mut Smpt_device, ll_init: &Smpt_ll_init) -> smpt::Result<()> {
        self.sent.lock().unwrap().push(ll_init.packet_number);
        Ok(())
    }
}

#[test]
fn commands_carry_consecutive_packet_numbers() {
    let api = RecordingApi::new(0);
    let mut device = Device::open(api.clone(), "COM1").unwrap();

    assert_eq!(device.send_get_extended_version().unwrap(), 0);
    let ack = device.check_last_ack().unwrap();
    assert_eq!(ack.packet_number, 0);
    let version = device.get_extended_version_ack().unwrap();
    assert_eq!(version_string(&version), "4.0.0");

    let init = Smpt_ll_init {
        electrode_count: 2,
        ..Default::default()
    };
    assert_eq!(device.send_ll_init(init).unwrap(), 1);
    assert_eq!(*api.sent.lock().unwrap(), [0, 1]);
}

#[test]
fn failed_acknowledgement_maps_to_an_error() {
    let api = RecordingApi::new(smpt_sys::Smpt_Result_Electrode_Error as u8);
    let mut device = Device::open(api, "COM1").unwrap();
    device.send_ll_init(Smpt_ll_init::default()).unwrap();
    assert!(matches!(
        device.check_last_ack(),
        Err(Error::Device(smpt::ResultCode::ElectrodeError))
    ));
}

#[test]
fn dropping_an_open_device_closes_the_port_once() {
    let api = RecordingApi::new(0);
    {
        let _device = Device::open(api.clone(), "COM1").unwrap();
    }
    assert_eq!(api.closes.load(Ordering::SeqCst), 1);

    {
        let mut device = Device::open(api.clone(), "COM1").unwrap();
        device.close_serial_port().unwrap();
    }
    assert_eq!(api.closes.load(Ordering::SeqCst), 2);

    {
        let _never_opened = Device::new(api.clone());
    }
    assert_eq!(api.closes.load(Ordering::SeqCst), 2);
}

#[test]
fn device_moves_across_threads() {
    let mut device = Device::open(simulated(), "COM1").unwrap();
    device.next_packet_number().unwrap();
    let handle = std::thread::spawn(move || device.next_packet_number().unwrap());
    assert_eq!(handle.join().unwrap(), 1);
}
