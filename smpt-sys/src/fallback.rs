// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Hand-written records and function table, used when no bindings could be generated
//! from the vendor headers.
//!
//! They follow the shape bindgen gives the generated ones and mirror the minimal
//! descriptor. The build script refuses to use them when the parsed headers declare
//! these records differently.

use std::os::raw::{c_char, c_uint};

pub const Smpt_Length_Max_Packet_Size: u32 = 1200;
pub const Smpt_Length_Packet_Input_Buffer_Rows: u32 = 100;
pub const Smpt_Length_Serial_Port_Chars: u32 = 256;
pub const Smpt_Length_Cmd_List_Data: u32 = 1000;

pub type Smpt_Result = c_uint;
pub const Smpt_Result_Successful: Smpt_Result = 0;
pub const Smpt_Result_Transfer_Error: Smpt_Result = 1;
pub const Smpt_Result_Parameter_Error: Smpt_Result = 2;
pub const Smpt_Result_Protocol_Error: Smpt_Result = 3;
pub const Smpt_Result_Uc_Stim_Timeout_Error: Smpt_Result = 4;
pub const Smpt_Result_Emg_Timeout_Error: Smpt_Result = 5;
pub const Smpt_Result_Emg_Register_Error: Smpt_Result = 6;
pub const Smpt_Result_Not_Initialized_Error: Smpt_Result = 7;
pub const Smpt_Result_Hv_Error: Smpt_Result = 8;
pub const Smpt_Result_Demux_Timeout_Error: Smpt_Result = 9;
pub const Smpt_Result_Electrode_Error: Smpt_Result = 10;
pub const Smpt_Result_Invalid_Cmd_Error: Smpt_Result = 11;
pub const Smpt_Result_Demux_Parameter_Error: Smpt_Result = 12;
pub const Smpt_Result_Demux_Not_Initialized_Error: Smpt_Result = 13;
pub const Smpt_Result_Demux_Transfer_Error: Smpt_Result = 14;
pub const Smpt_Result_Demux_Unknown_Ack_Error: Smpt_Result = 15;
pub const Smpt_Result_Pulse_Timeout_Error: Smpt_Result = 16;
pub const Smpt_Result_Fuel_Gauge_Error: Smpt_Result = 17;
pub const Smpt_Result_Live_Signal_Error: Smpt_Result = 18;
pub const Smpt_Result_File_Transmission_Timeout: Smpt_Result = 19;
pub const Smpt_Result_File_Not_Found: Smpt_Result = 20;
pub const Smpt_Result_Busy: Smpt_Result = 21;
pub const Smpt_Result_File_Error: Smpt_Result = 22;
pub const Smpt_Result_Flash_Erase_Error: Smpt_Result = 23;
pub const Smpt_Result_Flash_Write_Error: Smpt_Result = 24;
pub const Smpt_Result_Unknown_Controller_Error: Smpt_Result = 25;
pub const Smpt_Result_Firmware_Too_Large_Error: Smpt_Result = 26;
pub const Smpt_Result_Fuel_Gauge_Not_Programmed: Smpt_Result = 27;
pub const Smpt_Result_Pulse_Low_Current_Error: Smpt_Result = 28;
pub const Smpt_Result_Last_Item: Smpt_Result = 29;

/// Device record. Holds the serial port, the packet buffers and the sequence counter.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct Smpt_device {
    pub packet_length: c_uint,
    pub packet: [u8; Smpt_Length_Max_Packet_Size as usize],
    pub cmd_list_data: [u8; Smpt_Length_Cmd_List_Data as usize],
    pub current_packet_number: i8,
    pub serial_port_name: [c_char; Smpt_Length_Serial_Port_Chars as usize],
    pub packet_input_buffer_data:
        [u8; (Smpt_Length_Packet_Input_Buffer_Rows * Smpt_Length_Max_Packet_Size) as usize],
    pub packet_input_buffer_state: [u8; Smpt_Length_Packet_Input_Buffer_Rows as usize],
}

impl Default for Smpt_device {
    fn default() -> Self {
        let mut s = ::std::mem::MaybeUninit::<Self>::uninit();
        unsafe {
            ::std::ptr::write_bytes(s.as_mut_ptr(), 0, 1);
            s.assume_init()
        }
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Smpt_ll_init {
    pub packet_number: u8,
    pub electrode_count: u8,
    pub reserved: [u8; 14],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Smpt_ll_channel_config {
    pub channel_number: u8,
    pub pulse_width: u8,
    pub current: u8,
    pub reserved: [u8; 13],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Smpt_get_extended_version_ack {
    pub packet_number: u8,
    pub version_major: u8,
    pub version_minor: u8,
    pub version_patch: u8,
    pub version_string: [c_char; 64],
    pub reserved: [u8; 16],
}

impl Default for Smpt_get_extended_version_ack {
    fn default() -> Self {
        let mut s = ::std::mem::MaybeUninit::<Self>::uninit();
        unsafe {
            ::std::ptr::write_bytes(s.as_mut_ptr(), 0, 1);
            s.assume_init()
        }
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Smpt_ack {
    pub packet_number: u8,
    pub command_number: u16,
    pub result: u8,
}

/// Function table of a loaded ScienceMode library.
pub struct SmptLibrary {
    __library: ::libloading::Library,
    pub smpt_open_serial_port: Result<
        unsafe extern "C" fn(device: *mut Smpt_device, device_name: *const c_char) -> bool,
        ::libloading::Error,
    >,
    pub smpt_close_serial_port:
        Result<unsafe extern "C" fn(device: *mut Smpt_device) -> bool, ::libloading::Error>,
    pub smpt_check_serial_port:
        Result<unsafe extern "C" fn(device_name: *const c_char) -> bool, ::libloading::Error>,
    pub smpt_packet_number_generator_next:
        Result<unsafe extern "C" fn(device: *mut Smpt_device) -> u8, ::libloading::Error>,
    pub smpt_new_packet_received:
        Result<unsafe extern "C" fn(device: *mut Smpt_device) -> bool, ::libloading::Error>,
    pub smpt_last_ack: Result<
        unsafe extern "C" fn(device: *mut Smpt_device, ack: *mut Smpt_ack),
        ::libloading::Error,
    >,
    pub smpt_send_get_extended_version: Result<
        unsafe extern "C" fn(device: *mut Smpt_device, packet_number: u8) -> bool,
        ::libloading::Error,
    >,
    pub smpt_get_get_extended_version_ack: Result<
        unsafe extern "C" fn(
            device: *mut Smpt_device,
            ack: *mut Smpt_get_extended_version_ack,
        ) -> bool,
        ::libloading::Error,
    >,
    pub smpt_send_ll_init: Result<
        unsafe extern "C" fn(device: *mut Smpt_device, ll_init: *const Smpt_ll_init) -> bool,
        ::libloading::Error,
    >,
    pub smpt_send_ll_channel_config: Result<
        unsafe extern "C" fn(
            device: *mut Smpt_device,
            ll_channel_config: *const Smpt_ll_channel_config,
        ) -> bool,
        ::libloading::Error,
    >,
    pub smpt_send_ll_stop: Result<
        unsafe extern "C" fn(device: *mut Smpt_device, packet_number: u8) -> bool,
        ::libloading::Error,
    >,
}

impl SmptLibrary {
    /// Loads the library at `path` and resolves every known symbol.
    pub unsafe fn new<P>(path: P) -> Result<Self, ::libloading::Error>
    where
        P: AsRef<::std::ffi::OsStr>,
    {
        let library = unsafe { ::libloading::Library::new(path) }?;
        unsafe { Self::from_library(library) }
    }

    /// Resolves every known symbol of an already loaded library.
    ///
    /// Missing symbols are kept as errors in their table entry.
    pub unsafe fn from_library<L>(library: L) -> Result<Self, ::libloading::Error>
    where
        L: Into<::libloading::Library>,
    {
        let __library = library.into();
        unsafe {
            let smpt_open_serial_port = __library.get(b"smpt_open_serial_port\0").map(|sym| *sym);
            let smpt_close_serial_port =
                __library.get(b"smpt_close_serial_port\0").map(|sym| *sym);
            let smpt_check_serial_port =
                __library.get(b"smpt_check_serial_port\0").map(|sym| *sym);
            let smpt_packet_number_generator_next = __library
                .get(b"smpt_packet_number_generator_next\0")
                .map(|sym| *sym);
            let smpt_new_packet_received =
                __library.get(b"smpt_new_packet_received\0").map(|sym| *sym);
            let smpt_last_ack = __library.get(b"smpt_last_ack\0").map(|sym| *sym);
            let smpt_send_get_extended_version = __library
                .get(b"smpt_send_get_extended_version\0")
                .map(|sym| *sym);
            let smpt_get_get_extended_version_ack = __library
                .get(b"smpt_get_get_extended_version_ack\0")
                .map(|sym| *sym);
            let smpt_send_ll_init = __library.get(b"smpt_send_ll_init\0").map(|sym| *sym);
            let smpt_send_ll_channel_config = __library
                .get(b"smpt_send_ll_channel_config\0")
                .map(|sym| *sym);
            let smpt_send_ll_stop = __library.get(b"smpt_send_ll_stop\0").map(|sym| *sym);
            Ok(SmptLibrary {
                __library,
                smpt_open_serial_port,
                smpt_close_serial_port,
                smpt_check_serial_port,
                smpt_packet_number_generator_next,
                smpt_new_packet_received,
                smpt_last_ack,
                smpt_send_get_extended_version,
                smpt_get_get_extended_version_ack,
                smpt_send_ll_init,
                smpt_send_ll_channel_config,
                smpt_send_ll_stop,
            })
        }
    }
}
