// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for ScienceMode operations.
//!
//! This module maps the result codes carried by acknowledgements to a typed
//! [`ResultCode`], and collects the Rust-level failures (library loading, string
//! conversion, missing symbols) into one [`Error`] enum.

use serde::Serialize;

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Non-successful result codes reported by the device in an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ResultCode {
    TransferError = 1,
    ParameterError = 2,
    ProtocolError = 3,
    UcStimTimeoutError = 4,
    EmgTimeoutError = 5,
    EmgRegisterError = 6,
    NotInitializedError = 7,
    HvError = 8,
    DemuxTimeoutError = 9,
    ElectrodeError = 10,
    InvalidCmdError = 11,
    DemuxParameterError = 12,
    DemuxNotInitializedError = 13,
    DemuxTransferError = 14,
    DemuxUnknownAckError = 15,
    PulseTimeoutError = 16,
    FuelGaugeError = 17,
    LiveSignalError = 18,
    FileTransmissionTimeout = 19,
    FileNotFound = 20,
    Busy = 21,
    FileError = 22,
    FlashEraseError = 23,
    FlashWriteError = 24,
    UnknownControllerError = 25,
    FirmwareTooLargeError = 26,
    FuelGaugeNotProgrammed = 27,
    PulseLowCurrentError = 28,
}

impl ResultCode {
    /// Maps a raw result byte to its code. `0` (success) and values past the last
    /// known code map to `None`.
    pub fn from_raw(raw: u8) -> Option<Self> {
        use ResultCode::*;
        let code = match raw {
            1 => TransferError,
            2 => ParameterError,
            3 => ProtocolError,
            4 => UcStimTimeoutError,
            5 => EmgTimeoutError,
            6 => EmgRegisterError,
            7 => NotInitializedError,
            8 => HvError,
            9 => DemuxTimeoutError,
            10 => ElectrodeError,
            11 => InvalidCmdError,
            12 => DemuxParameterError,
            13 => DemuxNotInitializedError,
            14 => DemuxTransferError,
            15 => DemuxUnknownAckError,
            16 => PulseTimeoutError,
            17 => FuelGaugeError,
            18 => LiveSignalError,
            19 => FileTransmissionTimeout,
            20 => FileNotFound,
            21 => Busy,
            22 => FileError,
            23 => FlashEraseError,
            24 => FlashWriteError,
            25 => UnknownControllerError,
            26 => FirmwareTooLargeError,
            27 => FuelGaugeNotProgrammed,
            28 => PulseLowCurrentError,
            _ => return None,
        };
        Some(code)
    }

    /// The raw result byte of this code.
    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Errors that can occur when using the ScienceMode library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device acknowledged a command with a non-successful result.
    #[error("Device reported {0:?}")]
    Device(ResultCode),

    /// A result byte outside the known range.
    #[error("Unknown result code: {0}")]
    UnknownResult(u8),

    /// The loaded binding does not provide the named function.
    #[error("Function unavailable: {0}")]
    FunctionUnavailable(&'static str),

    /// A native function reported failure by returning `false`.
    #[error("Call failed: {0}")]
    CallFailed(&'static str),

    /// No shared library could be loaded from any search directory.
    #[error("No loadable ScienceMode library found")]
    NoLibrary,

    /// The device record has already been released.
    #[error("Device released")]
    Released,

    /// A generic error for Rust-level failures not mapped to a result code.
    #[error("Other error: {0}")]
    Other(String),

    /// Failed to convert a Rust string to a C-compatible null-terminated string.
    #[error("Null string: {0}")]
    NulString(#[from] std::ffi::NulError),

    /// Failed to load or interact with the ScienceMode dynamic library.
    #[error("Loading library: {0}")]
    LibLoading(#[from] libloading::Error),
}

impl Error {
    /// Converts the result byte of an acknowledgement to a Rust [`Result`].
    ///
    /// # Arguments
    ///
    /// * `result` - The `result` field of an `Smpt_ack`
    ///
    /// # Returns
    ///
    /// - `Ok(())` if `result == Smpt_Result_Successful`
    /// - `Err(Error::Device(..))` for a known failure code
    /// - `Err(Error::UnknownResult(..))` otherwise
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let ack = device.last_ack()?;
    /// Error::from_result(ack.result)?;
    /// ```
    pub fn from_result(result: u8) -> Result<()> {
        if smpt_sys::Smpt_Result::from(result) == smpt_sys::Smpt_Result_Successful {
            return Ok(());
        }
        match ResultCode::from_raw(result) {
            Some(code) => Err(Error::Device(code)),
            None => Err(Error::UnknownResult(result)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_follow_the_native_table() {
        assert!(Error::from_result(0).is_ok());
        assert!(matches!(
            Error::from_result(smpt_sys::Smpt_Result_Busy as u8),
            Err(Error::Device(ResultCode::Busy))
        ));
        assert!(matches!(
            Error::from_result(smpt_sys::Smpt_Result_Pulse_Low_Current_Error as u8),
            Err(Error::Device(ResultCode::PulseLowCurrentError))
        ));
        assert!(matches!(
            Error::from_result(smpt_sys::Smpt_Result_Last_Item as u8),
            Err(Error::UnknownResult(29))
        ));
        for raw in 1..=28u8 {
            assert_eq!(ResultCode::from_raw(raw).map(ResultCode::as_raw), Some(raw));
        }
    }
}
