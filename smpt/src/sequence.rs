// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Packet sequence numbers.
//!
//! Every outgoing command carries the device's current sequence number, and the device
//! echoes it in the acknowledgement. The first number handed out after a port is opened
//! is [`FIRST`]; after `u8::MAX` the counter restarts at [`RESTART`], never at zero.

/// Counter value of a freshly opened device.
pub const FIRST: u8 = 0;

/// Counter value following `u8::MAX`.
pub const RESTART: u8 = 1;

/// Returns the current value of `counter` and advances it.
pub fn next(counter: &mut u8) -> u8 {
    let current = *counter;
    *counter = if current == u8::MAX {
        RESTART
    } else {
        current + 1
    };
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_up_from_zero() {
        let mut counter = FIRST;
        assert_eq!(next(&mut counter), 0);
        assert_eq!(next(&mut counter), 1);
        assert_eq!(counter, 2);
    }

    #[test]
    fn wraps_to_one() {
        let mut counter = 254;
        assert_eq!(next(&mut counter), 254);
        assert_eq!(next(&mut counter), 255);
        assert_eq!(next(&mut counter), 1);
        assert_eq!(next(&mut counter), 2);
    }
}
