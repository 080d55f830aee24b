//! Transaction outcomes
//!
//! Every public bus operation returns `Result<(), Error>`. The variants form
//! a closed set; a failed transaction is reported to the caller and never
//! retried internally.

use core::fmt;

/// Failure of a bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The clock line did not rise within the START/STOP retry budget
    ///
    /// Another master or a stuck peripheral is holding SCL low.
    Arbitration,
    /// No acknowledge on the address byte
    NoDevice,
    /// A data byte was not acknowledged; the rest of the buffer was not sent
    Incomplete,
    /// The register index byte was not acknowledged
    RegisterRejected,
    /// Rejected before touching the bus (address outside the 7-bit range)
    InvalidArgument,
}

impl Error {
    /// Stable numeric code for the outcome
    ///
    /// Success is `0` (see [`outcome_code`]); errors are `1..=5`.
    pub const fn code(self) -> i8 {
        match self {
            Error::Arbitration => 1,
            Error::NoDevice => 2,
            Error::Incomplete => 3,
            Error::RegisterRejected => 4,
            Error::InvalidArgument => 5,
        }
    }

}

/// Numeric outcome code of a whole transaction result
pub fn outcome_code(result: &Result<(), Error>) -> i8 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Arbitration => "bus arbitration timeout",
            Error::NoDevice => "no device acknowledged the address",
            Error::Incomplete => "data byte not acknowledged",
            Error::RegisterRejected => "register index not acknowledged",
            Error::InvalidArgument => "invalid argument",
        };
        f.write_str(msg)
    }
}
