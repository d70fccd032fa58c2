use core::fmt;

/// Errors returned by the translation layer.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Event record specified an invalid length value or was too short.
    InvalidLength,

    /// Invalid value supplied for field.
    InvalidValue,

    /// Unexpectedly reached EOF while reading or writing data.
    ///
    /// This is returned when a command's parameters do not fit the packet
    /// buffer, and also when reaching EOF prematurely while decoding an
    /// event payload.
    Eof,

    /// A fixed-capacity buffer or table was exhausted.
    ///
    /// The equivalent of a heap allocation failure: the event or entry that
    /// needed the space is dropped, nothing else is affected.
    Memory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Error::InvalidLength => "invalid length value specified",
            Error::InvalidValue => "invalid value for field",
            Error::Eof => "end of buffer",
            Error::Memory => "out of buffer space",
        })
    }
}
