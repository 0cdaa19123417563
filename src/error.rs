use std::fmt;

/// Which kind of address text failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Mac,
    Ipv4,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Mac => f.write_str("MAC"),
            AddressKind::Ipv4 => f.write_str("IPv4"),
        }
    }
}

/// Malformed MAC or IPv4 address text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} address {input:?}: {reason}")]
pub struct FormatError {
    pub kind: AddressKind,
    pub input: String,
    pub reason: &'static str,
}

impl FormatError {
    pub fn new(kind: AddressKind, input: &str, reason: &'static str) -> Self {
        FormatError { kind, input: input.to_string(), reason }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid error probability {0} (expected a value between 0.0 and 1.0)")]
    Probability(f64),
    #[error("datagram of {0} bytes does not fit the IPv4 total length field")]
    Oversize(usize),
    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("interface {name}: {reason}")]
    Interface { name: String, reason: String },
    #[error("this tool must be run as root to use raw sockets")]
    NotRoot,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
