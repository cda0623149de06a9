use pcap_parser::PcapError;
use std::io;
use thiserror::Error;

/// Errors raised while reading capture data
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Generic(&'static str),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("pcap error: {0:?}")]
    Pcap(PcapError<&'static [u8]>),
}

impl From<&'static str> for Error {
    fn from(s: &'static str) -> Self {
        Error::Generic(s)
    }
}

impl<'a> From<PcapError<&'a [u8]>> for Error {
    fn from(e: PcapError<&'a [u8]>) -> Self {
        Error::Pcap(e.to_owned_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use pcap_parser::PcapError;

    #[test]
    fn error_from_pcap_error() {
        let e = Error::from(PcapError::<&[u8]>::Eof);
        assert!(matches!(e, Error::Pcap(PcapError::Eof)));
        assert_eq!(e.to_string(), "pcap error: Eof");
    }
}
