//! Stateless introspection of TCP/IP packets
//!
//! A captured frame is first split into typed layers by the layer decoder
//! ([`decode_frame`]), then normalized into a [`PacketRecord`]:
//!
//! ```rust,ignore
//! match libpcap_tcpview::parse(&frame)? {
//!     ParseOutcome::Full(record) => println!("{}", record.describe()),
//!     ParseOutcome::Skip(reason) => debug!("skipped: {}", reason),
//! }
//! ```
//!
//! Records own their data and are immutable once built, so they can be shared
//! between threads.

mod decoder;
mod error;
mod flags;
mod layers;
mod options;
mod record;

pub use decoder::*;
pub use error::*;
pub use flags::*;
pub use layers::*;
pub use options::*;
pub use record::*;
