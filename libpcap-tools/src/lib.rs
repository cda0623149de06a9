#[macro_use]
extern crate log;

mod analyzer;
mod config;
mod context;
mod duration;
mod engine;
mod error;
mod five_tuple;
mod packet;

pub use analyzer::*;
pub use config::Config;
pub use context::*;
pub use duration::{Duration, MICROS_PER_SEC};
pub use engine::*;
pub use error::*;
pub use five_tuple::*;
pub use packet::*;

pub use pcap_parser::data::PacketData;
