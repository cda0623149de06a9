use crate::context::ParseContext;
use crate::error::Error;
use crate::packet::CapturedFrame;

/// Common trait for consumers of captured frames
pub trait PcapAnalyzer {
    /// Initialization function, call before reading pcap data (optional)
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Callback function for every captured frame containing data
    fn handle_packet(&mut self, frame: &CapturedFrame, ctx: &ParseContext) -> Result<(), Error>;

    /// Teardown function, called after reading pcap data (optional)
    fn teardown(&mut self) {}

    /// Return false to stop reading before the end of the input
    fn wants_more(&self) -> bool {
        true
    }
}
