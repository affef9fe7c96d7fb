use periphlink_frame::{InboundFrame, Respond};

/// What a library did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// The library answered the host.
    Replied,
    /// The library did not recognise the command and sent nothing.
    Ignored,
}

/// A peripheral library that decodes and answers its own commands.
///
/// The router forwards the entire frame; the library reads its own command
/// id and parameters from the offsets its layouts define.
pub trait LibraryHandler: Send {
    /// Name reported in the device description.
    fn name(&self) -> &str;

    /// Handle one library frame.
    fn handle(
        &mut self,
        frame: &InboundFrame,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Handled>;
}

impl<H: LibraryHandler + ?Sized> LibraryHandler for Box<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn handle(
        &mut self,
        frame: &InboundFrame,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Handled> {
        (**self).handle(frame, out)
    }
}
