use periphlink_frame::{FrameError, InboundFrame, Respond, Selector, WriterConfig};
use periphlink_registry::{Handled, LibraryRegistry};
use periphlink_transport::TransportError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Board, Traced, INPUT, LOW, OUTPUT};
use crate::command::{BuiltinCommand, DURATION, FREQUENCY, MODE, PIN, PWM_VALUE, VALUE};

/// Separator between fields of the device description.
pub const DESCRIPTION_SEPARATOR: u8 = 0x3B;

/// First pin touched by the reset command; 0 and 1 carry the serial link.
pub const FIRST_RESET_PIN: u8 = 2;

/// Default platform id reported in the device description.
pub const DEFAULT_PLATFORM_ID: &str = "Uno";

/// Configuration for [`CommandRouter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Platform id reported in the device description.
    pub platform_id: String,
    /// Whether diagnostic traces are emitted. Also reported as the trace
    /// byte of the device description.
    pub diagnostics_enabled: bool,
}

impl DeviceConfig {
    /// Writer settings derived from this configuration.
    ///
    /// The dispatcher builds every [`periphlink_frame::ResponseWriter`] from
    /// this, so `diagnostics_enabled` here is the only switch that matters.
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            diagnostics_enabled: self.diagnostics_enabled,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            platform_id: DEFAULT_PLATFORM_ID.to_string(),
            diagnostics_enabled: false,
        }
    }
}

/// Why a frame produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Selector byte is neither device nor library.
    UnknownSelector(u8),
    /// Device command id outside the built-in set.
    UnknownCommand(u8),
    /// No library registered under this id.
    UnknownLibrary(u8),
    /// The library did not recognise its command.
    LibraryIgnored(u8),
}

/// Result of routing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    Dropped(DropReason),
}

/// Splits inbound frames between the built-in command set and the
/// registered peripheral libraries.
pub struct CommandRouter<B> {
    board: B,
    registry: LibraryRegistry,
    config: DeviceConfig,
}

impl<B: Board> CommandRouter<B> {
    pub fn new(board: B, registry: LibraryRegistry, config: DeviceConfig) -> Self {
        Self {
            board,
            registry,
            config,
        }
    }

    /// Route one frame and answer it through `out`.
    ///
    /// Unknown selectors, commands and libraries are dropped without a reply.
    /// A frame too short for its command fails with [`FrameError::ShortFrame`]
    /// before any hardware call is made.
    pub fn dispatch(
        &mut self,
        frame: &InboundFrame,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Outcome> {
        debug!(
            seq = frame.sequence_id(),
            selector = frame.selector_byte(),
            target = frame.target_id(),
            len = frame.len(),
            "dispatching frame"
        );

        match frame.selector() {
            Some(Selector::Device) => self.dispatch_builtin(frame, out),
            Some(Selector::Library) => self.dispatch_library(frame, out),
            None => Ok(dropped(DropReason::UnknownSelector(frame.selector_byte()))),
        }
    }

    fn dispatch_builtin(
        &mut self,
        frame: &InboundFrame,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Outcome> {
        let id = frame.target_id();
        let Some(command) = BuiltinCommand::from_id(id) else {
            return Ok(dropped(DropReason::UnknownCommand(id)));
        };
        command.layout().require(frame)?;

        match command {
            BuiltinCommand::GetServerInfo => {
                let description = self.describe();
                out.reply(id, &description)?;
            }
            BuiltinCommand::ResetPinsState => {
                let total = self.board.total_pins();
                let mut board = Traced {
                    board: &mut self.board,
                    out: &mut *out,
                };
                for pin in FIRST_RESET_PIN..total {
                    if board.board.is_digital_pin(pin) {
                        board.pin_mode(pin, OUTPUT)?;
                        board.digital_write(pin, LOW)?;
                        board.pin_mode(pin, INPUT)?;
                    }
                }
                out.reply(id, &[])?;
            }
            BuiltinCommand::GetAvailableRam => {
                let free = self.board.free_memory();
                out.reply(id, &free.to_be_bytes())?;
            }
            BuiltinCommand::WriteDigitalPin => {
                let (pin, value) = (PIN.read_u8(frame)?, VALUE.read_u8(frame)?);
                self.traced(out).digital_write(pin, value)?;
                out.reply(id, &[])?;
            }
            BuiltinCommand::ReadDigitalPin => {
                let pin = PIN.read_u8(frame)?;
                let value = self.traced(out).digital_read(pin)?;
                out.reply(id, &[value])?;
            }
            BuiltinCommand::ConfigureDigitalPin => {
                let (pin, mode) = (PIN.read_u8(frame)?, MODE.read_u8(frame)?);
                self.traced(out).pin_mode(pin, mode)?;
                out.reply(id, &[])?;
            }
            BuiltinCommand::WritePwmVoltage | BuiltinCommand::WritePwmDutyCycle => {
                let (pin, value) = (PIN.read_u8(frame)?, PWM_VALUE.read_u16(frame)?);
                self.traced(out).analog_write(pin, value)?;
                out.reply(id, &[])?;
            }
            BuiltinCommand::PlayTone => {
                let pin = PIN.read_u8(frame)?;
                let frequency = FREQUENCY.read_u16(frame)?;
                let duration = DURATION.read_u16(frame)?;
                self.traced(out)
                    .play_tone(pin, frequency, u32::from(duration))?;
                out.reply(id, &[])?;
            }
            BuiltinCommand::ReadVoltage => {
                let pin = PIN.read_u8(frame)?;
                let value = self.traced(out).analog_read(pin)?;
                out.reply(id, &[((value >> 8) & 0x03) as u8, (value & 0xff) as u8])?;
            }
        }

        Ok(Outcome::Replied)
    }

    fn dispatch_library(
        &mut self,
        frame: &InboundFrame,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Outcome> {
        let id = frame.target_id();
        let Some(library) = self.registry.lookup_mut(id) else {
            return Ok(dropped(DropReason::UnknownLibrary(id)));
        };

        match library.handle(frame, out)? {
            Handled::Replied => Ok(Outcome::Replied),
            Handled::Ignored => Ok(dropped(DropReason::LibraryIgnored(id))),
        }
    }

    fn traced<'a>(&'a mut self, out: &'a mut dyn Respond) -> Traced<'a, B> {
        Traced {
            board: &mut self.board,
            out,
        }
    }

    /// Device description payload.
    ///
    /// `platform ; trace ; id name ; id name ... 0x00`, where `;` is `0x3B`
    /// and the trailing `0x00` is part of the payload.
    pub fn describe(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.config.platform_id.len() + 4);
        payload.extend_from_slice(self.config.platform_id.as_bytes());
        payload.push(DESCRIPTION_SEPARATOR);
        payload.push(u8::from(self.config.diagnostics_enabled));
        payload.push(DESCRIPTION_SEPARATOR);

        for (index, (id, name)) in self.registry.names().enumerate() {
            if index > 0 {
                payload.push(DESCRIPTION_SEPARATOR);
            }
            payload.push(id);
            payload.extend_from_slice(name.as_bytes());
        }

        payload.push(0x00);
        payload
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn registry(&self) -> &LibraryRegistry {
        &self.registry
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Consume the router and return the board.
    pub fn into_board(self) -> B {
        self.board
    }
}

impl<B> std::fmt::Debug for CommandRouter<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn dropped(reason: DropReason) -> Outcome {
    debug!(?reason, "dropping frame without reply");
    Outcome::Dropped(reason)
}

/// Whether `err` aborts only the current frame.
///
/// Everything short of a closed transport is frame-local, including a
/// stalled or failed reply write.
pub fn is_frame_local(err: &FrameError) -> bool {
    !matches!(err, FrameError::Transport(TransportError::Closed))
}
