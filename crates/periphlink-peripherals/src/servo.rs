use periphlink_frame::{Field, FrameLayout, InboundFrame, Respond};
use periphlink_registry::{Handled, LibraryHandler};
use tracing::debug;

/// Name reported in the device description.
pub const SERVO_LIBRARY_NAME: &str = "Servo";

/// Servo slots per library instance.
pub const MAX_SERVOS: usize = 12;

pub const CREATE: u8 = 0x00;
pub const CLEAR: u8 = 0x01;
pub const READ_POSITION: u8 = 0x02;
pub const WRITE_POSITION: u8 = 0x03;

const SERVO_ID: Field = Field::byte("servo", 5);
const COMMAND: Field = Field::byte("command", 6);
const PIN: Field = Field::byte("pin", 7);
const MIN_PULSE: Field = Field::packed_u16("min_pulse", 8);
const MAX_PULSE: Field = Field::packed_u16("max_pulse", 11);
const ANGLE: Field = Field::packed_u8("angle", 7);

const HEADER: FrameLayout = FrameLayout::new("servo", &[SERVO_ID, COMMAND]);
const CREATE_LAYOUT: FrameLayout =
    FrameLayout::new("servo-create", &[SERVO_ID, COMMAND, PIN, MIN_PULSE, MAX_PULSE]);
const WRITE_LAYOUT: FrameLayout = FrameLayout::new("servo-write", &[SERVO_ID, COMMAND, ANGLE]);

/// Hobby servo outputs.
pub trait ServoDriver: Send {
    /// Attach servo `servo` to `pin` with the given pulse range in microseconds.
    fn attach(&mut self, servo: u8, pin: u8, min_pulse_us: u16, max_pulse_us: u16);

    fn detach(&mut self, servo: u8);

    /// Last commanded angle in degrees.
    fn read(&mut self, servo: u8) -> u8;

    fn write(&mut self, servo: u8, angle: u8);
}

/// Servo library.
///
/// Commands for a servo id that was never created, or was cleared, are
/// ignored.
#[derive(Debug)]
pub struct ServoLibrary<S> {
    driver: S,
    attached: [bool; MAX_SERVOS],
}

impl<S: ServoDriver> ServoLibrary<S> {
    pub fn new(driver: S) -> Self {
        Self {
            driver,
            attached: [false; MAX_SERVOS],
        }
    }

    pub fn driver(&self) -> &S {
        &self.driver
    }

    pub fn is_attached(&self, servo: u8) -> bool {
        self.attached
            .get(usize::from(servo))
            .copied()
            .unwrap_or(false)
    }
}

impl<S: ServoDriver> LibraryHandler for ServoLibrary<S> {
    fn name(&self) -> &str {
        SERVO_LIBRARY_NAME
    }

    fn handle(
        &mut self,
        frame: &InboundFrame,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Handled> {
        HEADER.require(frame)?;
        let servo = SERVO_ID.read_u8(frame)?;
        let command = COMMAND.read_u8(frame)?;

        let slot = usize::from(servo);
        if slot >= MAX_SERVOS {
            debug!(servo, "servo id out of range");
            return Ok(Handled::Ignored);
        }
        if command != CREATE && !self.attached[slot] {
            debug!(servo, command, "servo not created");
            return Ok(Handled::Ignored);
        }

        match command {
            CREATE => {
                CREATE_LAYOUT.require(frame)?;
                let pin = PIN.read_u8(frame)?;
                let (min, max) = (MIN_PULSE.read_u16(frame)?, MAX_PULSE.read_u16(frame)?);
                if self.attached[slot] {
                    self.driver.detach(servo);
                }
                self.driver.attach(servo, pin, min, max);
                self.attached[slot] = true;
                trace(out, || {
                    format!("Arduino::servoArray[{servo}]->attach({pin}, {min}, {max})\n")
                })?;
                out.reply(CREATE, &[])?;
            }
            CLEAR => {
                self.driver.detach(servo);
                self.attached[slot] = false;
                trace(out, || format!("Arduino::servoArray[{servo}]->detach()\n"))?;
                out.reply(CLEAR, &[])?;
            }
            READ_POSITION => {
                let angle = self.driver.read(servo);
                trace(out, || {
                    format!("Arduino::servoArray[{servo}]->read(); --> {angle}\n")
                })?;
                out.reply(READ_POSITION, &[angle])?;
            }
            WRITE_POSITION => {
                WRITE_LAYOUT.require(frame)?;
                let angle = ANGLE.read_u8(frame)?;
                self.driver.write(servo, angle);
                trace(out, || format!("Arduino::servoArray[{servo}]->write({angle});\n"))?;
                out.reply(WRITE_POSITION, &[])?;
            }
            other => {
                debug!(command = other, "unrecognized servo command");
                return Ok(Handled::Ignored);
            }
        }

        Ok(Handled::Replied)
    }
}

fn trace(out: &mut dyn Respond, text: impl FnOnce() -> String) -> periphlink_frame::Result<()> {
    if out.diagnostics_enabled() {
        out.diagnostic(&text())?;
    }
    Ok(())
}
