use periphlink_frame::Respond;

/// Pin mode: input.
pub const INPUT: u8 = 0x00;
/// Pin mode: output.
pub const OUTPUT: u8 = 0x01;
/// Pin mode: input with internal pull-up.
pub const INPUT_PULLUP: u8 = 0x02;

/// Logic low.
pub const LOW: u8 = 0x00;
/// Logic high.
pub const HIGH: u8 = 0x01;

/// Hardware access used by the built-in command set.
///
/// Implementations talk to real pins; the router only forwards the values
/// it decoded and never validates pin numbers or ranges.
pub trait Board {
    fn pin_mode(&mut self, pin: u8, mode: u8);

    fn digital_write(&mut self, pin: u8, value: u8);

    fn digital_read(&mut self, pin: u8) -> u8;

    fn analog_write(&mut self, pin: u8, value: u16);

    /// Raw ADC reading (10 bits on most parts).
    fn analog_read(&mut self, pin: u8) -> u16;

    /// Start a square wave for `duration_ms`.
    fn tone(&mut self, pin: u8, frequency: u16, duration_ms: u32);

    fn no_tone(&mut self, pin: u8);

    /// Free RAM in bytes.
    fn free_memory(&self) -> u16;

    /// Number of pins, digital and analog.
    fn total_pins(&self) -> u8;

    /// Whether `pin` can be used as a digital pin.
    fn is_digital_pin(&self, pin: u8) -> bool {
        pin < self.total_pins()
    }
}

impl<B: Board + ?Sized> Board for &mut B {
    fn pin_mode(&mut self, pin: u8, mode: u8) {
        (**self).pin_mode(pin, mode)
    }

    fn digital_write(&mut self, pin: u8, value: u8) {
        (**self).digital_write(pin, value)
    }

    fn digital_read(&mut self, pin: u8) -> u8 {
        (**self).digital_read(pin)
    }

    fn analog_write(&mut self, pin: u8, value: u16) {
        (**self).analog_write(pin, value)
    }

    fn analog_read(&mut self, pin: u8) -> u16 {
        (**self).analog_read(pin)
    }

    fn tone(&mut self, pin: u8, frequency: u16, duration_ms: u32) {
        (**self).tone(pin, frequency, duration_ms)
    }

    fn no_tone(&mut self, pin: u8) {
        (**self).no_tone(pin)
    }

    fn free_memory(&self) -> u16 {
        (**self).free_memory()
    }

    fn total_pins(&self) -> u8 {
        (**self).total_pins()
    }

    fn is_digital_pin(&self, pin: u8) -> bool {
        (**self).is_digital_pin(pin)
    }
}

/// Board calls that also emit a diagnostic trace line per call.
pub(crate) struct Traced<'a, B: ?Sized> {
    pub board: &'a mut B,
    pub out: &'a mut dyn Respond,
}

impl<B: Board + ?Sized> Traced<'_, B> {
    fn trace(&mut self, text: impl FnOnce() -> String) -> periphlink_frame::Result<()> {
        if self.out.diagnostics_enabled() {
            self.out.diagnostic(&text())?;
        }
        Ok(())
    }

    pub fn pin_mode(&mut self, pin: u8, mode: u8) -> periphlink_frame::Result<()> {
        self.trace(|| format!("Arduino::pinMode({pin}, {});\n", mode_name(mode)))?;
        self.board.pin_mode(pin, mode);
        Ok(())
    }

    pub fn digital_write(&mut self, pin: u8, value: u8) -> periphlink_frame::Result<()> {
        self.trace(|| format!("Arduino::digitalWrite({pin}, {});\n", level_name(value)))?;
        self.board.digital_write(pin, value);
        Ok(())
    }

    pub fn digital_read(&mut self, pin: u8) -> periphlink_frame::Result<u8> {
        let value = self.board.digital_read(pin);
        self.trace(|| format!("Arduino::digitalRead({pin}); --> {}\n", level_name(value)))?;
        Ok(value)
    }

    pub fn analog_write(&mut self, pin: u8, value: u16) -> periphlink_frame::Result<()> {
        self.trace(|| format!("Arduino::analogWrite({pin}, {value});\n"))?;
        self.board.analog_write(pin, value);
        Ok(())
    }

    pub fn analog_read(&mut self, pin: u8) -> periphlink_frame::Result<u16> {
        let value = self.board.analog_read(pin);
        self.trace(|| format!("Arduino::analogRead({pin}) --> {value};\n"))?;
        Ok(value)
    }

    /// A zero frequency or duration silences the pin instead.
    pub fn play_tone(
        &mut self,
        pin: u8,
        frequency: u16,
        duration_ms: u32,
    ) -> periphlink_frame::Result<()> {
        if frequency == 0 || duration_ms == 0 {
            self.trace(|| format!("Arduino::noTone({pin});\n"))?;
            self.board.no_tone(pin);
        } else {
            self.trace(|| format!("Arduino::playTone({pin}, {frequency}, {duration_ms});\n"))?;
            self.board.tone(pin, frequency, duration_ms);
        }
        Ok(())
    }
}

fn mode_name(mode: u8) -> String {
    match mode {
        INPUT => "INPUT".to_string(),
        OUTPUT => "OUTPUT".to_string(),
        INPUT_PULLUP => "INPUT_PULLUP".to_string(),
        other => other.to_string(),
    }
}

fn level_name(value: u8) -> String {
    match value {
        HIGH => "HIGH".to_string(),
        LOW => "LOW".to_string(),
        other => other.to_string(),
    }
}
