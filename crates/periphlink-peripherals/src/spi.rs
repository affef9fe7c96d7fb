use periphlink_frame::{Field, FrameLayout, InboundFrame, Respond};
use periphlink_registry::{Handled, LibraryHandler};
use tracing::debug;

/// Name reported in the device description.
pub const SPI_LIBRARY_NAME: &str = "SPI";

/// Clock divider applied when a bus is started (system clock / 4).
pub const DEFAULT_CLOCK_DIVIDER: u8 = 4;

pub const START: u8 = 0x00;
pub const STOP: u8 = 0x01;
pub const SET_DATA_MODE: u8 = 0x02;
pub const SET_BIT_ORDER: u8 = 0x03;
pub const WRITE_READ: u8 = 0x04;

/// Data mode bytes as sent by the host.
pub const MODE0: u8 = 0x00;
pub const MODE1: u8 = 0x04;
pub const MODE2: u8 = 0x08;
pub const MODE3: u8 = 0x0C;

pub const LSB_FIRST: u8 = 0x00;
pub const MSB_FIRST: u8 = 0x01;

const COMMAND: Field = Field::byte("command", 5);
const CS_PIN: Field = Field::byte("cs_pin", 6);
const MODE: Field = Field::byte("mode", 7);
const ORDER: Field = Field::byte("order", 7);
const COUNT: Field = Field::packed_u8("count", 7);
const DATA: Field = Field::packed_bytes("data", 9);

const COMMAND_ONLY: FrameLayout = FrameLayout::new("spi", &[COMMAND]);
const PIN_LAYOUT: FrameLayout = FrameLayout::new("spi-pin", &[COMMAND, CS_PIN]);
const MODE_LAYOUT: FrameLayout = FrameLayout::new("spi-data-mode", &[COMMAND, CS_PIN, MODE]);
const ORDER_LAYOUT: FrameLayout = FrameLayout::new("spi-bit-order", &[COMMAND, CS_PIN, ORDER]);
const WRITE_READ_LAYOUT: FrameLayout =
    FrameLayout::new("spi-write-read", &[COMMAND, CS_PIN, COUNT, DATA]);

/// A single SPI controller with software chip select.
pub trait SpiBus: Send {
    /// Start the controller and make `cs_pin` an output.
    fn begin(&mut self, cs_pin: u8);

    fn end(&mut self, cs_pin: u8);

    fn set_clock_divider(&mut self, divider: u8);

    fn set_data_mode(&mut self, mode: u8);

    fn set_bit_order(&mut self, order: u8);

    /// Drive `cs_pin` low.
    fn select(&mut self, cs_pin: u8);

    /// Drive `cs_pin` high.
    fn deselect(&mut self, cs_pin: u8);

    /// Shift `byte` out and return the byte shifted in.
    fn transfer(&mut self, byte: u8) -> u8;
}

/// SPI controller library.
///
/// Holds no per-device state: every command names its chip select pin and
/// acts on the bus immediately.
#[derive(Debug)]
pub struct SpiLibrary<S> {
    bus: S,
}

impl<S: SpiBus> SpiLibrary<S> {
    pub fn new(bus: S) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &S {
        &self.bus
    }

    /// Full-duplex exchange framed by chip select.
    fn write_read(
        &mut self,
        cs_pin: u8,
        data: &[u8],
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Vec<u8>> {
        self.bus.select(cs_pin);
        trace(out, || format!("Arduino::digitalWrite({cs_pin}, LOW);\n"))?;

        let mut received = Vec::with_capacity(data.len());
        for &sent in data {
            let got = self.bus.transfer(sent);
            trace(out, || format!("Arduino::SPI.transfer({sent}); --> {got}\n"))?;
            received.push(got);
        }

        self.bus.deselect(cs_pin);
        trace(out, || format!("Arduino::digitalWrite({cs_pin}, HIGH);\n"))?;
        Ok(received)
    }
}

impl<S: SpiBus> LibraryHandler for SpiLibrary<S> {
    fn name(&self) -> &str {
        SPI_LIBRARY_NAME
    }

    fn handle(
        &mut self,
        frame: &InboundFrame,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Handled> {
        COMMAND_ONLY.require(frame)?;
        let command = COMMAND.read_u8(frame)?;

        match command {
            START => {
                PIN_LAYOUT.require(frame)?;
                let cs_pin = CS_PIN.read_u8(frame)?;
                self.bus.set_clock_divider(DEFAULT_CLOCK_DIVIDER);
                trace(out, || {
                    format!("Arduino::SPI.setClockDivider(SPI_CLOCK_DIV{DEFAULT_CLOCK_DIVIDER});\n")
                })?;
                self.bus.begin(cs_pin);
                trace(out, || format!("Arduino::pinMode({cs_pin}, OUTPUT);\n"))?;
                trace(out, || "Arduino::SPI.begin();\n".to_string())?;
                out.reply(START, &[])?;
            }
            STOP => {
                PIN_LAYOUT.require(frame)?;
                let cs_pin = CS_PIN.read_u8(frame)?;
                self.bus.end(cs_pin);
                trace(out, || "Arduino::SPI.end();\n".to_string())?;
                out.reply(STOP, &[])?;
            }
            SET_DATA_MODE => {
                MODE_LAYOUT.require(frame)?;
                let mode = MODE.read_u8(frame)?;
                self.bus.set_data_mode(mode);
                trace(out, || format!("Arduino::SPI.setDataMode({});\n", mode_name(mode)))?;
                out.reply(SET_DATA_MODE, &[])?;
            }
            SET_BIT_ORDER => {
                ORDER_LAYOUT.require(frame)?;
                let order = ORDER.read_u8(frame)?;
                self.bus.set_bit_order(order);
                trace(out, || format!("Arduino::SPI.setBitOrder({});\n", order_name(order)))?;
                out.reply(SET_BIT_ORDER, &[])?;
            }
            WRITE_READ => {
                WRITE_READ_LAYOUT.require(frame)?;
                let cs_pin = CS_PIN.read_u8(frame)?;
                let count = usize::from(COUNT.read_u8(frame)?);
                let data = DATA.read_bytes(frame, count)?;
                let received = self.write_read(cs_pin, &data, out)?;
                out.reply(WRITE_READ, &received)?;
            }
            other => {
                debug!(command = other, "unrecognized spi command");
                return Ok(Handled::Ignored);
            }
        }

        Ok(Handled::Replied)
    }
}

fn mode_name(mode: u8) -> String {
    match mode {
        MODE0 => "SPI_MODE0".to_string(),
        MODE1 => "SPI_MODE1".to_string(),
        MODE2 => "SPI_MODE2".to_string(),
        MODE3 => "SPI_MODE3".to_string(),
        other => other.to_string(),
    }
}

fn order_name(order: u8) -> String {
    match order {
        LSB_FIRST => "LSBFIRST".to_string(),
        MSB_FIRST => "MSBFIRST".to_string(),
        other => other.to_string(),
    }
}

fn trace(out: &mut dyn Respond, text: impl FnOnce() -> String) -> periphlink_frame::Result<()> {
    if out.diagnostics_enabled() {
        out.diagnostic(&text())?;
    }
    Ok(())
}
