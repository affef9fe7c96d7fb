use periphlink_frame::{Field, FrameLayout, InboundFrame, Respond};
use periphlink_registry::{Handled, LibraryHandler};
use tracing::{debug, warn};

use crate::error::Result;

/// Name reported in the device description.
pub const I2C_LIBRARY_NAME: &str = "I2C";

/// Number of buses a library instance tracks.
pub const MAX_BUSES: usize = 2;

/// First and one-past-last 7-bit addresses probed by a scan.
pub const SCAN_START: u8 = 0x08;
pub const SCAN_END: u8 = 0x78;

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_FAILED: u8 = 0xFF;

pub const START: u8 = 0x00;
pub const SCAN: u8 = 0x01;
pub const READ: u8 = 0x02;
pub const WRITE: u8 = 0x03;
pub const READ_REGISTER: u8 = 0x04;
pub const WRITE_REGISTER: u8 = 0x05;

const COMMAND: Field = Field::byte("command", 5);
const BUS: Field = Field::byte("bus", 6);
const ADDRESS: Field = Field::byte("address", 7);
const COUNT: Field = Field::packed_u8("count", 8);
const DATA: Field = Field::packed_bytes("data", 10);
const REGISTER: Field = Field::packed_u8("register", 8);
const REGISTER_COUNT: Field = Field::byte("count", 10);
const REGISTER_DATA: Field = Field::packed_bytes("data", 11);

const COMMAND_ONLY: FrameLayout = FrameLayout::new("i2c", &[COMMAND]);
const START_LAYOUT: FrameLayout = FrameLayout::new("i2c-start", &[COMMAND, BUS, ADDRESS]);
const SCAN_LAYOUT: FrameLayout = FrameLayout::new("i2c-scan", &[COMMAND, BUS]);
const READ_LAYOUT: FrameLayout = FrameLayout::new("i2c-read", &[COMMAND, BUS, ADDRESS, COUNT]);
const WRITE_LAYOUT: FrameLayout =
    FrameLayout::new("i2c-write", &[COMMAND, BUS, ADDRESS, COUNT, DATA]);
const READ_REGISTER_LAYOUT: FrameLayout = FrameLayout::new(
    "i2c-read-register",
    &[COMMAND, BUS, ADDRESS, REGISTER, REGISTER_COUNT],
);
const WRITE_REGISTER_LAYOUT: FrameLayout = FrameLayout::new(
    "i2c-write-register",
    &[COMMAND, BUS, ADDRESS, REGISTER, REGISTER_COUNT, REGISTER_DATA],
);

/// Access to one or more I2C buses.
pub trait I2cBus: Send {
    /// Bring `bus` up as a controller.
    fn begin(&mut self, bus: u8) -> Result<()>;

    /// Whether a device acknowledges `address`.
    fn probe(&mut self, bus: u8, address: u8) -> bool;

    /// Fill `buf` from the device at `address`.
    fn read(&mut self, bus: u8, address: u8, buf: &mut [u8]) -> Result<()>;

    /// Send `data` to the device at `address`.
    fn write(&mut self, bus: u8, address: u8, data: &[u8]) -> Result<()>;

    /// Select `register`, then fill `buf` without releasing the bus.
    fn read_register(&mut self, bus: u8, address: u8, register: u8, buf: &mut [u8]) -> Result<()> {
        self.write(bus, address, &[register])?;
        self.read(bus, address, buf)
    }
}

/// I2C controller library.
#[derive(Debug)]
pub struct I2cLibrary<I> {
    bus: I,
    begun: [bool; MAX_BUSES],
}

impl<I: I2cBus> I2cLibrary<I> {
    pub fn new(bus: I) -> Self {
        Self {
            bus,
            begun: [false; MAX_BUSES],
        }
    }

    pub fn bus(&self) -> &I {
        &self.bus
    }

    /// Whether `bus` has been started.
    pub fn is_begun(&self, bus: u8) -> bool {
        self.begun.get(usize::from(bus)).copied().unwrap_or(false)
    }

    fn ensure_begun(&mut self, bus: u8, out: &mut dyn Respond) -> periphlink_frame::Result<bool> {
        let Some(begun) = self.begun.get(usize::from(bus)).copied() else {
            warn!(bus, "i2c bus index out of range");
            return Ok(false);
        };
        if begun {
            return Ok(true);
        }

        trace(out, || format!("Arduino::{}.begin();\n", wire_name(bus)))?;
        match self.bus.begin(bus) {
            Ok(()) => {
                self.begun[usize::from(bus)] = true;
                Ok(true)
            }
            Err(err) => {
                warn!(bus, error = %err, "i2c bus failed to start");
                Ok(false)
            }
        }
    }

    fn scan(&mut self, bus: u8, out: &mut dyn Respond) -> periphlink_frame::Result<Vec<u8>> {
        if !self.ensure_begun(bus, out)? {
            return Ok(Vec::new());
        }
        Ok((SCAN_START..SCAN_END)
            .filter(|&address| self.bus.probe(bus, address))
            .collect())
    }

    /// `[status, data...]` with `count` data bytes, zeroed on failure.
    fn read_reply(
        &mut self,
        bus: u8,
        address: u8,
        register: Option<u8>,
        count: usize,
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<Vec<u8>> {
        let mut payload = vec![STATUS_OK; count + 1];
        let result = match register {
            Some(register) => self
                .bus
                .read_register(bus, address, register, &mut payload[1..]),
            None => self.bus.read(bus, address, &mut payload[1..]),
        };
        trace(out, || {
            format!(
                "Arduino::{}.requestFrom({address}, {count}, 1); --> {}\n",
                wire_name(bus),
                if result.is_ok() { count } else { 0 }
            )
        })?;

        if let Err(err) = result {
            debug!(bus, address, error = %err, "i2c read failed");
            payload.fill(0);
            payload[0] = STATUS_FAILED;
        }
        Ok(payload)
    }

    fn write_data(
        &mut self,
        bus: u8,
        address: u8,
        data: &[u8],
        out: &mut dyn Respond,
    ) -> periphlink_frame::Result<()> {
        trace(out, || {
            format!(
                "Arduino::{}.write({data:?}, {}); --> {}\n",
                wire_name(bus),
                data.len(),
                data.len()
            )
        })?;
        if let Err(err) = self.bus.write(bus, address, data) {
            debug!(bus, address, error = %err, "i2c write failed");
        }
        Ok(())
    }
}

impl<I: I2cBus> LibraryHandler for I2cLibrary<I> {
    fn name(&self) -> &str {
        I2C_LIBRARY_NAME
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
                START_LAYOUT.require(frame)?;
                let bus = BUS.read_u8(frame)?;
                self.ensure_begun(bus, out)?;
                out.reply(START, &[])?;
            }
            SCAN => {
                SCAN_LAYOUT.require(frame)?;
                let bus = BUS.read_u8(frame)?;
                let found = self.scan(bus, out)?;
                out.reply(SCAN, &found)?;
            }
            READ => {
                READ_LAYOUT.require(frame)?;
                let (bus, address) = (BUS.read_u8(frame)?, ADDRESS.read_u8(frame)?);
                let count = usize::from(COUNT.read_u8(frame)?);
                let payload = self.read_reply(bus, address, None, count, out)?;
                out.reply(READ, &payload)?;
            }
            WRITE => {
                WRITE_LAYOUT.require(frame)?;
                let (bus, address) = (BUS.read_u8(frame)?, ADDRESS.read_u8(frame)?);
                let count = usize::from(COUNT.read_u8(frame)?);
                let data = DATA.read_bytes(frame, count)?;
                self.write_data(bus, address, &data, out)?;
                out.reply(WRITE, &[])?;
            }
            READ_REGISTER => {
                READ_REGISTER_LAYOUT.require(frame)?;
                let (bus, address) = (BUS.read_u8(frame)?, ADDRESS.read_u8(frame)?);
                let register = REGISTER.read_u8(frame)?;
                let count = usize::from(REGISTER_COUNT.read_u8(frame)?);
                let payload = self.read_reply(bus, address, Some(register), count, out)?;
                out.reply(READ_REGISTER, &payload)?;
            }
            WRITE_REGISTER => {
                WRITE_REGISTER_LAYOUT.require(frame)?;
                let (bus, address) = (BUS.read_u8(frame)?, ADDRESS.read_u8(frame)?);
                let register = REGISTER.read_u8(frame)?;
                let count = usize::from(REGISTER_COUNT.read_u8(frame)?);
                let mut data = Vec::with_capacity(count + 1);
                data.push(register);
                data.extend(REGISTER_DATA.read_bytes(frame, count)?);
                self.write_data(bus, address, &data, out)?;
                out.reply(WRITE_REGISTER, &[])?;
            }
            other => {
                debug!(command = other, "unrecognized i2c command");
                return Ok(Handled::Ignored);
            }
        }

        Ok(Handled::Replied)
    }
}

fn wire_name(bus: u8) -> &'static str {
    if bus == 0 {
        "Wire"
    } else {
        "Wire1"
    }
}

fn trace(out: &mut dyn Respond, text: impl FnOnce() -> String) -> periphlink_frame::Result<()> {
    if out.diagnostics_enabled() {
        out.diagnostic(&text())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use periphlink_frame::{FrameError, ResponseWriter, WriterConfig};
    use periphlink_transport::MemoryTransport;

    use super::*;
    use crate::error::BusError;

    /// Devices keyed by address; each holds a register file.
    #[derive(Debug, Default)]
    struct FakeBus {
        started: Vec<u8>,
        devices: HashMap<u8, Vec<u8>>,
        writes: Vec<(u8, u8, Vec<u8>)>,
        pointer: HashMap<u8, usize>,
    }

    impl I2cBus for FakeBus {
        fn begin(&mut self, bus: u8) -> Result<()> {
            if bus > 0 {
                return Err(BusError::UnsupportedBus(bus));
            }
            self.started.push(bus);
            Ok(())
        }

        fn probe(&mut self, _bus: u8, address: u8) -> bool {
            self.devices.contains_key(&address)
        }

        fn read(&mut self, _bus: u8, address: u8, buf: &mut [u8]) -> Result<()> {
            let registers = self
                .devices
                .get(&address)
                .ok_or(BusError::Nack { address })?;
            let start = self.pointer.get(&address).copied().unwrap_or(0);
            let available = registers.len().saturating_sub(start);
            if available < buf.len() {
                return Err(BusError::ShortRead {
                    expected: buf.len(),
                    got: available,
                });
            }
            buf.copy_from_slice(&registers[start..start + buf.len()]);
            Ok(())
        }

        fn write(&mut self, bus: u8, address: u8, data: &[u8]) -> Result<()> {
            if !self.devices.contains_key(&address) {
                return Err(BusError::Nack { address });
            }
            if let Some(&register) = data.first() {
                self.pointer.insert(address, usize::from(register));
            }
            self.writes.push((bus, address, data.to_vec()));
            Ok(())
        }
    }

    fn library() -> I2cLibrary<FakeBus> {
        let mut bus = FakeBus::default();
        bus.devices.insert(0x48, vec![0x10, 0x20, 0x30, 0x40]);
        bus.devices.insert(0x68, vec![0xaa; 8]);
        I2cLibrary::new(bus)
    }

    fn frame(body: &[u8]) -> InboundFrame {
        let mut bytes = vec![0x09, 0x00, body.len() as u8, 0x01, 0x00];
        bytes.extend_from_slice(body);
        InboundFrame::new(bytes).unwrap()
    }

    fn handle(library: &mut I2cLibrary<FakeBus>, body: &[u8]) -> (Handled, Vec<u8>) {
        let mut writer = ResponseWriter::new(MemoryTransport::new());
        let handled = library.handle(&frame(body), &mut writer).unwrap();
        (handled, writer.into_inner().written().to_vec())
    }

    #[test]
    fn start_begins_bus_once() {
        let mut library = library();

        let (handled, written) = handle(&mut library, &[START, 0, 0x48]);
        handle(&mut library, &[START, 0, 0x48]);

        assert_eq!(handled, Handled::Replied);
        assert_eq!(written, vec![0x00, 0x00, START, 0x00, 0x00]);
        assert_eq!(library.bus().started, vec![0]);
        assert!(library.is_begun(0));
    }

    #[test]
    fn scan_lists_acknowledging_addresses() {
        let mut library = library();

        let (_, written) = handle(&mut library, &[SCAN, 0]);

        assert_eq!(written, vec![0x00, 0x00, SCAN, 0x00, 0x02, 0x48, 0x68]);
        assert!(library.is_begun(0));
    }

    #[test]
    fn scan_of_unavailable_bus_is_empty() {
        let mut library = library();

        let (_, written) = handle(&mut library, &[SCAN, 1]);
        let (_, out_of_range) = handle(&mut library, &[SCAN, 7]);

        assert_eq!(written, vec![0x00, 0x00, SCAN, 0x00, 0x00]);
        assert_eq!(out_of_range, written);
    }

    #[test]
    fn read_prefixes_status() {
        let mut library = library();

        // count 2, packed
        let (_, written) = handle(&mut library, &[READ, 0, 0x48, 0x02, 0x00]);

        assert_eq!(written, vec![0x00, 0x00, READ, 0x00, 0x03, STATUS_OK, 0x10, 0x20]);
    }

    #[test]
    fn failed_read_reports_status_and_zeroes() {
        let mut library = library();

        let (_, written) = handle(&mut library, &[READ, 0, 0x50, 0x03, 0x00]);

        assert_eq!(
            written,
            vec![0x00, 0x00, READ, 0x00, 0x04, STATUS_FAILED, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn write_unpacks_data() {
        let mut library = library();

        // count 2, data [0x34, 0x12] packed as [0x34, 0x24, 0x00]
        let (_, written) = handle(&mut library, &[WRITE, 0, 0x68, 0x02, 0x00, 0x34, 0x24, 0x00]);

        assert_eq!(written, vec![0x00, 0x00, WRITE, 0x00, 0x00]);
        assert_eq!(library.bus().writes, vec![(0, 0x68, vec![0x34, 0x12])]);
    }

    #[test]
    fn register_read_and_write() {
        let mut library = library();

        // register 2, count 2
        let (_, read) = handle(&mut library, &[READ_REGISTER, 0, 0x48, 0x02, 0x00, 2]);
        assert_eq!(read, vec![0x00, 0x00, READ_REGISTER, 0x00, 0x03, STATUS_OK, 0x30, 0x40]);

        // register 1, count 1, data [0x7f]
        let (_, write) = handle(&mut library, &[WRITE_REGISTER, 0, 0x48, 0x01, 0x00, 1, 0x7f, 0x00]);
        assert_eq!(write, vec![0x00, 0x00, WRITE_REGISTER, 0x00, 0x00]);
        assert_eq!(library.bus().writes.last(), Some(&(0, 0x48, vec![0x01, 0x7f])));
    }

    #[test]
    fn unknown_command_is_ignored() {
        let mut library = library();

        let (handled, written) = handle(&mut library, &[0x42]);

        assert_eq!(handled, Handled::Ignored);
        assert!(written.is_empty());
    }

    #[test]
    fn missing_data_is_a_frame_error() {
        let mut library = library();
        let mut writer = ResponseWriter::new(MemoryTransport::new());

        // count 3 announced, one packed byte sent
        let err = library
            .handle(&frame(&[WRITE, 0, 0x68, 0x03, 0x00, 0x01]), &mut writer)
            .unwrap_err();

        assert!(matches!(err, FrameError::ShortFrame { .. }));
        assert!(library.bus().writes.is_empty());
        assert!(writer.get_ref().written().is_empty());
    }

    #[test]
    fn begin_is_traced_when_diagnostics_are_on() {
        let mut library = library();
        let config = WriterConfig {
            diagnostics_enabled: true,
        };
        let mut writer = ResponseWriter::with_config(MemoryTransport::new(), config);

        library.handle(&frame(&[START, 0, 0x48]), &mut writer).unwrap();

        let written = writer.into_inner().written().to_vec();
        let trace = b"Arduino::Wire.begin();\n";
        assert_eq!(&written[3..3 + trace.len()], trace);
    }
}
