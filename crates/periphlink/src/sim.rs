//! Simulated hardware behind `serve` and `describe`.

use std::collections::BTreeMap;

use clap::ValueEnum;
use periphlink_peripherals::i2c::MAX_BUSES;
use periphlink_peripherals::{
    BusError, I2cBus, I2cLibrary, ServoDriver, ServoLibrary, SpiBus, SpiLibrary, MAX_SERVOS,
};
use periphlink_registry::{LibraryRegistry, RegistryError};
use periphlink_router::{Board, CommandRouter, DeviceConfig, HIGH, INPUT_PULLUP, LOW};
use tracing::debug;

/// Pin count of an Uno-class board: 14 digital, 6 analog.
pub const DEFAULT_TOTAL_PINS: u8 = 20;
pub const DEFAULT_FREE_MEMORY: u16 = 1536;
/// Largest 10-bit ADC reading.
const ADC_MAX: u16 = 0x3ff;

/// Address of the register-file device attached to bus 0 by default.
pub const DEFAULT_I2C_DEVICE: u8 = 0x68;

/// Peripheral libraries the simulator can register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LibraryKind {
    I2c,
    Servo,
    Spi,
}

/// Build a router over simulated hardware with `libraries` registered in
/// slot order.
pub fn simulated_router(
    config: DeviceConfig,
    libraries: &[LibraryKind],
) -> Result<CommandRouter<SimBoard>, RegistryError> {
    let mut registry = LibraryRegistry::new();
    for kind in libraries {
        match kind {
            LibraryKind::I2c => registry.register(Box::new(I2cLibrary::new(
                SimI2c::new().with_device(0, DEFAULT_I2C_DEVICE),
            )))?,
            LibraryKind::Servo => {
                registry.register(Box::new(ServoLibrary::new(SimServos::new())))?
            }
            LibraryKind::Spi => registry.register(Box::new(SpiLibrary::new(SimSpi::new())))?,
        };
    }
    Ok(CommandRouter::new(SimBoard::new(), registry, config))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PinState {
    level: u8,
    duty: u16,
}

/// In-memory board that remembers what was written to each pin.
///
/// Analog reads report the pin's duty cycle, or full scale when the pin is
/// driven high.
#[derive(Debug)]
pub struct SimBoard {
    pins: Vec<PinState>,
    free_memory: u16,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBoard {
    pub fn new() -> Self {
        Self::with_pins(DEFAULT_TOTAL_PINS)
    }

    pub fn with_pins(total: u8) -> Self {
        Self {
            pins: vec![PinState::default(); usize::from(total)],
            free_memory: DEFAULT_FREE_MEMORY,
        }
    }

    fn pin(&mut self, pin: u8) -> Option<&mut PinState> {
        let state = self.pins.get_mut(usize::from(pin));
        if state.is_none() {
            debug!(pin, "simulated board has no such pin");
        }
        state
    }
}

impl Board for SimBoard {
    fn pin_mode(&mut self, pin: u8, mode: u8) {
        if let Some(state) = self.pin(pin) {
            if mode == INPUT_PULLUP {
                state.level = HIGH;
            }
            debug!(pin, mode, "sim pin mode");
        }
    }

    fn digital_write(&mut self, pin: u8, value: u8) {
        if let Some(state) = self.pin(pin) {
            state.level = if value == LOW { LOW } else { HIGH };
            state.duty = 0;
            debug!(pin, level = state.level, "sim digital write");
        }
    }

    fn digital_read(&mut self, pin: u8) -> u8 {
        self.pin(pin).map_or(LOW, |state| state.level)
    }

    fn analog_write(&mut self, pin: u8, value: u16) {
        if let Some(state) = self.pin(pin) {
            state.duty = value;
            state.level = if value == 0 { LOW } else { HIGH };
            debug!(pin, value, "sim analog write");
        }
    }

    fn analog_read(&mut self, pin: u8) -> u16 {
        match self.pin(pin) {
            Some(state) if state.duty > 0 => state.duty.min(ADC_MAX),
            Some(state) if state.level == HIGH => ADC_MAX,
            _ => 0,
        }
    }

    fn tone(&mut self, pin: u8, frequency: u16, duration_ms: u32) {
        if self.pin(pin).is_some() {
            debug!(pin, frequency, duration_ms, "sim tone");
        }
    }

    fn no_tone(&mut self, pin: u8) {
        if self.pin(pin).is_some() {
            debug!(pin, "sim tone off");
        }
    }

    fn free_memory(&self) -> u16 {
        self.free_memory
    }

    fn total_pins(&self) -> u8 {
        u8::try_from(self.pins.len()).unwrap_or(u8::MAX)
    }
}

/// A device that answers like a 256-byte register file.
///
/// The first byte of a write selects the register; remaining bytes are
/// stored from there on. Reads continue from the selected register.
#[derive(Debug)]
struct RegisterFile {
    registers: [u8; 256],
    cursor: u8,
}

impl RegisterFile {
    fn new() -> Self {
        Self {
            registers: [0; 256],
            cursor: 0,
        }
    }
}

/// Simulated I2C buses.
#[derive(Debug, Default)]
pub struct SimI2c {
    devices: BTreeMap<(u8, u8), RegisterFile>,
}

impl SimI2c {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a register-file device at `address` on `bus`.
    pub fn with_device(mut self, bus: u8, address: u8) -> Self {
        self.devices.insert((bus, address), RegisterFile::new());
        self
    }

    fn device(&mut self, bus: u8, address: u8) -> Result<&mut RegisterFile, BusError> {
        self.devices
            .get_mut(&(bus, address))
            .ok_or(BusError::Nack { address })
    }
}

impl I2cBus for SimI2c {
    fn begin(&mut self, bus: u8) -> Result<(), BusError> {
        if usize::from(bus) >= MAX_BUSES {
            return Err(BusError::UnsupportedBus(bus));
        }
        debug!(bus, "sim i2c begin");
        Ok(())
    }

    fn probe(&mut self, bus: u8, address: u8) -> bool {
        self.devices.contains_key(&(bus, address))
    }

    fn read(&mut self, bus: u8, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let device = self.device(bus, address)?;
        for byte in buf.iter_mut() {
            *byte = device.registers[usize::from(device.cursor)];
            device.cursor = device.cursor.wrapping_add(1);
        }
        Ok(())
    }

    fn write(&mut self, bus: u8, address: u8, data: &[u8]) -> Result<(), BusError> {
        let device = self.device(bus, address)?;
        if let Some((&register, values)) = data.split_first() {
            device.cursor = register;
            for &value in values {
                device.registers[usize::from(device.cursor)] = value;
                device.cursor = device.cursor.wrapping_add(1);
            }
        }
        Ok(())
    }
}

/// Simulated servo outputs.
#[derive(Debug, Default)]
pub struct SimServos {
    angles: [u8; MAX_SERVOS],
    pins: [Option<u8>; MAX_SERVOS],
}

impl SimServos {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServoDriver for SimServos {
    fn attach(&mut self, servo: u8, pin: u8, min_pulse_us: u16, max_pulse_us: u16) {
        if let Some(slot) = self.pins.get_mut(usize::from(servo)) {
            *slot = Some(pin);
            debug!(servo, pin, min_pulse_us, max_pulse_us, "sim servo attach");
        }
    }

    fn detach(&mut self, servo: u8) {
        if let Some(slot) = self.pins.get_mut(usize::from(servo)) {
            *slot = None;
        }
    }

    fn read(&mut self, servo: u8) -> u8 {
        let slot = usize::from(servo);
        match self.pins.get(slot) {
            Some(Some(_)) => self.angles[slot],
            _ => 0,
        }
    }

    fn write(&mut self, servo: u8, angle: u8) {
        if let Some(slot) = self.angles.get_mut(usize::from(servo)) {
            *slot = angle.min(180);
        }
    }
}

/// Simulated SPI controller with MISO looped back to MOSI.
///
/// Transfers echo the sent byte while a chip select is asserted and read
/// 0xFF otherwise, like a floating line.
#[derive(Debug, Default)]
pub struct SimSpi {
    selected: Option<u8>,
}

impl SimSpi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpiBus for SimSpi {
    fn begin(&mut self, cs_pin: u8) {
        debug!(cs_pin, "sim spi begin");
    }

    fn end(&mut self, cs_pin: u8) {
        if self.selected == Some(cs_pin) {
            self.selected = None;
        }
        debug!(cs_pin, "sim spi end");
    }

    fn set_clock_divider(&mut self, divider: u8) {
        debug!(divider, "sim spi clock divider");
    }

    fn set_data_mode(&mut self, mode: u8) {
        debug!(mode, "sim spi data mode");
    }

    fn set_bit_order(&mut self, order: u8) {
        debug!(order, "sim spi bit order");
    }

    fn select(&mut self, cs_pin: u8) {
        self.selected = Some(cs_pin);
    }

    fn deselect(&mut self, _cs_pin: u8) {
        self.selected = None;
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        match self.selected {
            Some(_) => byte,
            None => 0xff,
        }
    }
}

#[cfg(test)]
mod tests {
    use periphlink_router::OUTPUT;

    use super::*;

    #[test]
    fn board_tracks_pin_levels() {
        let mut board = SimBoard::new();

        board.pin_mode(13, OUTPUT);
        board.digital_write(13, HIGH);
        assert_eq!(board.digital_read(13), HIGH);
        assert_eq!(board.analog_read(13), ADC_MAX);

        board.analog_write(9, 300);
        assert_eq!(board.analog_read(9), 300);

        board.pin_mode(4, INPUT_PULLUP);
        assert_eq!(board.digital_read(4), HIGH);

        assert_eq!(board.digital_read(200), LOW);
        assert_eq!(board.total_pins(), DEFAULT_TOTAL_PINS);
    }

    #[test]
    fn register_file_reads_back_writes() {
        let mut bus = SimI2c::new().with_device(0, 0x68);

        bus.write(0, 0x68, &[0x10, 0xaa, 0xbb]).unwrap();
        let mut buf = [0u8; 2];
        bus.read_register(0, 0x68, 0x10, &mut buf).unwrap();

        assert_eq!(buf, [0xaa, 0xbb]);
        assert!(bus.probe(0, 0x68));
        assert!(!bus.probe(1, 0x68));
        assert_eq!(bus.write(0, 0x50, &[0]), Err(BusError::Nack { address: 0x50 }));
        assert_eq!(bus.begin(2), Err(BusError::UnsupportedBus(2)));
    }

    #[test]
    fn spi_loops_back_only_while_selected() {
        let mut bus = SimSpi::new();

        assert_eq!(bus.transfer(0x42), 0xff);
        bus.select(10);
        assert_eq!(bus.transfer(0x42), 0x42);
        bus.deselect(10);
        assert_eq!(bus.transfer(0x42), 0xff);
    }

    #[test]
    fn router_registers_libraries_in_order() {
        let router = simulated_router(
            DeviceConfig::default(),
            &[LibraryKind::Servo, LibraryKind::Spi, LibraryKind::I2c],
        )
        .unwrap();

        let names: Vec<_> = router.registry().names().collect();
        assert_eq!(names, vec![(0, "Servo"), (1, "SPI"), (2, "I2C")]);
    }
}
