//! Built-in device commands (selector `0x00`).

use periphlink_frame::{Field, FrameLayout};

pub const GET_SERVER_INFO: u8 = 0x01;
pub const RESET_PINS_STATE: u8 = 0x02;
pub const GET_AVAILABLE_RAM: u8 = 0x03;
pub const WRITE_DIGITAL_PIN: u8 = 0x10;
pub const READ_DIGITAL_PIN: u8 = 0x11;
pub const CONFIGURE_DIGITAL_PIN: u8 = 0x12;
pub const WRITE_PWM_VOLTAGE: u8 = 0x20;
pub const WRITE_PWM_DUTY_CYCLE: u8 = 0x21;
pub const PLAY_TONE: u8 = 0x22;
pub const READ_VOLTAGE: u8 = 0x30;

pub const PIN: Field = Field::byte("pin", 5);
pub const VALUE: Field = Field::byte("value", 6);
pub const MODE: Field = Field::byte("mode", 6);
pub const PWM_VALUE: Field = Field::packed_u16("value", 6);
pub const FREQUENCY: Field = Field::packed_u16("frequency", 6);
pub const DURATION: Field = Field::packed_u16("duration", 9);

pub const NO_PARAMS: FrameLayout = FrameLayout::new("no-params", &[]);
pub const PIN_ONLY: FrameLayout = FrameLayout::new("pin", &[PIN]);
pub const PIN_VALUE: FrameLayout = FrameLayout::new("pin-value", &[PIN, VALUE]);
pub const PIN_MODE: FrameLayout = FrameLayout::new("pin-mode", &[PIN, MODE]);
pub const PIN_PWM: FrameLayout = FrameLayout::new("pin-pwm", &[PIN, PWM_VALUE]);
pub const PIN_TONE: FrameLayout = FrameLayout::new("pin-tone", &[PIN, FREQUENCY, DURATION]);

/// The closed set of built-in device commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinCommand {
    GetServerInfo,
    ResetPinsState,
    GetAvailableRam,
    WriteDigitalPin,
    ReadDigitalPin,
    ConfigureDigitalPin,
    WritePwmVoltage,
    WritePwmDutyCycle,
    PlayTone,
    ReadVoltage,
}

impl BuiltinCommand {
    pub const ALL: [Self; 10] = [
        Self::GetServerInfo,
        Self::ResetPinsState,
        Self::GetAvailableRam,
        Self::WriteDigitalPin,
        Self::ReadDigitalPin,
        Self::ConfigureDigitalPin,
        Self::WritePwmVoltage,
        Self::WritePwmDutyCycle,
        Self::PlayTone,
        Self::ReadVoltage,
    ];

    /// Map a command id, or `None` if it is not a built-in.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            GET_SERVER_INFO => Some(Self::GetServerInfo),
            RESET_PINS_STATE => Some(Self::ResetPinsState),
            GET_AVAILABLE_RAM => Some(Self::GetAvailableRam),
            WRITE_DIGITAL_PIN => Some(Self::WriteDigitalPin),
            READ_DIGITAL_PIN => Some(Self::ReadDigitalPin),
            CONFIGURE_DIGITAL_PIN => Some(Self::ConfigureDigitalPin),
            WRITE_PWM_VOLTAGE => Some(Self::WritePwmVoltage),
            WRITE_PWM_DUTY_CYCLE => Some(Self::WritePwmDutyCycle),
            PLAY_TONE => Some(Self::PlayTone),
            READ_VOLTAGE => Some(Self::ReadVoltage),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::GetServerInfo => GET_SERVER_INFO,
            Self::ResetPinsState => RESET_PINS_STATE,
            Self::GetAvailableRam => GET_AVAILABLE_RAM,
            Self::WriteDigitalPin => WRITE_DIGITAL_PIN,
            Self::ReadDigitalPin => READ_DIGITAL_PIN,
            Self::ConfigureDigitalPin => CONFIGURE_DIGITAL_PIN,
            Self::WritePwmVoltage => WRITE_PWM_VOLTAGE,
            Self::WritePwmDutyCycle => WRITE_PWM_DUTY_CYCLE,
            Self::PlayTone => PLAY_TONE,
            Self::ReadVoltage => READ_VOLTAGE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::GetServerInfo => "get-server-info",
            Self::ResetPinsState => "reset-pins-state",
            Self::GetAvailableRam => "get-available-ram",
            Self::WriteDigitalPin => "write-digital-pin",
            Self::ReadDigitalPin => "read-digital-pin",
            Self::ConfigureDigitalPin => "configure-digital-pin",
            Self::WritePwmVoltage => "write-pwm-voltage",
            Self::WritePwmDutyCycle => "write-pwm-duty-cycle",
            Self::PlayTone => "play-tone",
            Self::ReadVoltage => "read-voltage",
        }
    }

    /// Parameter layout read by this command.
    pub fn layout(self) -> &'static FrameLayout {
        match self {
            Self::GetServerInfo | Self::ResetPinsState | Self::GetAvailableRam => &NO_PARAMS,
            Self::WriteDigitalPin => &PIN_VALUE,
            Self::ReadDigitalPin | Self::ReadVoltage => &PIN_ONLY,
            Self::ConfigureDigitalPin => &PIN_MODE,
            Self::WritePwmVoltage | Self::WritePwmDutyCycle => &PIN_PWM,
            Self::PlayTone => &PIN_TONE,
        }
    }
}

/// Human-readable name of a built-in command id.
pub fn command_name(id: u8) -> Option<&'static str> {
    BuiltinCommand::from_id(id).map(BuiltinCommand::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip() {
        for command in BuiltinCommand::ALL {
            assert_eq!(BuiltinCommand::from_id(command.id()), Some(command));
        }
        assert_eq!(BuiltinCommand::from_id(0x00), None);
        assert_eq!(BuiltinCommand::from_id(0x13), None);
    }

    #[test]
    fn layout_lengths() {
        assert_eq!(BuiltinCommand::GetAvailableRam.layout().min_len(), 5);
        assert_eq!(BuiltinCommand::WriteDigitalPin.layout().min_len(), 7);
        assert_eq!(BuiltinCommand::ReadVoltage.layout().min_len(), 6);
        assert_eq!(BuiltinCommand::WritePwmDutyCycle.layout().min_len(), 9);
        assert_eq!(BuiltinCommand::PlayTone.layout().min_len(), 12);
    }

    #[test]
    fn names() {
        assert_eq!(command_name(0x22), Some("play-tone"));
        assert_eq!(command_name(0x7f), None);
    }
}
