//! Drive a command router over an in-memory transport.
//!
//! Run with: `cargo run -p periphlink --example loopback`

use std::sync::atomic::AtomicBool;

use bytes::BytesMut;
use periphlink::frame::{decode_outbound, encode_sysex, InboundFrame, OutboundFrame};
use periphlink::peripherals::{ServoDriver, ServoLibrary};
use periphlink::registry::LibraryRegistry;
use periphlink::router::{Board, CommandRouter, DeviceConfig, Dispatcher};
use periphlink::transport::MemoryTransport;

#[derive(Default)]
struct LedBoard {
    led: u8,
}

impl Board for LedBoard {
    fn pin_mode(&mut self, _pin: u8, _mode: u8) {}

    fn digital_write(&mut self, pin: u8, value: u8) {
        if pin == 13 {
            self.led = value;
        }
    }

    fn digital_read(&mut self, pin: u8) -> u8 {
        if pin == 13 {
            self.led
        } else {
            0
        }
    }

    fn analog_write(&mut self, _pin: u8, _value: u16) {}

    fn analog_read(&mut self, _pin: u8) -> u16 {
        512
    }

    fn tone(&mut self, _pin: u8, _frequency: u16, _duration_ms: u32) {}

    fn no_tone(&mut self, _pin: u8) {}

    fn free_memory(&self) -> u16 {
        2048
    }

    fn total_pins(&self) -> u8 {
        20
    }
}

#[derive(Default)]
struct PrintServos;

impl ServoDriver for PrintServos {
    fn attach(&mut self, servo: u8, pin: u8, min_pulse_us: u16, max_pulse_us: u16) {
        println!("servo {servo} on pin {pin} ({min_pulse_us}..{max_pulse_us} us)");
    }

    fn detach(&mut self, servo: u8) {
        println!("servo {servo} detached");
    }

    fn read(&mut self, _servo: u8) -> u8 {
        90
    }

    fn write(&mut self, servo: u8, angle: u8) {
        println!("servo {servo} -> {angle} deg");
    }
}

fn send(transport: &mut MemoryTransport, frame: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let mut wire = BytesMut::new();
    encode_sysex(&InboundFrame::new(frame.to_vec())?, &mut wire);
    transport.push_inbound(&wire);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = LibraryRegistry::new();
    let servo_id = registry.register(Box::new(ServoLibrary::new(PrintServos)))?;

    let router = CommandRouter::new(LedBoard::default(), registry, DeviceConfig::default());
    let mut dispatcher = Dispatcher::new(MemoryTransport::new(), router);

    // one frame at a time: a reply drains whatever input is still queued
    let requests: [&[u8]; 3] = [
        &[0x01, 0x00, 0x00, 0x00, 0x01],
        &[0x02, 0x00, 0x02, 0x00, 0x10, 13, 1],
        // create servo 0 on pin 9, 544..2400 us
        &[0x03, 0x00, 0x09, 0x01, servo_id, 0, 0x00, 9, 0x20, 0x04, 0x00, 0x60, 0x12, 0x00],
    ];

    for request in requests {
        send(dispatcher.transport_mut(), request)?;
        dispatcher.poll()?;
    }
    dispatcher.transport_mut().close();
    let stats = dispatcher.run(&AtomicBool::new(false))?;

    let mut out = BytesMut::from(dispatcher.transport().written());
    while let Some(frame) = decode_outbound(&mut out)? {
        match frame {
            OutboundFrame::Reply {
                command_id,
                payload,
            } => println!("reply 0x{command_id:02x}: {payload:02x?}"),
            OutboundFrame::Diagnostic { text } => {
                print!("trace: {}", String::from_utf8_lossy(&text))
            }
        }
    }
    println!("{stats:?}");
    Ok(())
}
