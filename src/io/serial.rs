//! Serial port line source for the sensor bridge
//!
//! Protocol:
//! - Baud: 115200 by default, 8N1, no flow control
//! - Newline-terminated ASCII lines
//! - Blocks of comma-separated readings framed by per-sensor sentinels

use crate::infra::config::Config;
use crate::io::line_source::StreamLineReader;
use anyhow::Context;
use tokio::io::BufReader;
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};
use tracing::info;

/// Line reader that exclusively owns the serial port. Dropping it closes the port.
pub type SerialLineReader = StreamLineReader<BufReader<SerialStream>>;

/// Open the configured serial device.
///
/// A failure here is fatal for the monitor; it is not retried.
pub fn open_serial(config: &Config) -> anyhow::Result<SerialLineReader> {
    let device = config.serial_device();
    let baud = config.serial_baud();
    let line_timeout = config.line_timeout();

    let port = tokio_serial::new(device, baud)
        .timeout(line_timeout)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .with_context(|| format!("Could not open serial port {} at {} baud", device, baud))?;

    info!(
        device = %device,
        baud = %baud,
        line_timeout_ms = %line_timeout.as_millis(),
        "serial_port_opened"
    );

    Ok(StreamLineReader::new(device, BufReader::new(port), Some(line_timeout)))
}

/// One line per available port, with USB identity where known
pub fn list_ports() -> anyhow::Result<Vec<String>> {
    let ports = tokio_serial::available_ports().context("Failed to enumerate serial ports")?;
    Ok(ports.into_iter().map(|port| describe_port(&port.port_name, &port.port_type)).collect())
}

fn describe_port(name: &str, port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("unknown product");
            format!("{} - USB {:04x}:{:04x} {}", name, usb.vid, usb.pid, product)
        }
        SerialPortType::BluetoothPort => format!("{} - Bluetooth", name),
        SerialPortType::PciPort => format!("{} - PCI", name),
        SerialPortType::Unknown => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_port() {
        assert_eq!(describe_port("/dev/ttyS0", &SerialPortType::Unknown), "/dev/ttyS0");
        assert_eq!(describe_port("COM4", &SerialPortType::PciPort), "COM4 - PCI");
    }

    #[test]
    fn test_open_missing_device_fails() {
        let config = Config::default().with_serial_device("/dev/does-not-exist-spectra");
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let err = runtime.block_on(async { open_serial(&config).err() });
        let err = err.expect("opening a nonexistent device must fail");
        assert!(err.to_string().contains("/dev/does-not-exist-spectra"));
    }
}
