//! Port discovery against a simulated host device list.

use serial_web_console::resolver::Resolution;
use serial_web_console::{MockPortRegistry, PortConfiguration, PortResolver};
use std::sync::Arc;

fn resolver(registry: &MockPortRegistry, preferred: &str, patterns: &[&str]) -> PortResolver {
    PortResolver::new(
        Arc::new(registry.clone()),
        preferred,
        patterns,
        PortConfiguration::default(),
    )
    .expect("patterns should compile")
}

#[test]
fn test_macos_style_renumbering() {
    let registry = MockPortRegistry::new();
    registry.attach("/dev/cu.Bluetooth-Incoming-Port");
    registry.attach("/dev/cu.usbmodem1101");

    let resolver = resolver(&registry, "/dev/cu.usbmodem101", &["usbmodem", "usbserial"]);
    assert_eq!(resolver.resolve().as_deref(), Some("/dev/cu.usbmodem1101"));
}

#[test]
fn test_windows_style_com_ports() {
    let registry = MockPortRegistry::new();
    registry.attach("COM1");
    registry.attach("COM12");
    registry.set_busy("COM1", true);

    let resolver = resolver(&registry, "COM3", &[r"^COM\d+$"]);
    assert_eq!(resolver.resolve().as_deref(), Some("COM12"));
}

#[test]
fn test_not_found_reports_candidates() {
    let registry = MockPortRegistry::new();
    registry.attach("/dev/ttyUSB0");
    registry.attach("/dev/ttyS0");
    registry.set_busy("/dev/ttyUSB0", true);

    let resolver = resolver(&registry, "/dev/ttyACM0", &["ttyUSB", "ttyACM"]);
    assert_eq!(
        resolver.try_resolve().unwrap(),
        Resolution::NotFound {
            candidates: vec!["/dev/ttyUSB0".to_string()]
        }
    );
}

#[test]
fn test_candidates_exclude_preferred() {
    let registry = MockPortRegistry::new();
    registry.attach("/dev/ttyACM0");
    registry.attach("/dev/ttyACM1");

    let resolver = resolver(&registry, "/dev/ttyACM0", &["ttyACM"]);
    assert_eq!(resolver.candidates().unwrap(), vec!["/dev/ttyACM1"]);
}
