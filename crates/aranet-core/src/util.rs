//! Device identifier helpers.

use btleplug::platform::PeripheralId;

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they may be
/// MAC addresses or other formats. This function extracts the useful
/// identifier string.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    identifier_from(address, || format_peripheral_id(peripheral_id))
}

fn identifier_from(address: &str, peripheral_id: impl FnOnce() -> String) -> String {
    if address == "00:00:00:00:00:00" {
        peripheral_id()
    } else {
        address.to_string()
    }
}

/// Whether two device identifiers name the same device.
///
/// Addresses are compared case-insensitively, so `aa:bb:..` from a config
/// file matches `AA:BB:..` as reported by the adapter.
pub fn same_device(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_uses_valid_address() {
        let id = identifier_from("AA:BB:CC:DD:EE:FF", || "uuid".to_string());
        assert_eq!(id, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_identifier_falls_back_on_zero_address() {
        let id = identifier_from("00:00:00:00:00:00", || {
            "6F1C3E2A-0000-4000-8000-00805F9B34FB".to_string()
        });
        assert_eq!(id, "6F1C3E2A-0000-4000-8000-00805F9B34FB");
    }

    #[test]
    fn test_same_device_ignores_case() {
        assert!(same_device("aa:bb:cc:dd:ee:ff", "AA:BB:CC:DD:EE:FF"));
        assert!(same_device(" AA:BB:CC:DD:EE:FF\n", "aa:bb:cc:dd:ee:ff"));
        assert!(!same_device("AA:BB:CC:DD:EE:FF", "AA:BB:CC:DD:EE:00"));
    }
}
