//! Parsing of discovery tool output
//!
//! `devices` prints one `Device <address> <name...>` line per known device and
//! `info <address>` prints `Key: value` lines, one of which carries the RSSI.

use lazy_static::lazy_static;
use regex::Regex;

use crate::signal::Rssi;

lazy_static! {
    static ref HARDWARE_ADDRESS: Regex =
        Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").unwrap();
    /// Colour and cursor escapes emitted by interactive builds of the tool
    static ref ANSI_ESCAPE: Regex = Regex::new(r"\x1B\[[0-9;?]*[A-Za-z]").unwrap();
}

/// A device line that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLine {
    pub address: String,
    pub name: String,
}

/// Result of parsing a whole `devices` listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceListing {
    pub devices: Vec<DeviceLine>,
    /// Non-blank lines that were ignored
    pub skipped: usize,
}

/// Parse one listing line into address and name
///
/// Needs a marker, an address and at least one name word; the address must be
/// a colon separated 48-bit hardware address. The name is everything after the
/// address, inner spacing included.
pub fn parse_device_line(line: &str) -> Option<DeviceLine> {
    let line = ANSI_ESCAPE.replace_all(line, "");

    let (_marker, rest) = line.trim_start().split_once(char::is_whitespace)?;
    let (address, rest) = rest.trim_start().split_once(char::is_whitespace)?;
    let name = rest.trim().to_string();

    if name.is_empty() || !HARDWARE_ADDRESS.is_match(address) {
        return None;
    }

    Some(DeviceLine {
        address: address.to_ascii_uppercase(),
        name,
    })
}

/// Parse a full `devices` listing, counting the lines that were skipped
pub fn parse_device_listing(output: &str) -> DeviceListing {
    let mut listing = DeviceListing::default();

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        log::debug!("{}", line.trim());
        match parse_device_line(line) {
            Some(device) => listing.devices.push(device),
            None => {
                log::debug!("Skipping malformed device line: {:?}", line);
                listing.skipped += 1;
            }
        }
    }

    listing
}

/// Extract the signal reading from `info` output
pub fn parse_rssi(info_output: &str) -> Rssi {
    info_output
        .lines()
        .find(|line| line.contains("RSSI"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| Rssi::from_text(value))
        .unwrap_or(Rssi::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_device_line() {
        assert_eq!(
            parse_device_line("Device aa:bb:cc:dd:ee:ff JBL Flip 5"),
            Some(DeviceLine {
                address: "AA:BB:CC:DD:EE:FF".to_string(),
                name: "JBL Flip 5".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_device_line_keeps_name_spacing() {
        assert_eq!(
            parse_device_line("Device AA:BB:CC:DD:EE:FF My  Phone\t(2)  ").map(|d| d.name),
            Some("My  Phone\t(2)".to_string())
        );
        assert_eq!(
            parse_device_line("  Device   AA:BB:CC:DD:EE:FF   Car Kit").map(|d| d.name),
            Some("Car Kit".to_string())
        );
    }

    #[test]
    fn test_parse_device_line_rejects_short_lines() {
        assert_eq!(parse_device_line("Device"), None);
        assert_eq!(parse_device_line("Device AA:BB:CC:DD:EE:FF"), None);
        assert_eq!(parse_device_line(""), None);
    }

    #[test]
    fn test_parse_device_line_rejects_banners() {
        assert_eq!(parse_device_line("Waiting to connect to bluetoothd..."), None);
        assert_eq!(parse_device_line("Agent registered"), None);
    }

    #[test]
    fn test_parse_device_line_strips_colour_codes() {
        let line = "\x1B[0;92mDevice\x1B[0m 12:34:56:78:9A:BC Phone";
        assert_eq!(
            parse_device_line(line).map(|d| d.address),
            Some("12:34:56:78:9A:BC".to_string())
        );
    }

    #[test]
    fn test_parse_device_listing_counts_skipped() {
        let output = "Device 11:11:11:11:11:11 Keyboard\nbroken\n\nDevice 22:22:22:22:22:22 Mouse\n";
        let listing = parse_device_listing(output);

        assert_eq!(listing.devices.len(), 2);
        assert_eq!(listing.skipped, 1);
        assert_eq!(listing.devices[1].name, "Mouse");
    }

    #[test]
    fn test_parse_rssi() {
        let info = "Device 11:11:11:11:11:11 (random)\n\tName: Keyboard\n\tRSSI: -67\n\tTxPower: 4\n";
        assert_eq!(parse_rssi(info), Rssi::Dbm(-67));

        let newer = "\tName: Band\n\tRSSI: 0xffffffb5 (-75)\n";
        assert_eq!(parse_rssi(newer), Rssi::Dbm(-75));
    }

    #[test]
    fn test_parse_rssi_missing_or_garbled() {
        assert_eq!(parse_rssi("\tName: Keyboard\n\tPaired: yes\n"), Rssi::Unavailable);
        assert_eq!(parse_rssi("\tRSSI: unknown\n"), Rssi::Unavailable);
        assert_eq!(parse_rssi("\tRSSI without colon\n"), Rssi::Unavailable);
    }
}
