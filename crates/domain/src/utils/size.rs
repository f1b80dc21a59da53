//! Human-readable file sizes

use crate::constants::SIZE_UNITS;

/// Format a byte count with base-1024 units (`B`, `KB`, `MB`, `GB`).
///
/// Byte counts below 1 KB are printed as integers. Larger values use two
/// decimal places; when the hundredths digit is zero but the tenths digit is
/// not, the trailing zero is dropped (`1536` -> `1.5 KB`, `1048576` ->
/// `1.00 MB`). Values beyond the GB range stay in GB.
pub fn format_file_size(bytes: u64) -> String {
    let mut unit = 0;
    while unit + 1 < SIZE_UNITS.len() && bytes >= 1024_u64.pow((unit + 1) as u32) {
        unit += 1;
    }

    if unit == 0 {
        return format!("{bytes} {}", SIZE_UNITS[0]);
    }

    let value = bytes as f64 / 1024_u64.pow(unit as u32) as f64;
    let mut digits = format!("{value:.2}");
    if digits.ends_with('0') && !digits.ends_with(".00") {
        digits.pop();
    }

    format!("{digits} {}", SIZE_UNITS[unit])
}
