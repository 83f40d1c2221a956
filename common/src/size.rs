//! Human readable byte counts for reports and warnings

const UNIT: u64 = 1024;
const UNIT_SYMBOLS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// Format a byte count using binary (1024) multiples and a single decimal digit.
///
/// Values below 1024 are printed as plain bytes.
///
/// # Examples
///
/// ```
/// use common::size::format_bytes;
///
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(2 * 1024 * 1024 * 1024), "2.0 GB");
/// ```
pub fn format_bytes(size: u64) -> String {
    if size < UNIT {
        return format!("{size} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", size as f64 / div as f64, UNIT_SYMBOLS[exp])
}
