/// Formats a byte count for display: `512 B`, `1.50 KiB`, `2.00 MiB`, ...
///
/// Whole bytes are printed exactly; larger units get two decimals.
pub fn byte_string(byte_count: u64) -> String {
    const UNIT: f64 = 1024.0;

    if byte_count < 1024 {
        return format!("{byte_count} B");
    }

    let mut value = byte_count as f64 / UNIT;
    for suffix in ["KiB", "MiB"] {
        if value < UNIT {
            return format!("{value:.2} {suffix}");
        }
        value /= UNIT;
    }

    format!("{value:.2} GiB")
}
