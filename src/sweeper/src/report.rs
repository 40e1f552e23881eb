//! Human-readable scan report.

use std::fmt::Write;

use crate::collector::ScanSummary;

/// Binary units above plain bytes, smallest first.
const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// Byte count for the report: whole bytes below 1 KiB, otherwise two
/// decimals in the largest binary unit that keeps the value at or above 1.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.2} {}", UNITS[unit])
}

/// Render the final summary block printed after a scan.
pub fn render(summary: &ScanSummary) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "--- Scan Complete ---");
    let _ = writeln!(out, "Total Objects Scanned:   {}", summary.total_objects);
    let _ = writeln!(
        out,
        "Total Size Scanned:      {}",
        format_bytes(summary.total_bytes)
    );
    let _ = writeln!(out, "Stale Objects Found:     {}", summary.stale_objects);

    if summary.delete_mode {
        let _ = writeln!(out, "Objects Deleted:         {}", summary.deleted_objects);
        if !summary.failures.is_empty() {
            let _ = writeln!(out, "Failed Deletions:        {}", summary.failures.len());
            for failure in &summary.failures {
                let _ = writeln!(out, "  {}: {}", failure.key, failure.error);
            }
        }
        let _ = writeln!(
            out,
            "Space Reclaimed:         {}",
            format_bytes(summary.deleted_bytes)
        );
    } else {
        let _ = writeln!(
            out,
            "Potential Space Savings: {}",
            format_bytes(summary.stale_bytes)
        );
    }

    out
}
