//! Utilities related to displaying things.

use std::fmt;

use num_format::Locale;
use num_format::ToFormattedString;

/// Utility struct for displaying percentages rounded to a whole number. The
/// first item in the struct is the numerator and the second item in the struct
/// is the denominator.
pub struct PercentageFormat(pub u64, pub u64);

impl fmt::Display for PercentageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.1 == 0 {
            f.write_str("N/A")
        } else {
            let (a, b) = (self.0 as f64, self.1 as f64);
            write!(f, "{:.0}%", a / b * 100.0)
        }
    }
}

/// Formats a count with thousands separators (`1,234,567`).
pub fn count<N>(n: N) -> String
where
    N: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Utility struct for displaying a file size in human readable units.
pub struct FileSize(pub u64);

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

        let mut size = self.0 as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }

        match unit {
            0 => write!(f, "{} {}", self.0, UNITS[0]),
            _ => write!(f, "{:.1} {}", size, UNITS[unit]),
        }
    }
}
