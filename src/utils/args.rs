//! Utilities related to the parsing of arguments.

/// Utility method to parse a confidence or identity cutoff passed in on the
/// command line and ensure the cutoff is within the range [0.0, 1.0].
pub fn cutoff_in_range(cutoff_raw: &str) -> Result<f64, String> {
    let cutoff: f64 = cutoff_raw
        .parse()
        .map_err(|_| format!("{} isn't a float", cutoff_raw))?;

    match (0.0..=1.0).contains(&cutoff) {
        true => Ok(cutoff),
        false => Err(format!("{} not in range [0.0, 1.0]", cutoff)),
    }
}

/// Utility method to parse a clustering percentage passed in on the command
/// line and ensure it is within the range (0.0, 100.0].
pub fn percent_in_range(percent_raw: &str) -> Result<f64, String> {
    let percent: f64 = percent_raw
        .parse()
        .map_err(|_| format!("{} isn't a number", percent_raw))?;

    match percent > 0.0 && percent <= 100.0 {
        true => Ok(percent),
        false => Err(format!("{} not in range (0, 100]", percent)),
    }
}

/// Gets the number of CPUs to hand to external tools when none is specified.
pub fn default_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_in_range() {
        assert_eq!(cutoff_in_range("0.8"), Ok(0.8));
        assert_eq!(cutoff_in_range("1"), Ok(1.0));
        assert!(cutoff_in_range("1.2").is_err());
        assert!(cutoff_in_range("-0.1").is_err());
        assert!(cutoff_in_range("abc").is_err());
    }

    #[test]
    fn test_percent_in_range() {
        assert_eq!(percent_in_range("97"), Ok(97.0));
        assert!(percent_in_range("0").is_err());
        assert!(percent_in_range("101").is_err());
    }
}
