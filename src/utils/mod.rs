pub mod logging;

/// Formats whole seconds as `m:ss`; negative and non-finite inputs read as zero.
pub fn format_elapsed(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::format_elapsed;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_elapsed(0.0), "0:00");
        assert_eq!(format_elapsed(9.9), "0:09");
        assert_eq!(format_elapsed(75.0), "1:15");
        assert_eq!(format_elapsed(600.0), "10:00");
    }

    #[test]
    fn garbage_reads_as_zero() {
        assert_eq!(format_elapsed(f64::NAN), "0:00");
        assert_eq!(format_elapsed(-3.0), "0:00");
        assert_eq!(format_elapsed(f64::INFINITY), "0:00");
    }
}
