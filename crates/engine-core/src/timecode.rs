use anyhow::{Result, bail};

/// Parse a timestamp in either `HH:MM:SS`(.fraction) form or bare seconds
/// (`"12.5"`) into seconds. Segments may arrive in either shape from the
/// transcription collaborator.
pub fn parse_seconds(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty timecode");
    }

    if !raw.contains(':') {
        return Ok(raw.parse::<f64>()?);
    }

    let parts: Vec<&str> = raw.split(':').collect();
    let (h, m, s): (f64, f64, f64) = match parts.as_slice() {
        [h, m, s] => (h.parse()?, m.parse()?, s.parse()?),
        [m, s] => (0.0, m.parse()?, s.parse()?),
        _ => bail!("unrecognized timecode format: {raw}"),
    };

    Ok(h * 3600.0 + m * 60.0 + s)
}

/// Render seconds back into `HH:MM:SS.mmm` for display/audit purposes.
pub fn format_seconds(total: f64) -> String {
    let total = total.max(0.0);
    let whole = total.floor() as u64;
    let millis = ((total - whole as f64) * 1000.0).round() as u64;
    let h = whole / 3600;
    let m = (whole % 3600) / 60;
    let s = whole % 60;
    format!("{h:02}:{m:02}:{s:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hms() {
        assert_eq!(parse_seconds("00:01:05").unwrap(), 65.0);
        assert_eq!(parse_seconds("01:00:00").unwrap(), 3600.0);
    }

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(parse_seconds("42.5").unwrap(), 42.5);
    }

    #[test]
    fn round_trips_format() {
        assert_eq!(format_seconds(65.0), "00:01:05.000");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_seconds("").is_err());
        assert!(parse_seconds("not-a-time").is_err());
    }
}
