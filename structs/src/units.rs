//! Value parsing for the tabular inputs. The simulation clock runs in
//! minutes; every helper here converts into that unit.

/// Accepts either a plain number of minutes, or a `YYYY?MM?DD?HH?MM?SS`
/// pattern with arbitrary single-character separators.
pub fn parse_time_minutes(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    // Split on any non-digit separator; exactly six fields expected.
    let fields: Vec<&str> = s.split(|c: char| !c.is_ascii_digit()).collect();
    if fields.len() != 6 || fields.iter().any(|f| f.is_empty()) {
        return None;
    }
    let nums: Vec<u64> = fields.iter().map(|f| f.parse::<u64>().ok()).collect::<Option<_>>()?;
    let (year, month, day, hour, min, sec) = (nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
    if month > 12 || day > 31 || hour > 23 || min > 59 || sec > 59 {
        return None;
    }
    // Simplistic 365-day calendar; only differences ever reach the outputs.
    const DAYS_BEFORE_MONTH: [u64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
    let month_days = DAYS_BEFORE_MONTH[month.saturating_sub(1) as usize];
    let days = year * 365 + month_days + day.saturating_sub(1);
    Some(((days * 24 + hour) * 60 + min) as f64 + sec as f64 / 60.0)
}

/// Case-insensitive boolean, matching the accepted spellings of the inputs.
/// An empty cell reads as false.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "t" | "true" | "yes" | "y" => Some(true),
        "0" | "0.0" | "f" | "false" | "no" | "n" | "" => Some(false),
        _ => None,
    }
}

/// A number, or `inf` for unbounded capacities and targets.
pub fn parse_number_or_inf(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("inf") {
        return Some(f64::INFINITY);
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn hours_to_minutes(h: f64) -> f64 {
    h * 60.0
}

pub fn kmh_to_km_per_min(v: f64) -> f64 {
    v / 60.0
}

pub fn minutes_to_hours(m: f64) -> f64 {
    m / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_pattern_and_minutes() {
        assert_eq!(parse_time_minutes("90"), Some(90.0));
        assert_eq!(parse_time_minutes("90.5"), Some(90.5));
        // One hour past the zero date.
        let zero = parse_time_minutes("0000/00/00/00/00/00").unwrap();
        let one_hr = parse_time_minutes("0000/00/00/01/00/00").unwrap();
        assert_eq!(one_hr - zero, 60.0);
        // Mixed separators are fine as long as they are single characters.
        let a = parse_time_minutes("2020/01/01/05/30/00").unwrap();
        let b = parse_time_minutes("2020-01-01T05-31-00").unwrap();
        assert_eq!(b - a, 1.0);
        assert_eq!(parse_time_minutes("not a time"), None);
        assert_eq!(parse_time_minutes("2020/01/01"), None);
    }

    #[test]
    fn bool_spellings() {
        for s in ["1", "1.0", "t", "TRUE", "Yes", "y"] {
            assert_eq!(parse_bool(s), Some(true), "{}", s);
        }
        for s in ["0", "0.0", "f", "False", "NO", "n", "", "  "] {
            assert_eq!(parse_bool(s), Some(false), "{}", s);
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn number_or_inf() {
        assert_eq!(parse_number_or_inf("12.5"), Some(12.5));
        assert_eq!(parse_number_or_inf("inf"), Some(f64::INFINITY));
        assert_eq!(parse_number_or_inf("Inf"), Some(f64::INFINITY));
        assert_eq!(parse_number_or_inf("twelve"), None);
    }
}
