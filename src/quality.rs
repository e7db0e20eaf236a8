//! Quality score extraction from free-form validation text.
//!
//! Heuristic ladder: an explicit "quality score" line wins, then approval
//! keywords, then a floor. Always returns a value in [0, 1].

/// Extract a quality score in [0, 1] from validation output.
///
/// Scans lines case-insensitively for a "quality score" marker and takes
/// the first integer on that line divided by 100, clamped to 1.0. Falls
/// back to 0.8 on PASS/APPROVE, 0.6 on REVISE, 0.4 otherwise. The
/// keywords are matched case-sensitively; validators emit them uppercase.
pub fn extract_score(text: &str) -> f64 {
    for line in text.lines() {
        if line.to_lowercase().contains("quality score") {
            if let Some(value) = first_integer(line) {
                return (value as f64 / 100.0).min(1.0);
            }
        }
    }

    if text.contains("PASS") || text.contains("APPROVE") {
        0.8
    } else if text.contains("REVISE") {
        0.6
    } else {
        0.4
    }
}

/// First run of ASCII digits in a line, parsed as u64.
fn first_integer(line: &str) -> Option<u64> {
    let start = line.find(|c: char| c.is_ascii_digit())?;
    let digits: String = line[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
