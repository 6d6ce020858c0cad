/// Parse a shorthand duration like `1h30m0s`, `10m`, `45s`, `2d`, or plain seconds.
///
/// Zero-valued segments are allowed (`1h0m`), and so is a zero total
/// (`0s`), which rule configs use to mean "not set".
pub fn parse_duration_seconds(raw: &str) -> Option<u64> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let bytes = compact.as_bytes();
    let mut cursor = 0;
    let mut total_seconds = 0_u64;
    let mut saw_unit_segment = false;

    while cursor < bytes.len() {
        let number_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }

        if number_start == cursor {
            return None;
        }

        let number = compact[number_start..cursor].parse::<u64>().ok()?;

        let saw_unit = cursor < bytes.len();
        let multiplier = if saw_unit {
            let unit = bytes[cursor] as char;
            cursor += 1;

            match unit {
                's' | 'S' => 1_u64,
                'm' | 'M' => 60_u64,
                'h' | 'H' => 60_u64 * 60,
                'd' | 'D' => 60_u64 * 60 * 24,
                _ => return None,
            }
        } else {
            1_u64
        };

        // A bare number is only accepted as the whole input.
        if !saw_unit && saw_unit_segment {
            return None;
        }

        saw_unit_segment = saw_unit_segment || saw_unit;

        let part_seconds = number.checked_mul(multiplier)?;
        total_seconds = total_seconds.checked_add(part_seconds)?;
    }

    Some(total_seconds)
}

/// Parse a whole percentage in `0..=100`, as typed by an administrator.
pub fn parse_percent(raw: &str) -> Option<u8> {
    let value = raw.trim().trim_end_matches('%').trim_end();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    value.parse::<u8>().ok().filter(|percent| *percent <= 100)
}
