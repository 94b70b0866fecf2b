// ABOUTME: Parsing of human-readable byte sizes such as "64M" or "512KB".
// ABOUTME: Binary multiples: K = 1024, M = 1024^2, G = 1024^3.

/// Parse a byte size: plain digits, or digits followed by `K`, `M`, or `G`
/// with an optional trailing `B`. Case-insensitive.
pub fn parse_size(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    let upper = trimmed.to_ascii_uppercase();
    let unit_str = upper.strip_suffix('B').unwrap_or(&upper);

    let (digits, multiplier) = match unit_str.chars().last() {
        Some('K') => (&unit_str[..unit_str.len() - 1], 1024usize),
        Some('M') => (&unit_str[..unit_str.len() - 1], 1024 * 1024),
        Some('G') => (&unit_str[..unit_str.len() - 1], 1024 * 1024 * 1024),
        _ => (unit_str, 1),
    };

    let count: usize = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid size '{}'", trimmed))?;

    let bytes = count
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' is too large", trimmed))?;

    if bytes == 0 {
        return Err("size must be greater than zero".to_string());
    }

    Ok(bytes)
}
