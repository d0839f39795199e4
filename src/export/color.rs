//! Row colour parsing for spreadsheet fills and print styles.

/// Parse `#RGB`, `#RRGGBB`, `rgb(r,g,b)` or `rgba(r,g,b,a)` into a 24-bit RGB value.
/// Alpha is ignored; channels above 255 are clamped.
pub fn parse_color(input: &str) -> Option<u32> {
    let s = input.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match hex.len() {
            3 => {
                let doubled: String = hex.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&doubled, 16).ok()
            }
            6 => u32::from_str_radix(hex, 16).ok(),
            _ => None,
        };
    }

    let lower = s.to_ascii_lowercase();
    let inner = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let mut rgb = 0u32;
    for p in &parts[..3] {
        if p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let channel = p.parse::<u64>().ok()?.min(255) as u32;
        rgb = (rgb << 8) | channel;
    }
    if let Some(alpha) = parts.get(3) {
        alpha.parse::<f64>().ok()?;
    }
    Some(rgb)
}

/// Opaque ARGB hex, e.g. `FFAABBCC`.
pub fn normalize_color_to_argb(input: &str) -> Option<String> {
    parse_color(input).map(|rgb| format!("FF{rgb:06X}"))
}

/// CSS hex form, e.g. `#AABBCC`.
pub fn css_hex(input: &str) -> Option<String> {
    parse_color(input).map(|rgb| format!("#{rgb:06X}"))
}
