//! Controller color assignment

use rand::Rng;

/// Colors handed out to controllers, in order
pub const PALETTE: [&str; 8] = [
    "#00ff99", "#ff4d4d", "#4da6ff", "#ffd633", "#cc66ff", "#ff9933", "#33ffff", "#ff66b3",
];

/// `#rrggbb` check used for client-requested colors
pub fn is_valid_color(color: &str) -> bool {
    let bytes = color.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
}

/// Pick a color not in `taken`.
///
/// A valid, unused `requested` color wins. Otherwise the first free palette
/// entry is used, and once the palette is exhausted a random color is drawn.
/// Random colors are not checked against `taken`.
pub fn assign_color<'a, R, I>(requested: Option<&str>, taken: I, rng: &mut R) -> String
where
    R: Rng,
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<&str> = taken.into_iter().collect();
    let is_free = |c: &str| !taken.iter().any(|t| t.eq_ignore_ascii_case(c));

    if let Some(color) = requested {
        if is_valid_color(color) && is_free(color) {
            return color.to_ascii_lowercase();
        }
    }

    PALETTE
        .iter()
        .find(|c| is_free(c))
        .map(|c| c.to_string())
        .unwrap_or_else(|| random_color(rng))
}

pub fn random_color<R: Rng>(rng: &mut R) -> String {
    format!("#{:06x}", rng.gen_range(0..=0xff_ffffu32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn validates_hex_colors() {
        assert!(is_valid_color("#00FF99"));
        assert!(!is_valid_color("00ff99"));
        assert!(!is_valid_color("#00ff9"));
        assert!(!is_valid_color("#00ffzz"));
    }

    #[test]
    fn palette_colors_are_unique_until_exhausted() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut assigned: Vec<String> = Vec::new();
        for _ in 0..PALETTE.len() {
            let color = assign_color(None, assigned.iter().map(String::as_str), &mut rng);
            assert!(!assigned.contains(&color));
            assigned.push(color);
        }
        assert_eq!(assigned, PALETTE.iter().map(|c| c.to_string()).collect::<Vec<_>>());

        let fallback = assign_color(None, assigned.iter().map(String::as_str), &mut rng);
        assert!(is_valid_color(&fallback));
    }

    #[test]
    fn requested_color_is_honored_when_free() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(assign_color(Some("#ABCDEF"), std::iter::empty(), &mut rng), "#abcdef");
    }

    #[test]
    fn taken_or_invalid_request_falls_back_to_palette() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(assign_color(Some("#00FF99"), ["#00ff99"], &mut rng), PALETTE[1]);
        assert_eq!(assign_color(Some("red"), std::iter::empty(), &mut rng), PALETTE[0]);
    }
}
