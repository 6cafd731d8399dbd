//! URL alias derivation for user profiles.
//!
//! Latin diacritics are transliterated to ASCII, every run of other
//! characters collapses into a single `_`, and the result is capped at
//! [`ALIAS_MAX_LEN`]. Uniqueness is resolved by the user service.

/// Maximum length of the alias base (before any `_N` suffix).
pub const ALIAS_MAX_LEN: usize = 30;

fn transliterate_char(c: char) -> Option<&'static str> {
    let s = match c {
        'Š' => "S",
        'š' => "s",
        'Đ' => "Dj",
        'đ' => "dj",
        'Ž' => "Z",
        'ž' => "z",
        'Č' | 'Ć' => "C",
        'č' | 'ć' => "c",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Æ' => "A",
        'Ç' => "C",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'Ñ' => "N",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
        'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
        'Ý' => "Y",
        'Þ' => "B",
        'ß' => "Ss",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'æ' => "a",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ð' => "o",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'þ' => "b",
        'Ŕ' => "R",
        'ŕ' => "r",
        _ => return None,
    };
    Some(s)
}

/// Replace known Latin diacritics with their ASCII spelling. Other characters pass through.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match transliterate_char(c) {
            Some(s) => out.push_str(s),
            None => out.push(c),
        }
    }
    out
}

/// Alias base for a display name: transliterated, non-alphanumeric runs as `_`, max 30 chars.
pub fn alias_base(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut in_gap = false;
    for c in transliterate(display_name).chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_gap = false;
        } else if !in_gap {
            out.push('_');
            in_gap = true;
        }
    }
    // Only ASCII remains, so byte truncation is char-safe.
    out.truncate(ALIAS_MAX_LEN);
    out
}

/// Candidate alias for the given retry attempt: `base`, then `base_1`, `base_2`, ...
pub fn alias_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, attempt)
    }
}
