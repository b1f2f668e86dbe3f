// src/services/normalize.rs
// DOCUMENTATION: Canonical forms for names, slugs and contact details
// PURPOSE: Imported spreadsheets lose leading zeros and mangle postcodes; fix them on the way in

/// Lowercase ASCII words joined by '-'; "Georgian & Victorian Antiques" -> "georgian-victorian-antiques"
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '\'' || c == '\u{2019}' {
            // "Jack's" -> "jacks"
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "place".to_string()
    } else {
        slug
    }
}

/// Name reduced for duplicate matching: no punctuation, no filler words
pub fn comparable_name(name: &str) -> String {
    const FILLER: [&str; 5] = ["the", "ltd", "limited", "and", "co"];

    slugify(name)
        .split('-')
        .filter(|w| !FILLER.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// UK phone numbers with the leading zero restored
///
/// `131 225 1234` (lost its zero in a spreadsheet) -> `01312251234`,
/// `+44 131 225 1234` -> `01312251234`. Anything that does not look like a
/// UK number is returned trimmed but otherwise untouched.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let national = if let Some(rest) = digits.strip_prefix("+44") {
        format!("0{}", rest.trim_start_matches('0'))
    } else if let Some(rest) = digits.strip_prefix("0044") {
        format!("0{}", rest.trim_start_matches('0'))
    } else {
        digits
    };

    if !national.chars().all(|c| c.is_ascii_digit()) {
        return Some(trimmed.to_string());
    }

    match national.len() {
        11 if national.starts_with('0') => Some(national),
        10 if !national.starts_with('0') => Some(format!("0{}", national)),
        _ => Some(trimmed.to_string()),
    }
}

/// UK postcode in canonical spacing: "eh11aa" -> "EH1 1AA"
pub fn normalize_postcode(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if compact.is_empty() {
        return None;
    }
    // Outward code is 2-4 characters, inward code always 3
    if !(5..=7).contains(&compact.len()) || !compact.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(raw.trim().to_uppercase());
    }

    let (outward, inward) = compact.split_at(compact.len() - 3);
    Some(format!("{} {}", outward, inward))
}

/// Trimmed value, with empty strings treated as absent
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
