use unicode_normalization::UnicodeNormalization;

/// Folds a scraped string down to its canonical form: NFKC compatibility
/// normalization, one representative glyph per quote/dash family, whitespace
/// runs collapsed to a single space, edges trimmed.
///
/// Venue pages mix full- and half-width punctuation freely, so every string
/// that participates in identity (dedup keys, hashes) has to pass through
/// here first.
pub fn canonicalize(s: &str) -> String {
    let folded: String = s
        .nfkc()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{301D}' | '\u{301E}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            // U+301C survives NFKC; U+FF5E has already folded to '~'
            '\u{301C}' => '~',
            '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2212}' => '-',
            other => other,
        })
        .collect();

    let mut out = String::with_capacity(folded.len());
    for segment in folded.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(segment);
    }
    out
}
