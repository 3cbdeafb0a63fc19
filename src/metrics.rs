// ============================================================================
// Text Metrics
// ============================================================================
//
// Advance widths for the two standard PDF fonts the documents use
// (Helvetica and Helvetica-Bold), plus the word-wrapping routine every
// wrapped field goes through. Widths are the Adobe AFM values in 1/1000 em.

/// Points to millimetres.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Normal,
    Bold,
}

/// Widths for code points 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0' .. '9'
    278, 278, 584, 584, 584, 556, 1015, // ':' .. '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A' .. 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N' .. 'Z'
    278, 278, 278, 469, 556, 333, // '[' .. '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a' .. 'm'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n' .. 'z'
    334, 260, 334, 584, // '{' .. '~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0' .. '9'
    333, 333, 584, 584, 584, 611, 975, // ':' .. '@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A' .. 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N' .. 'Z'
    333, 278, 333, 584, 556, 333, // '[' .. '`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a' .. 'm'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n' .. 'z'
    389, 280, 389, 584, // '{' .. '~'
];

const DEFAULT_WIDTH: u16 = 556;

/// Accented Latin letters share the advance of their base letter.
fn base_letter(ch: char) -> Option<char> {
    let base = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'ç' => 'c',
        'Ç' => 'C',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        _ => return None,
    };
    Some(base)
}

/// Advance of one character in 1/1000 em.
pub fn char_units(ch: char, weight: FontWeight) -> u16 {
    let table = match weight {
        FontWeight::Normal => &HELVETICA_WIDTHS,
        FontWeight::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let ch = base_letter(ch).unwrap_or(ch);
    match ch {
        ' '..='~' => table[ch as usize - 32],
        '\u{a0}' => table[0],
        '°' => 400,
        '’' | '‘' => match weight {
            FontWeight::Normal => 222,
            FontWeight::Bold => 278,
        },
        'œ' | 'Œ' => 1000,
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of `text` in millimetres.
pub fn text_width(text: &str, weight: FontWeight, font_size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|c| char_units(c, weight) as u32).sum();
    units as f32 / 1000.0 * font_size_pt * PT_TO_MM
}

/// Height of one text line in millimetres for a given font size.
pub fn line_height(font_size_pt: f32, line_height_factor: f32) -> f32 {
    font_size_pt * line_height_factor * PT_TO_MM
}

/// Wrap `text` so that no line is wider than `max_width` (mm).
///
/// Explicit line breaks are kept. Words are never split unless a single word
/// is wider than the limit on its own, in which case it is cut by character.
/// Always returns at least one line (possibly empty).
pub fn split_text_to_size(
    text: &str,
    max_width: f32,
    weight: FontWeight,
    font_size_pt: f32,
) -> Vec<String> {
    let fits = |s: &str| text_width(s, weight, font_size_pt) <= max_width;
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(word) {
                current = word.to_string();
                continue;
            }
            // Single word wider than the column: cut it.
            for ch in word.chars() {
                current.push(ch);
                if !fits(&current) && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_width_matches_afm() {
        // 278/1000 em at 12pt = 3.336pt
        let w = text_width(" ", FontWeight::Normal, 12.0);
        assert!((w - 3.336 * PT_TO_MM).abs() < 0.001);
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = text_width("Montant HT", FontWeight::Normal, 11.0);
        let bold = text_width("Montant HT", FontWeight::Bold, 11.0);
        assert!(bold > regular);
    }

    #[test]
    fn test_accents_use_base_letter() {
        assert_eq!(char_units('é', FontWeight::Normal), char_units('e', FontWeight::Normal));
        assert_eq!(char_units('€', FontWeight::Bold), DEFAULT_WIDTH);
    }

    #[test]
    fn test_short_text_is_one_line() {
        let lines = split_text_to_size("Marseille", 60.0, FontWeight::Normal, 12.0);
        assert_eq!(lines, vec!["Marseille"]);
    }

    #[test]
    fn test_empty_text_is_one_empty_line() {
        let lines = split_text_to_size("", 60.0, FontWeight::Normal, 12.0);
        assert_eq!(lines, vec![String::new()]);
    }

    #[test]
    fn test_long_text_wraps_within_width() {
        let text = "12 avenue du Prado, résidence Les Jardins du Parc, bâtiment C, escalier 4";
        let lines = split_text_to_size(text, 50.0, FontWeight::Normal, 12.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, FontWeight::Normal, 12.0) <= 50.0, "too wide: {}", line);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_explicit_newlines_are_kept() {
        let lines = split_text_to_size("Salle de bains\n\nFaïence", 100.0, FontWeight::Normal, 10.0);
        assert_eq!(lines, vec!["Salle de bains", "", "Faïence"]);
    }

    #[test]
    fn test_overlong_word_is_cut() {
        let word = "a".repeat(80);
        let lines = split_text_to_size(&word, 20.0, FontWeight::Normal, 12.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(text_width(line, FontWeight::Normal, 12.0) <= 20.0);
        }
    }
}
