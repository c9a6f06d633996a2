//! Pitch names and General MIDI percussion keys
//!
//! Converts written pitch names ("C-4", "F#-3", "Bb5") into MIDI note numbers and maps
//! General MIDI drum names onto the key numbers a sound font plays them on.

/// Parse a pitch name into a MIDI note number
///
/// The name is a letter `A`-`G`, any number of `#` or `b` accidentals, and an optional
/// octave with or without a `-` separator. A missing octave means octave 4. Octave 4 is the
/// octave of middle C, so `C-4` is MIDI 60.
///
/// Returns `None` for malformed names or pitches outside 0..=127.
///
/// # Examples
/// ```
/// use cadenza::pitch::parse_pitch_name;
///
/// assert_eq!(parse_pitch_name("C-4"), Some(60));
/// assert_eq!(parse_pitch_name("A4"), Some(69));
/// assert_eq!(parse_pitch_name("Bb-3"), Some(58));
/// assert_eq!(parse_pitch_name("C##"), Some(62));
/// assert_eq!(parse_pitch_name("H-4"), None);
/// ```
pub fn parse_pitch_name(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars().peekable();

    let semitone: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut accidental = 0;
    while let Some(&c) = chars.peek() {
        match c {
            '#' => accidental += 1,
            'b' => accidental -= 1,
            _ => break,
        }
        chars.next();
    }

    let rest: String = chars.collect();
    let octave_text = rest.strip_prefix('-').unwrap_or(&rest);
    let octave: i32 = if octave_text.is_empty() {
        4
    } else {
        octave_text.parse().ok()?
    };

    // C-0 is MIDI 12
    let midi = (octave + 1) * 12 + semitone + accidental;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

/// General MIDI percussion key map (channel 10 drum kit)
const PERCUSSION_KEYS: &[(&str, u8)] = &[
    ("acoustic-bass-drum", 35),
    ("bass-drum", 36),
    ("kick", 36),
    ("side-stick", 37),
    ("snare", 38),
    ("acoustic-snare", 38),
    ("hand-clap", 39),
    ("electric-snare", 40),
    ("low-floor-tom", 41),
    ("closed-hi-hat", 42),
    ("high-floor-tom", 43),
    ("pedal-hi-hat", 44),
    ("low-tom", 45),
    ("open-hi-hat", 46),
    ("low-mid-tom", 47),
    ("hi-mid-tom", 48),
    ("crash-cymbal", 49),
    ("high-tom", 50),
    ("ride-cymbal", 51),
    ("chinese-cymbal", 52),
    ("ride-bell", 53),
    ("tambourine", 54),
    ("splash-cymbal", 55),
    ("cowbell", 56),
    ("crash-cymbal-2", 57),
    ("vibraslap", 58),
    ("ride-cymbal-2", 59),
    ("hi-bongo", 60),
    ("low-bongo", 61),
    ("mute-hi-conga", 62),
    ("open-hi-conga", 63),
    ("low-conga", 64),
    ("high-timbale", 65),
    ("low-timbale", 66),
    ("high-agogo", 67),
    ("low-agogo", 68),
    ("cabasa", 69),
    ("maracas", 70),
    ("short-whistle", 71),
    ("long-whistle", 72),
    ("short-guiro", 73),
    ("long-guiro", 74),
    ("claves", 75),
    ("hi-wood-block", 76),
    ("low-wood-block", 77),
    ("mute-cuica", 78),
    ("open-cuica", 79),
    ("mute-triangle", 80),
    ("open-triangle", 81),
];

/// Key number of a General MIDI percussion instrument
///
/// Names are matched case-insensitively, with spaces and underscores treated as dashes.
///
/// # Examples
/// ```
/// use cadenza::pitch::percussion_key;
///
/// assert_eq!(percussion_key("snare"), Some(38));
/// assert_eq!(percussion_key("Closed Hi Hat"), Some(42));
/// assert_eq!(percussion_key("piano"), None);
/// ```
pub fn percussion_key(name: &str) -> Option<u8> {
    let normalized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '_' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    PERCUSSION_KEYS
        .iter()
        .find(|(key_name, _)| *key_name == normalized)
        .map(|(_, key)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_pitches() {
        // C4=60, D4=62, E4=64, F4=65, G4=67, A4=69, B4=71
        assert_eq!(parse_pitch_name("C-4"), Some(60));
        assert_eq!(parse_pitch_name("D-4"), Some(62));
        assert_eq!(parse_pitch_name("E-4"), Some(64));
        assert_eq!(parse_pitch_name("F-4"), Some(65));
        assert_eq!(parse_pitch_name("G-4"), Some(67));
        assert_eq!(parse_pitch_name("A-4"), Some(69));
        assert_eq!(parse_pitch_name("B-4"), Some(71));
    }

    #[test]
    fn test_octaves_and_accidentals() {
        assert_eq!(parse_pitch_name("C-0"), Some(12));
        assert_eq!(parse_pitch_name("C5"), Some(72));
        assert_eq!(parse_pitch_name("F#-3"), Some(54));
        assert_eq!(parse_pitch_name("Cb-4"), Some(59));
        assert_eq!(parse_pitch_name("e"), Some(64));
    }

    #[test]
    fn test_out_of_range_pitch() {
        assert_eq!(parse_pitch_name("G-9"), Some(127));
        assert_eq!(parse_pitch_name("G#-9"), None);
        assert_eq!(parse_pitch_name("Cb-0"), Some(11));
    }

    #[test]
    fn test_malformed_pitch() {
        assert_eq!(parse_pitch_name(""), None);
        assert_eq!(parse_pitch_name("X-4"), None);
        assert_eq!(parse_pitch_name("C-four"), None);
    }

    #[test]
    fn test_percussion_aliases() {
        assert_eq!(percussion_key("bass-drum"), Some(36));
        assert_eq!(percussion_key("ACOUSTIC_SNARE"), Some(38));
        assert_eq!(percussion_key("open triangle"), Some(81));
        assert_eq!(percussion_key("violin"), None);
    }
}
