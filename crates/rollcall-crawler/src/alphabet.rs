//! Search alphabets.
//!
//! Top-level queries walk Latin letters, then digits, then Persian letters,
//! each ranked by how often names start with them. The ordering only affects
//! which members are found first, not coverage.

/// Latin letters ranked by frequency as a name initial.
pub const LATIN: &[char] = &[
    'a', 'm', 's', 'd', 'j', 'r', 'b', 'k', 't', 'c', 'e', 'l', 'n', 'p', 'g', 'v', 'h', 'o', 'f',
    'i', 'w', 'y', 'q', 'u', 'z', 'x',
];

/// Decimal digits.
pub const DIGITS: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Persian letters ranked by frequency as a name initial.
pub const PERSIAN: &[char] = &[
    'ا', 'آ', 'م', 'س', 'ر', 'ن', 'ب', 'د', 'پ', 'ت', 'ک', 'ه', 'و', 'ی', 'ف', 'ش', 'ج', 'ح', 'خ',
    'ل', 'ع', 'ق', 'گ', 'ز', 'ص', 'ض', 'ط', 'ظ', 'ذ', 'چ', 'ث', 'ژ', 'غ', 'ء', 'ئ', 'ؤ',
];

/// Writing system of a prefix character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// ASCII letter, either case
    Latin,
    /// Letter of the right-to-left alphabet
    RightToLeft,
    /// Decimal digit
    Digit,
    /// Anything else
    Other,
}

impl ScriptClass {
    /// Classify a single character.
    #[must_use]
    pub fn of(ch: char) -> Self {
        if ch.is_ascii_alphabetic() {
            Self::Latin
        } else if PERSIAN.contains(&ch) {
            Self::RightToLeft
        } else if ch.is_ascii_digit() {
            Self::Digit
        } else {
            Self::Other
        }
    }
}

/// Top-level query characters in scan order.
#[must_use]
pub fn base_alphabet() -> Vec<char> {
    LATIN.iter().chain(DIGITS).chain(PERSIAN).copied().collect()
}

/// Characters appended to `prefix` when its results were truncated.
///
/// Latin prefixes stay Latin, right-to-left prefixes stay in their script;
/// digits and anything else could continue in either, so they get the full
/// base alphabet.
#[must_use]
pub fn child_alphabet(prefix: &str) -> Vec<char> {
    match prefix.chars().last().map(ScriptClass::of) {
        Some(ScriptClass::Latin) => LATIN.iter().chain(DIGITS).copied().collect(),
        Some(ScriptClass::RightToLeft) => PERSIAN.iter().chain(DIGITS).copied().collect(),
        Some(ScriptClass::Digit | ScriptClass::Other) | None => base_alphabet(),
    }
}
