//! Base-91 numerals: printable ASCII `!`..`{`, each character worth `char - 33`

pub const BASE: u32 = 91;
pub const FIRST: u8 = b'!';
pub const LAST: u8 = b'{';

pub fn is_digit(b: u8) -> bool {
    (FIRST..=LAST).contains(&b)
}

/// Decode a big-endian run of base-91 digits. `None` on any non-digit byte.
pub fn decode(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &b| {
        if is_digit(b) {
            Some(acc * BASE + (b - FIRST) as u32)
        } else {
            None
        }
    })
}

/// Encode `value` as exactly `width` base-91 digits, saturating at the
/// largest representable value.
pub fn encode(value: u32, width: usize) -> String {
    let max = BASE.saturating_pow(width as u32).saturating_sub(1);
    let mut value = value.min(max);
    let mut digits = vec![FIRST; width];
    for slot in digits.iter_mut().rev() {
        *slot = FIRST + (value % BASE) as u8;
        value /= BASE;
    }
    digits.into_iter().map(char::from).collect()
}
