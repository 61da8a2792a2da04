//! North American Numbering Plan phone formatting.

/// Longest number that is still formatted (`+1-nnn-nnn-nnnn`).
const MAX_NANP_LENGTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NanpState {
    Digit,
    Plus,
    One,
}

/// Format a phone number with NANP dashes.
///
/// Numbers that do not look like NANP numbers are returned unchanged:
/// anything longer than 15 or at most 5 characters, any character other
/// than digits, dashes and one leading `+`, and `+` not followed by `1`.
///
/// # Examples
/// ```
/// use foodshare_vcard::format_number;
/// assert_eq!(format_number("5551234567"), "555-123-4567");
/// assert_eq!(format_number("+15551234567"), "+1-555-123-4567");
/// assert_eq!(format_number("5551234"), "555-1234");
/// ```
pub fn format_number(source: &str) -> String {
    let length = source.chars().count();
    if length > MAX_NANP_LENGTH || length <= 5 {
        return source.to_string();
    }

    let digits: Vec<char> = source.chars().filter(|&c| c != '-').collect();
    let mut dash_positions = Vec::with_capacity(3);
    let mut state = NanpState::Digit;
    let mut num_digits = 0;

    for (i, &c) in digits.iter().enumerate() {
        match c {
            '1' if num_digits == 0 || state == NanpState::Plus => {
                state = NanpState::One;
            }
            '0'..='9' => {
                match state {
                    NanpState::Plus => return source.to_string(),
                    NanpState::One => dash_positions.push(i),
                    NanpState::Digit if num_digits == 3 || num_digits == 6 => dash_positions.push(i),
                    NanpState::Digit => {}
                }
                state = NanpState::Digit;
                num_digits += 1;
            }
            '+' if i == 0 => state = NanpState::Plus,
            _ => return source.to_string(),
        }
    }

    if num_digits == 7 {
        // xxx-xxxx rather than xxx-xxx-x
        dash_positions.pop();
    }

    let mut out = String::with_capacity(digits.len() + dash_positions.len());
    for (i, c) in digits.iter().enumerate() {
        if dash_positions.contains(&i) {
            out.push('-');
        }
        out.push(*c);
    }
    while out.ends_with('-') {
        out.pop();
    }

    out
}
