//! Human-friendly session join codes.

use rand::Rng;

/// Length of a join code.
pub const JOIN_CODE_LEN: usize = 5;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random code, swapping characters that are easily misread.
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..JOIN_CODE_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .map(unconfuse)
        .collect()
}

/// Normalises user input before lookup.
pub fn normalize_join_code(input: &str) -> String {
    input.trim().to_ascii_uppercase().chars().map(unconfuse).collect()
}

fn unconfuse(c: char) -> char {
    match c {
        '0' => '2',
        'O' => '3',
        'I' => '4',
        '1' => '5',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_avoid_confusable_characters() {
        for _ in 0..500 {
            let code = generate_join_code();
            assert_eq!(code.len(), JOIN_CODE_LEN);
            assert!(!code.contains(['0', 'O', 'I', '1']));
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_normalize_maps_typed_lookalikes() {
        assert_eq!(normalize_join_code(" ab0o1 "), "AB235");
    }
}
