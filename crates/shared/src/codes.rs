//! Human-shareable code generation for loyalty codes and reward coupons.

use rand::Rng;

/// Upper-case alphabet without look-alike characters (0/O, 1/I/L).
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Default prefix for admin-minted loyalty codes.
pub const DEFAULT_LOYALTY_CODE_PREFIX: &str = "LP-";

/// Default prefix for reward redemption coupons.
pub const DEFAULT_COUPON_PREFIX: &str = "RW-";

/// Default number of random characters after the prefix.
pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Generates `prefix` followed by `length` characters drawn from [`CODE_ALPHABET`].
pub fn generate_code(prefix: &str, length: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(prefix.len() + length);
    code.push_str(prefix);
    for _ in 0..length {
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}

/// Trims surrounding whitespace and upper-cases user input.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}
