use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate `len` random bytes, hex encoded (2 * len characters)
pub fn generate_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}

/// Generate a 256-bit key or token (64 hex characters)
pub fn generate_key() -> String {
    generate_hex(32)
}

/// Generate a human-usable password drawn uniformly from `[A-Za-z0-9]`
pub fn generate_password(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let key = generate_key();
        assert_eq!(key.len(), 64); // 32 bytes * 2 hex chars
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));

        // Ensure randomness
        assert_ne!(key, generate_key());
    }

    #[test]
    fn test_generate_password() {
        let password = generate_password(16);
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_password(16));
    }
}
