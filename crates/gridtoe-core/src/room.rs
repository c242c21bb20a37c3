use rand::Rng;

/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random 6-character uppercase alphanumeric room code.
///
/// Uniqueness is not checked here; the registry regenerates on collision.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARSET[rng.random_range(0..ROOM_CODE_CHARSET.len())] as char)
        .collect()
}

/// Check that a code has the shape produced by [`generate_room_code`].
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
