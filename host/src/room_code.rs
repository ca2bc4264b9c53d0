use rand::Rng;

pub const ROOM_CODE_LEN: usize = 5;

/// Uppercase letters minus the ones easily misread when spoken or copied.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn fresh_room_code() -> String {
    generate_room_code(&mut rand::thread_rng())
}
