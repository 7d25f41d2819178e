//! Session code generation.

use rand::Rng;

/// Uppercase letters and digits only: codes must survive being read aloud
/// and typed on a tablet.
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default code length. 36^4 is about 1.68M codes, plenty at classroom scale.
pub const DEFAULT_LENGTH: usize = 4;

/// Draws a code of `length` characters from the supplied entropy source.
///
/// Pure over the RNG; uniqueness against existing sessions is the lifecycle
/// manager's job (it re-generates until the store reports the code free).
pub fn generate<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
