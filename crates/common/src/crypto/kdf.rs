//! Password-derived AES key and the email handle hash, both part of the
//! `us` login exchange.

use aes::Aes128;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, KeyInit};

use super::b64;
use super::words::{a32_to_bytes, bytes_to_a32, zero_pad};

const KEY_SEED: [u32; 4] = [0x93C4_67E3, 0x7DB0_C7A4, 0xD1BE_3F81, 0x0152_CB56];
const KEY_ROUNDS: usize = 65536;
const HASH_ROUNDS: usize = 16384;

/// Derive the 16-byte login key from a passphrase.
///
/// Each 16-byte block of the zero-padded passphrase becomes an AES key;
/// the running state is encrypted under each of them in turn for
/// [`KEY_ROUNDS`] iterations. Deliberately slow.
pub fn password_key(password: &str) -> [u8; 16] {
    let padded = zero_pad(password.as_bytes(), 16);
    let ciphers: Vec<Aes128> = padded
        .chunks_exact(16)
        .map(|block| Aes128::new(GenericArray::from_slice(block)))
        .collect();

    let mut key: [u8; 16] = a32_to_bytes(&KEY_SEED)
        .try_into()
        .expect("seed packs to 16 bytes");
    for _ in 0..KEY_ROUNDS {
        for cipher in &ciphers {
            cipher.encrypt_block(GenericArray::from_mut_slice(&mut key));
        }
    }
    key
}

/// Compute the 8-byte email handle hash, base64url-encoded (11 chars).
///
/// The input is XOR-folded into a 16-byte accumulator which is then
/// encrypted [`HASH_ROUNDS`] times under `key`; words 0 and 2 of the
/// result form the handle.
pub fn string_hash(input: &str, key: &[u8; 16]) -> String {
    let mut acc = [0u8; 16];
    for (i, b) in input.bytes().enumerate() {
        acc[i % 16] ^= b;
    }

    let aes = Aes128::new(key.into());
    for _ in 0..HASH_ROUNDS {
        aes.encrypt_block(GenericArray::from_mut_slice(&mut acc));
    }

    let words = bytes_to_a32(&acc);
    b64::encode(&a32_to_bytes(&[words[0], words[2]]))
}
