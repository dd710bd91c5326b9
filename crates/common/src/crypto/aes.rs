//! AES-128 block helpers in the modes the MEGA scheme uses: ECB over key
//! blobs, zero-IV CBC over attributes, and big-endian CTR over payloads.

use aes::Aes128;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher};

use super::words::a32_to_bytes;

/// ECB-encrypt in place over successive 16-byte blocks. A trailing
/// partial block is left untouched.
pub fn ecb_encrypt_in_place(key: &[u8; 16], buf: &mut [u8]) {
    let aes = Aes128::new(key.into());
    for block in buf.chunks_exact_mut(16) {
        aes.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// ECB-decrypt in place over successive 16-byte blocks. A trailing
/// partial block is left untouched.
pub fn ecb_decrypt_in_place(key: &[u8; 16], buf: &mut [u8]) {
    let aes = Aes128::new(key.into());
    for block in buf.chunks_exact_mut(16) {
        aes.decrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// CBC-encrypt in place with a zero IV. `buf` must be block-aligned.
pub fn cbc_encrypt_zero_iv(key: &[u8; 16], buf: &mut [u8]) {
    let mut enc = cbc::Encryptor::<Aes128>::new(key.into(), (&[0u8; 16]).into());
    for block in buf.chunks_exact_mut(16) {
        enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// CBC-decrypt in place with a zero IV. `buf` must be block-aligned.
pub fn cbc_decrypt_zero_iv(key: &[u8; 16], buf: &mut [u8]) {
    let mut dec = cbc::Decryptor::<Aes128>::new(key.into(), (&[0u8; 16]).into());
    for block in buf.chunks_exact_mut(16) {
        dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Build the CTR nonce for a chunk at `offset`: the two IV words followed
/// by the block counter split across two words. The counter advances per
/// 16-byte block, so the high word only moves past 64 GiB.
pub fn ctr_nonce(iv: [u32; 2], offset: u64) -> [u8; 16] {
    let words = [
        iv[0],
        iv[1],
        (offset / 0x10_0000_0000) as u32,
        (offset / 16) as u32,
    ];
    a32_to_bytes(&words).try_into().expect("four words pack to 16 bytes")
}

/// CTR-XOR `data` in place under `key` with the given nonce.
pub fn ctr_crypt(key: &[u8; 16], nonce: &[u8; 16], data: &mut [u8]) {
    let mut ctr = ctr::Ctr128BE::<Aes128>::new(key.into(), nonce.into());
    ctr.apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [7u8; 16];

    #[test]
    fn test_ecb_round_trip() {
        let mut buf = [0u8; 32];
        buf[..5].copy_from_slice(b"hello");
        let orig = buf;
        ecb_encrypt_in_place(&KEY, &mut buf);
        assert_ne!(buf, orig);
        ecb_decrypt_in_place(&KEY, &mut buf);
        assert_eq!(buf, orig);
    }

    #[test]
    fn test_ecb_ignores_partial_tail() {
        let mut buf = [1u8; 20];
        ecb_encrypt_in_place(&KEY, &mut buf);
        assert_eq!(&buf[16..], &[1u8; 4]);
    }

    #[test]
    fn test_cbc_round_trip() {
        let mut buf = [0u8; 48];
        buf[..4].copy_from_slice(b"MEGA");
        let orig = buf;
        cbc_encrypt_zero_iv(&KEY, &mut buf);
        cbc_decrypt_zero_iv(&KEY, &mut buf);
        assert_eq!(buf, orig);
    }

    #[test]
    fn test_cbc_chains_blocks() {
        // identical plaintext blocks must not produce identical ciphertext
        let mut buf = [9u8; 32];
        cbc_encrypt_zero_iv(&KEY, &mut buf);
        assert_ne!(buf[..16], buf[16..]);
    }

    #[test]
    fn test_ctr_round_trip() {
        let nonce = ctr_nonce([1, 2], 131072);
        let mut data = b"some chunk payload bytes".to_vec();
        let orig = data.clone();
        ctr_crypt(&KEY, &nonce, &mut data);
        assert_ne!(data, orig);
        ctr_crypt(&KEY, &nonce, &mut data);
        assert_eq!(data, orig);
    }

    #[test]
    fn test_ctr_nonce_layout() {
        let nonce = ctr_nonce([0x01020304, 0x05060708], 0x10_0002_0000);
        assert_eq!(&nonce[..4], &[1, 2, 3, 4]);
        assert_eq!(&nonce[4..8], &[5, 6, 7, 8]);
        // 0x10_0002_0000 / 0x10_0000_0000 == 1
        assert_eq!(&nonce[8..12], &1u32.to_be_bytes());
        // (0x10_0002_0000 / 16) truncated to 32 bits
        assert_eq!(&nonce[12..], &0x2000u32.to_be_bytes());
    }
}
