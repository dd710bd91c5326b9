//! Chunked transfer engine.
//!
//! Both directions share the same shape: the chunk schedule is computed
//! up front, a bounded pool of workers processes chunks concurrently
//! (CTR for the payload, a per-chunk CBC-MAC), and once the pool drains
//! the per-chunk MACs are folded strictly in ascending chunk order into
//! the condensed MAC the server verifies.

pub mod chunks;
mod download;
mod progress;
mod upload;

use aes::Aes128;
use cipher::{BlockEncryptMut, KeyIvInit};

pub use progress::Progress;

pub(crate) use download::{download_to_file, DownloadParams};
pub(crate) use upload::{upload_from_file, UploadOutcome};

use crate::crypto::words::a32_to_bytes;

/// CBC-MAC one chunk of plaintext: IV is `(iv0, iv1, iv0, iv1)`, the
/// data is zero-padded to a block boundary, and only the final cipher
/// block is kept. A zero-length chunk yields all zeroes.
pub(crate) fn chunk_mac(key: &[u8; 16], iv: [u32; 2], data: &[u8]) -> [u8; 16] {
    let iv_block: [u8; 16] = a32_to_bytes(&[iv[0], iv[1], iv[0], iv[1]])
        .try_into()
        .expect("4 words");
    let mut enc = cbc::Encryptor::<Aes128>::new(key.into(), (&iv_block).into());
    let mut out = [0u8; 16];
    for block in data.chunks(16) {
        let mut padded = [0u8; 16];
        padded[..block.len()].copy_from_slice(block);
        enc.encrypt_block_b2b_mut((&padded).into(), (&mut out).into());
    }
    out
}

/// Fold per-chunk MACs, in chunk order, through a zero-IV CBC encrypter.
pub(crate) fn fold_macs<'a>(
    key: &[u8; 16],
    macs: impl IntoIterator<Item = &'a [u8; 16]>,
) -> [u8; 16] {
    let mut enc = cbc::Encryptor::<Aes128>::new(key.into(), (&[0u8; 16]).into());
    let mut out = [0u8; 16];
    for mac in macs {
        enc.encrypt_block_b2b_mut(mac.into(), (&mut out).into());
    }
    out
}

/// Condense a folded MAC to the two words the server stores:
/// `(w0 ^ w1, w2 ^ w3)`.
pub(crate) fn condensed_mac(folded: &[u8; 16]) -> [u32; 2] {
    let w = crate::crypto::words::bytes_to_a32(folded);
    [w[0] ^ w[1], w[2] ^ w[3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aes::{ctr_crypt, ctr_nonce};
    use chunks::chunk_schedule;

    const KEY: [u8; 16] = [13u8; 16];
    const IV: [u32; 2] = [0xaabbccdd, 0x11223344];

    #[test]
    fn test_empty_chunk_mac_is_zero() {
        assert_eq!(chunk_mac(&KEY, IV, &[]), [0u8; 16]);
    }

    #[test]
    fn test_fold_of_nothing_is_zero() {
        assert_eq!(fold_macs(&KEY, std::iter::empty()), [0u8; 16]);
    }

    #[test]
    fn test_upload_download_mac_agreement() {
        // a file spanning three growing chunks, with a short tail
        let size = 131072 + 262144 + 1000;
        let plain: Vec<u8> = (0..size).map(|i| (i * 31 % 251) as u8).collect();

        // upload side: MAC plaintext chunks, then encrypt them
        let schedule = chunk_schedule(size as u64);
        let mut cipher = Vec::new();
        let mut upload_macs = Vec::new();
        for (&start, &len) in &schedule {
            let mut chunk = plain[start as usize..start as usize + len].to_vec();
            upload_macs.push(chunk_mac(&KEY, IV, &chunk));
            ctr_crypt(&KEY, &ctr_nonce(IV, start), &mut chunk);
            cipher.extend_from_slice(&chunk);
        }
        let meta_mac = condensed_mac(&fold_macs(&KEY, &upload_macs));

        // download side: decrypt fetched chunks, MAC the plaintext
        let mut download_macs = Vec::new();
        for (&start, &len) in &schedule {
            let mut chunk = cipher[start as usize..start as usize + len].to_vec();
            ctr_crypt(&KEY, &ctr_nonce(IV, start), &mut chunk);
            assert_eq!(chunk, &plain[start as usize..start as usize + len]);
            download_macs.push(chunk_mac(&KEY, IV, &chunk));
        }
        let verified = condensed_mac(&fold_macs(&KEY, &download_macs));

        assert_eq!(meta_mac, verified);
    }

    #[test]
    fn test_corruption_changes_mac() {
        let plain: Vec<u8> = vec![7u8; 4096];
        let good = condensed_mac(&fold_macs(&KEY, &[chunk_mac(&KEY, IV, &plain)]));
        let mut bad_plain = plain;
        bad_plain[100] ^= 1;
        let bad = condensed_mac(&fold_macs(&KEY, &[chunk_mac(&KEY, IV, &bad_plain)]));
        assert_ne!(good, bad);
    }
}
