use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::Path;

use futures::{stream, StreamExt, TryStreamExt};

use super::chunks::chunk_schedule;
use super::{chunk_mac, condensed_mac, fold_macs, Progress};
use crate::crypto::aes::{ctr_crypt, ctr_nonce};
use crate::crypto::words::a32_to_bytes;
use crate::error::{Error, Result};

pub(crate) struct DownloadParams {
    /// Resource URL chunk ranges are fetched from.
    pub url: String,
    pub size: u64,
    pub key: [u8; 16],
    pub iv: [u32; 2],
    /// Expected condensed MAC from the node's composite key.
    pub mac: [u8; 8],
}

/// Fetch, decrypt and positionally write every chunk of a file, then
/// verify the folded MAC. On any failure the partial file is deleted.
pub(crate) async fn download_to_file(
    http: &reqwest::Client,
    retries: usize,
    workers: usize,
    params: &DownloadParams,
    dst: &Path,
    progress: &Progress,
) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(dst)?;

    let work: Vec<(usize, u64, usize)> = chunk_schedule(params.size)
        .into_iter()
        .enumerate()
        .map(|(id, (start, len))| (id, start, len))
        .collect();

    let file = &file;
    let outcome: Result<Vec<(usize, [u8; 16])>> = stream::iter(work)
        .map(|(id, start, len)| async move {
            let mut data = fetch_chunk(http, retries, &params.url, start, len).await?;
            ctr_crypt(&params.key, &ctr_nonce(params.iv, start), &mut data);
            file.write_all_at(&data, start)?;
            let mac = chunk_mac(&params.key, params.iv, &data);
            progress.advance(len as u64);
            Ok((id, mac))
        })
        .buffer_unordered(workers.max(1))
        .try_collect()
        .await;

    let mut macs = match outcome {
        Ok(macs) => macs,
        Err(e) => {
            let _ = std::fs::remove_file(dst);
            return Err(e);
        }
    };

    // fold strictly in chunk order; workers complete out of order
    macs.sort_by_key(|&(id, _)| id);
    let folded = fold_macs(&params.key, macs.iter().map(|(_, m)| m));
    if a32_to_bytes(&condensed_mac(&folded)) != params.mac {
        let _ = std::fs::remove_file(dst);
        return Err(Error::MacMismatch);
    }

    Ok(())
}

async fn fetch_chunk(
    http: &reqwest::Client,
    retries: usize,
    base_url: &str,
    start: u64,
    len: usize,
) -> Result<Vec<u8>> {
    let url = format!("{}/{}-{}", base_url, start, start + len as u64 - 1);
    let mut last = Error::BadResponse;
    for _ in 0..=retries {
        match http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(body) => return Ok(body.to_vec()),
                Err(e) => last = e.into(),
            },
            Ok(resp) => last = Error::ChunkFailed(resp.status().as_u16()),
            Err(e) => last = e.into(),
        }
    }
    Err(last)
}
