use std::os::unix::fs::FileExt;
use std::path::Path;

use futures::{stream, StreamExt, TryStreamExt};

use super::chunks::chunk_schedule;
use super::{chunk_mac, condensed_mac, fold_macs, Progress};
use crate::crypto::aes::{ctr_crypt, ctr_nonce};
use crate::error::{Error, Result};

pub(crate) struct UploadOutcome {
    /// Body of the last non-empty chunk POST; names the pending node in
    /// the completing `p` command.
    pub completion_handle: String,
    /// Condensed MAC of the uploaded content.
    pub meta_mac: [u32; 2],
}

/// Read, MAC, encrypt and POST every chunk of a local file. A zero-byte
/// file still POSTs one empty chunk so the server hands out a
/// completion handle.
pub(crate) async fn upload_from_file(
    http: &reqwest::Client,
    retries: usize,
    workers: usize,
    upload_url: &str,
    src: &Path,
    size: u64,
    key: [u8; 16],
    iv: [u32; 2],
    progress: &Progress,
) -> Result<UploadOutcome> {
    let file = std::fs::File::open(src)?;

    let mut work: Vec<(usize, u64, usize)> = chunk_schedule(size)
        .into_iter()
        .enumerate()
        .map(|(id, (start, len))| (id, start, len))
        .collect();
    if work.is_empty() {
        work.push((0, 0, 0));
    }

    let file = &file;
    let mut results: Vec<(usize, [u8; 16], String)> = stream::iter(work)
        .map(|(id, start, len)| async move {
            let mut data = vec![0u8; len];
            file.read_exact_at(&mut data, start)?;
            let mac = chunk_mac(&key, iv, &data);
            ctr_crypt(&key, &ctr_nonce(iv, start), &mut data);
            let body =
                post_chunk(http, retries, &format!("{}/{}", upload_url, start), data).await?;
            progress.advance(len as u64);
            Ok::<_, Error>((id, mac, body))
        })
        .buffer_unordered(workers.max(1))
        .try_collect()
        .await?;

    results.sort_by_key(|&(id, _, _)| id);

    // the server only answers the final chunk with the handle
    let completion_handle = results
        .iter()
        .rev()
        .find_map(|(_, _, body)| (!body.is_empty()).then(|| body.clone()))
        .ok_or(Error::BadResponse)?;

    let folded = fold_macs(&key, results.iter().map(|(_, m, _)| m));
    Ok(UploadOutcome {
        completion_handle,
        meta_mac: condensed_mac(&folded),
    })
}

async fn post_chunk(
    http: &reqwest::Client,
    retries: usize,
    url: &str,
    data: Vec<u8>,
) -> Result<String> {
    let mut last = Error::BadResponse;
    for _ in 0..=retries {
        match http.post(url).body(data.clone()).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => return Ok(body),
                Err(e) => last = e.into(),
            },
            Ok(resp) => last = Error::ChunkFailed(resp.status().as_u16()),
            Err(e) => last = e.into(),
        }
    }
    Err(last)
}
