//! Single-line transfer progress rendering, fed by the byte-count
//! channel the transfer engine reports into.

use std::io::Write;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub fn spawn_renderer(
    mut rx: UnboundedReceiver<u64>,
    total: u64,
    src: String,
    dst: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = Instant::now();
        let mut done: u64 = 0;
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        draw(&src, &dst, done, total, start);
        loop {
            tokio::select! {
                update = rx.recv() => match update {
                    Some(bytes) => {
                        done += bytes;
                        draw(&src, &dst, done, total, start);
                    }
                    None => break,
                },
                _ = tick.tick() => draw(&src, &dst, done, total, start),
            }
        }
        eprintln!();
    })
}

fn draw(src: &str, dst: &str, done: u64, total: u64, start: Instant) {
    let elapsed = start.elapsed();
    let percent = if total > 0 {
        100.0 * done as f64 / total as f64
    } else {
        100.0
    };
    let rate = done as f64 / elapsed.as_secs_f64().max(0.001);
    eprint!(
        "\r\x1b[2KCopying {} -> {} # {:.2} % of {} at {}/s {}s ",
        src,
        dst,
        percent,
        format_bytes(total),
        format_bytes(rate as u64),
        elapsed.as_secs(),
    );
    let _ = std::io::stderr().flush();
}

/// Render a byte count with SI units, e.g. `17 B`, `1.5 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
