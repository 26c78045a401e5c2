//! 📊 progress.rs — "Are we there yet?" — every county-sized CSV, every time, forever.
//!
//! 🚀 Bytes read, rows read, rows rejected, how fast, and how long until it's over.
//! A progress bar on top, a borderless comfy-table underneath.
//!
//! ⚠️  Watching this progress bar will not make it go faster.
//! Neither will refreshing it. We've tried. Science says no.
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

// -- 📏 one mebibyte — not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

// -- 🔄 rates are measured over this trailing window so one slow disk read doesn't look like the apocalypse.
const RATE_WINDOW: Duration = Duration::from_secs(5);

/// 📦 Bytes scaled to the size of the whole file, so the units don't flicker.
fn format_bytes(bytes: u64, file_size: u64) -> String {
    if file_size >= 512 * MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if file_size >= MIB {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        // -- 🐛 raw bytes mode. small files need love too.
        format!("{} bytes", bytes)
    }
}

/// 🔢 "1000000" → "1,000,000" — you're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS for the long hauls.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

struct Rates {
    rows_per_sec: f64,
    mib_per_sec: f64,
    percent_per_sec: f64,
}

/// 📊 Tracks how far into the CSV the producer is and draws it.
///
/// Positions are absolute: the producer reports the byte offset the reader has reached
/// and the running row counts, not deltas.
pub struct ProgressMetrics {
    source_name: String,
    total_size: u64,
    bytes_read: u64,
    rows_read: u64,
    rows_rejected: u64,
    progress_bar: ProgressBar,
    rate_samples: VecDeque<(Instant, u64, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("source_name", &self.source_name)
            .field("total_size", &self.total_size)
            .field("bytes_read", &self.bytes_read)
            .field("rows_read", &self.rows_read)
            .field("rows_rejected", &self.rows_rejected)
            .finish()
    }
}

impl ProgressMetrics {
    /// 🚀 A visible bar for `source_name`. `total_size` of 0 means "no idea", and the
    /// percent and ETA columns give up gracefully.
    pub fn new(source_name: String, total_size: u64) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        let style = ProgressStyle::default_bar()
            .template("{msg}\n| [{bar:40.cyan/blue}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        progress_bar.set_style(style);
        Self::with_bar(source_name, total_size, progress_bar)
    }

    /// 🙈 Same bookkeeping, nothing drawn. For tests and for when stderr isn't a terminal.
    pub fn hidden(source_name: String, total_size: u64) -> Self {
        Self::with_bar(source_name, total_size, ProgressBar::hidden())
    }

    fn with_bar(source_name: String, total_size: u64, progress_bar: ProgressBar) -> Self {
        let start_time = Instant::now();
        // -- 🔄 seed the rate window with t=0 so we don't divide by zero like animals
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64, 0u64));
        Self {
            source_name,
            total_size,
            bytes_read: 0,
            rows_read: 0,
            rows_rejected: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 Move the bar to `byte_offset` with the running row tallies.
    pub(crate) fn update(&mut self, byte_offset: u64, rows_read: u64, rows_rejected: u64) {
        self.bytes_read = byte_offset;
        self.rows_read = rows_read;
        self.rows_rejected = rows_rejected;

        let rates = self.calculate_rates();
        self.render(rates);
        self.progress_bar.set_position(self.bytes_read);
    }

    /// ✅ EOF. Ring the bell.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn calculate_rates(&mut self) -> Rates {
        let now = Instant::now();
        while let Some(&(timestamp, _, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > RATE_WINDOW {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples
            .push_back((now, self.bytes_read, self.rows_read));

        if let Some(&(oldest_time, oldest_bytes, oldest_rows)) = self.rate_samples.front() {
            let elapsed = now.duration_since(oldest_time).as_secs_f64();
            if elapsed > 0.0 {
                let bytes_delta = self.bytes_read.saturating_sub(oldest_bytes);
                let rows_delta = self.rows_read.saturating_sub(oldest_rows);
                let percent_delta = if self.total_size > 0 {
                    (bytes_delta as f64 / self.total_size as f64) * 100.0
                } else {
                    0.0
                };
                return Rates {
                    rows_per_sec: rows_delta as f64 / elapsed,
                    mib_per_sec: (bytes_delta as f64 / elapsed) / MIB as f64,
                    percent_per_sec: percent_delta / elapsed,
                };
            }
        }

        Rates {
            rows_per_sec: 0.0,
            mib_per_sec: 0.0,
            percent_per_sec: 0.0,
        }
    }

    fn percent(&self) -> f64 {
        if self.total_size > 0 {
            (self.bytes_read as f64 / self.total_size as f64) * 100.0
        } else {
            0.0
        }
    }

    fn remaining(&self, elapsed: Duration) -> String {
        let percent = self.percent();
        if percent <= 0.0 {
            return "--:--".to_string();
        }
        // 🔮 linear extrapolation — assumes the rest of the file reads like the first part
        let total_estimated = elapsed.as_secs_f64() / (percent / 100.0);
        let remaining_secs = total_estimated - elapsed.as_secs_f64();
        if remaining_secs > 0.0 {
            format_duration(Duration::from_secs_f64(remaining_secs))
        } else {
            "--:--".to_string()
        }
    }

    /// 🎨 Layout:
    /// ```text
    /// source: <csv path>
    ///   <rows/s>     <rows read>
    ///   <MiB/s>      <bytes progress>
    ///   <%/s>        <%>
    ///   <rejected>   <elapsed>   <remaining>
    /// | [=====>----------]
    /// ```
    fn render(&self, rates: Rates) {
        let bytes_progress = format!(
            "{} / {}",
            format_bytes(self.bytes_read, self.total_size),
            format_bytes(self.total_size, self.total_size)
        );
        let elapsed = self.start_time.elapsed();

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{} Rows/s", format_number(rates.rows_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Rows", format_number(self.rows_read)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} MiB/s", rates.mib_per_sec))
                .set_alignment(CellAlignment::Right),
            Cell::new(bytes_progress).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} %/s", rates.percent_per_sec))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}%", self.percent())).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} rejected", format_number(self.rows_rejected)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!(
                "{} elapsed / {} remaining",
                format_duration(elapsed),
                self.remaining(elapsed)
            ))
            .set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar
            .set_message(format!("source: {}\n{}", self.source_name, table));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_numbers_and_durations_are_readable() {
        assert_eq!(format_number(1_234_567), "1,234,567");
        assert_eq!(format_number(12), "12");
        assert_eq!(format_duration(Duration::from_secs(75)), "01:15");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "01:02:05");
    }

    #[test]
    fn the_one_where_byte_units_follow_the_file_size() {
        assert_eq!(format_bytes(512, 1_000), "512 bytes");
        assert_eq!(format_bytes(2_048, 2 * MIB), "2.00 KiB");
        assert_eq!(format_bytes(MIB, 1024 * MIB), "1.00 MiB");
    }

    #[test]
    fn the_one_where_positions_are_absolute_not_deltas() {
        let mut the_metrics = ProgressMetrics::hidden("addresses.csv".into(), 1_000);
        the_metrics.update(250, 10, 1);
        the_metrics.update(500, 20, 2);
        assert_eq!(the_metrics.rows_read, 20);
        assert_eq!(the_metrics.rows_rejected, 2);
        assert_eq!(the_metrics.percent(), 50.0);
        the_metrics.finish();
    }

    #[test]
    fn the_one_where_an_unknown_size_has_no_eta() {
        let the_metrics = ProgressMetrics::hidden("stdin".into(), 0);
        assert_eq!(the_metrics.percent(), 0.0);
        assert_eq!(the_metrics.remaining(Duration::from_secs(10)), "--:--");
    }
}
