//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a byte progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

/// Percentage of space saved going from `original` to `compressed` bytes.
pub fn space_savings(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}

/// Parse a byte size such as `4096`, `64K`, `16M` or `1G`.
pub fn parse_size(text: &str) -> Result<usize, String> {
    let text = text.trim();
    let (digits, multiplier) = match text.char_indices().last() {
        Some((index, 'k' | 'K')) => (&text[..index], 1024),
        Some((index, 'm' | 'M')) => (&text[..index], 1024 * 1024),
        Some((index, 'g' | 'G')) => (&text[..index], 1024 * 1024 * 1024),
        _ => (text, 1),
    };
    let value: usize = digits
        .parse()
        .map_err(|_| format!("invalid size: {text}"))?;
    let size = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size out of range: {text}"))?;
    if size == 0 {
        return Err("size must be greater than zero".to_string());
    }
    Ok(size)
}
