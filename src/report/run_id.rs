use std::sync::atomic::{AtomicU32, Ordering};

use time::OffsetDateTime;

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const TIME_WIDTH: usize = 12;
const TAG_WIDTH: usize = 4;

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Run id for a report started at `started`: `<time>-<pid><seq>`.
///
/// The time part is fixed width, so ids sort by start time.
pub fn run_id(started: OffsetDateTime) -> String {
    let nanos = u128::try_from(started.unix_timestamp_nanos()).unwrap_or(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}{}",
        base62_fixed(nanos, TIME_WIDTH),
        base62_fixed(u128::from(std::process::id()), TAG_WIDTH),
        base62_fixed(u128::from(seq), TAG_WIDTH),
    )
}

/// Lowest `width` base62 digits of `value`, zero padded.
fn base62_fixed(mut value: u128, width: usize) -> String {
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = DIGITS[(value % 62) as usize];
        value /= 62;
    }
    digits.into_iter().map(char::from).collect()
}
