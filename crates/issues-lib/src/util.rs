//! ID generation.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Default prefix for generated issue IDs.
pub const DEFAULT_ID_PREFIX: &str = "is";

const MAX_HASH_LEN: usize = 8;
const ATTEMPTS_PER_LEN: u32 = 10;
const FALLBACK_HASH_LEN: usize = 12;
const FALLBACK_ATTEMPTS: u32 = 1000;

/// Generate a unique issue ID with the given prefix.
///
/// The ID is `{prefix}-{hash}` where the hash is a base36 rendering of a
/// SHA256 digest over the issue's identifying fields. Short hashes are tried
/// first; the starting length grows with `issue_count` so collisions stay
/// unlikely. `exists` reports IDs already taken.
pub fn generate_id<F>(
    prefix: &str,
    project: &str,
    title: &str,
    creator: &str,
    created_at: DateTime<Utc>,
    issue_count: usize,
    exists: F,
) -> String
where
    F: Fn(&str) -> bool,
{
    let seed = IdSeed {
        project,
        title,
        creator,
        created_at,
    };
    let candidate = |nonce: u32, length: usize| format!("{prefix}-{}", seed.hash(nonce, length));

    for length in optimal_hash_length(issue_count)..=MAX_HASH_LEN {
        if let Some(id) = (0..ATTEMPTS_PER_LEN)
            .map(|nonce| candidate(nonce, length))
            .find(|id| !exists(id))
        {
            return id;
        }
    }

    (ATTEMPTS_PER_LEN..ATTEMPTS_PER_LEN + FALLBACK_ATTEMPTS)
        .map(|nonce| candidate(nonce, FALLBACK_HASH_LEN))
        .find(|id| !exists(id))
        .unwrap_or_else(|| format!("{}{issue_count}", candidate(u32::MAX, FALLBACK_HASH_LEN)))
}

/// Shortest hash length keeping the birthday-collision odds under 25%.
#[must_use]
#[allow(clippy::cast_precision_loss)]
fn optimal_hash_length(issue_count: usize) -> usize {
    let n = issue_count as f64;
    (5..=MAX_HASH_LEN)
        .find(|&len| {
            let space = 36_f64.powi(i32::try_from(len).unwrap_or(i32::MAX));
            1.0 - (-n * n / (2.0 * space)).exp() < 0.25
        })
        .unwrap_or(MAX_HASH_LEN)
}

struct IdSeed<'a> {
    project: &'a str,
    title: &'a str,
    creator: &'a str,
    created_at: DateTime<Utc>,
}

impl IdSeed<'_> {
    fn hash(&self, nonce: u32, length: usize) -> String {
        let digest = Sha256::new()
            .chain_update(self.project)
            .chain_update([0x1f_u8])
            .chain_update(self.title)
            .chain_update([0x1f_u8])
            .chain_update(self.creator)
            .chain_update([0x1f_u8])
            .chain_update(self.created_at.timestamp_micros().to_be_bytes())
            .chain_update(nonce.to_be_bytes())
            .finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let encoded = base36_encode(u64::from_be_bytes(head));
        format!("{encoded:0>length$}").chars().take(length).collect()
    }
}

fn base36_encode(mut num: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(char::from(DIGITS[usize::try_from(num % 36).unwrap_or(0)]));
        num /= 36;
        if num == 0 {
            break;
        }
    }
    out.into_iter().rev().collect()
}
