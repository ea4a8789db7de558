//! Unique name resolution
//!
//! Produces a name that does not collide with a set of existing names by
//! bumping a three digit suffix (`SONG_001` → `SONG_002`) or appending
//! `_001` when there is none. Used for folder names, song names and song
//! identifiers alike.

use std::collections::HashSet;

const SUFFIX_DIGITS: usize = 3;

/// Return `desired`, or the first free variant of it.
///
/// ```
/// use core_library::naming::resolve_name;
///
/// assert_eq!(resolve_name("SONG_001", ["SONG_001"]), "SONG_002");
/// assert_eq!(resolve_name("foo", ["foo"]), "foo_001");
/// assert_eq!(resolve_name("bar", ["foo"]), "bar");
/// ```
pub fn resolve_name<'a, I>(desired: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = existing.into_iter().collect();

    let mut candidate = desired.to_string();
    while taken.contains(candidate.as_str()) {
        candidate = next_candidate(&candidate);
    }
    candidate
}

/// Next name in the suffix sequence.
///
/// Every step either grows the string or increases its numeric suffix, so
/// the sequence never repeats.
fn next_candidate(name: &str) -> String {
    match split_suffix(name) {
        Some((stem, number)) => {
            let next = number + 1;
            // 999 rolls over to 1000; the wider suffix is still unique
            format!("{}{:0width$}", stem, next, width = SUFFIX_DIGITS)
        }
        None => format!("{}_{:0width$}", name, 1, width = SUFFIX_DIGITS),
    }
}

/// Split off a trailing run of exactly the last three ASCII digits
fn split_suffix(name: &str) -> Option<(&str, u32)> {
    let bytes = name.as_bytes();
    if bytes.len() < SUFFIX_DIGITS {
        return None;
    }
    let split = bytes.len() - SUFFIX_DIGITS;
    if !bytes[split..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    // the three bytes are ASCII so `split` is a char boundary
    let number = name[split..].parse().ok()?;
    Some((&name[..split], number))
}
