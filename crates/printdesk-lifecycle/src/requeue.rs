// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// "Requeue #N" markers in a job's queue notes.

const MARKER: &str = "Requeue #";

/// Number carried by the most recent marker in `notes`, if any.
///
/// A digit run too long for `u64` counts as `u64::MAX`.
pub fn last_requeue(notes: &str) -> Option<u64> {
    notes.lines().rev().find_map(|line| {
        let (_, rest) = line.split_once(MARKER)?;
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        Some(digits.parse().unwrap_or(u64::MAX))
    })
}

/// `notes` with the next marker appended on its own line.
pub fn append_marker(notes: &str) -> String {
    let next = last_requeue(notes).map_or(1, |n| n.saturating_add(1));
    if notes.is_empty() {
        format!("{MARKER}{next}")
    } else {
        format!("{notes}\n{MARKER}{next}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_marker_is_one() {
        assert_eq!(append_marker(""), "Requeue #1");
        assert_eq!(append_marker("nozzle clogged"), "nozzle clogged\nRequeue #1");
    }

    #[test]
    fn continues_from_last_marker() {
        let notes = "Requeue #1\nbed adhesion\nRequeue #2";
        assert_eq!(last_requeue(notes), Some(2));
        assert_eq!(append_marker(notes), format!("{notes}\nRequeue #3"));
    }

    #[test]
    fn later_marker_wins_over_larger_earlier_one() {
        assert_eq!(last_requeue("Requeue #9\nreset by staff\nRequeue #1"), Some(1));
    }

    #[test]
    fn large_marker_keeps_counting_up() {
        let notes = "Requeue #7\nRequeue #4294967296";
        assert_eq!(append_marker(notes), format!("{notes}\nRequeue #4294967297"));
    }

    #[test]
    fn overflowing_marker_saturates() {
        let notes = "Requeue #3\nRequeue #99999999999999999999999";
        assert_eq!(last_requeue(notes), Some(u64::MAX));
        assert!(append_marker(notes).ends_with(&format!("Requeue #{}", u64::MAX)));
    }

    #[test]
    fn marker_without_number_is_ignored() {
        assert_eq!(last_requeue("Requeue #\nRequeue #4 spaghetti"), Some(4));
        assert_eq!(last_requeue("Requeue #x"), None);
    }
}
