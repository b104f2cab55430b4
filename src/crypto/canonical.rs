// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical row encoding.
//!
//! Format (UTF-8):
//!
//! ```text
//! first_name|last_name|weight|height|history
//! ```
//!
//! Numbers use the shortest decimal that round-trips to the same `f64` and
//! always carry a fractional part (`70` is written `70.0`). Magnitudes below
//! `1e-4` or from `1e16` up switch to exponent form with an explicit sign and
//! at least two exponent digits (`1e+16`, `2.5e-05`). Age and gender
//! are deliberately not part of the encoding; their tamper evidence comes
//! from the AEAD tag alone.

/// Separator between canonical fields.
pub const FIELD_DELIMITER: char = '|';

/// Encode the signed fields of a record.
pub fn canonicalize(first: &str, last: &str, weight: f64, height: f64, history: &str) -> Vec<u8> {
    format!(
        "{first}{d}{last}{d}{weight}{d}{height}{d}{history}",
        d = FIELD_DELIMITER,
        weight = render_number(weight),
        height = render_number(height),
    )
    .into_bytes()
}

/// Whether any text field contains the delimiter (encoding no longer injective).
pub fn contains_delimiter(fields: &[&str]) -> bool {
    fields.iter().any(|f| f.contains(FIELD_DELIMITER))
}

fn render_number(value: f64) -> String {
    // `Debug` for f64 is the shortest round-trip form and keeps the ".0".
    // It switches to exponent form at the same magnitudes, written `1e16`.
    let shortest = format!("{value:?}");
    let Some((mantissa, exponent)) = shortest.split_once('e') else {
        return shortest;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
