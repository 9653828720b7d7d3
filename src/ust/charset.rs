// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Text encodings of project files.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::SHIFT_JIS;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    /// The legacy Japanese encoding every UTAU version understands.
    ShiftJis,
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Utf8 => write!(f, "UTF-8"),
            Charset::ShiftJis => write!(f, "Shift_JIS"),
        }
    }
}

/// Guess the encoding of a file: UTF-8 if it is strictly valid UTF-8, Shift_JIS otherwise.
///
/// ```
/// use syn_ust::ust::{detect, Charset};
///
/// assert_eq!(detect("Lyric=あ".as_bytes()), Charset::Utf8);
/// assert_eq!(detect(b"Lyric=\x82\xa0"), Charset::ShiftJis);
/// ```
pub fn detect(bytes: &[u8]) -> Charset {
    match std::str::from_utf8(strip_bom(bytes)) {
        Ok(_) => Charset::Utf8,
        Err(_) => Charset::ShiftJis,
    }
}

/// Decode without substituting anything for malformed input.
pub fn decode(bytes: &[u8], charset: Charset) -> Option<Cow<'_, str>> {
    match charset {
        Charset::Utf8 => std::str::from_utf8(strip_bom(bytes)).ok().map(Cow::Borrowed),
        Charset::ShiftJis => SHIFT_JIS.decode_without_bom_handling_and_without_replacement(bytes),
    }
}

/// Encode text, failing if any character has no representation in `charset`.
pub fn encode(text: &str, charset: Charset) -> Option<Vec<u8>> {
    match charset {
        Charset::Utf8 => Some(text.as_bytes().to_vec()),
        Charset::ShiftJis => {
            let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
            if had_errors {
                None
            } else {
                Some(bytes.into_owned())
            }
        }
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    if bytes.starts_with(UTF8_BOM) {
        &bytes[UTF8_BOM.len()..]
    } else {
        bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shift_jis() {
        let bytes = encode("あ", Charset::ShiftJis).unwrap();
        assert_eq!(bytes, b"\x82\xa0");
        assert_eq!(detect(&bytes), Charset::ShiftJis);
        assert_eq!(decode(&bytes, Charset::ShiftJis).as_deref(), Some("あ"));
        assert_eq!(decode(&bytes, Charset::Utf8), None);
    }

    #[test]
    fn bom() {
        let bytes = b"\xEF\xBB\xBFTempo=120";
        assert_eq!(detect(bytes), Charset::Utf8);
        assert_eq!(decode(bytes, Charset::Utf8).as_deref(), Some("Tempo=120"));
    }

    #[test]
    fn unencodable() {
        assert_eq!(encode("🎤", Charset::ShiftJis), None);
        assert_eq!(encode("🎤", Charset::Utf8), Some("🎤".as_bytes().to_vec()));
    }

    #[test]
    fn undecodable() {
        // a lead byte without its trail byte
        assert_eq!(decode(b"\x82", Charset::ShiftJis), None);
    }
}
