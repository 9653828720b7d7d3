// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Pitches of sung notes.

use std::fmt;

/// A pitch is a key on the voicebank's keyboard, stored as its MIDI key number.
/// C4 corresponds to index 60, which is also what UST files store in `NoteNum`.
///
/// Key numbers range from 0 to 127.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pitch(u8);

/// Names used when printing pitches. Black keys are always spelled as sharps.
const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl Pitch {
    pub fn from_midi(key: u8) -> Pitch {
        assert!(key < 128, "MIDI only has keys 0 - 127");
        Pitch(key)
    }

    pub fn try_from_midi(key: i64) -> Option<Pitch> {
        if (0..128).contains(&key) {
            Some(Pitch(key as u8))
        } else {
            None
        }
    }

    pub fn to_midi(self) -> u8 {
        self.0
    }

    /// The pitch in semitones, which is the unit the pitch curve works in.
    pub fn semitones(self) -> f64 {
        self.0 as f64
    }

    /// The octave in standard notation, C4 being the middle C.
    pub fn octave(self) -> i32 {
        self.0 as i32 / 12 - 1
    }
}

impl fmt::Display for Pitch {
    /// ```
    /// # use syn_ust::pitch::*;
    /// assert_eq!(Pitch::from_midi(60).to_string(), "C4");
    /// assert_eq!(Pitch::from_midi(70).to_string(), "A#4");
    /// assert_eq!(Pitch::from_midi(0).to_string(), "C-1");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SHARP_NAMES[(self.0 % 12) as usize], self.octave())
    }
}
