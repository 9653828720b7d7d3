// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Definitions of what a sung note is.

use crate::pitch::Pitch;
use crate::portamento::CurveKind;

/// Time in ticks. A quarter note is `TICKS_PER_BEAT` ticks long.
pub type Ticks = u64;

/// Resolution of the song timeline.
pub const TICKS_PER_BEAT: Ticks = 480;

/// A timed lyric on the piano roll.
///
/// Notes are identified by their position: a song never contains two notes
/// starting at the same tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Start of the note, in ticks from the beginning of the song.
    pub position: Ticks,
    /// Length of the note in ticks, always positive inside a song.
    pub length: Ticks,
    /// The syllable to sing.
    pub lyric: String,
    pub pitch: Pitch,
    pub config: NoteConfig,
    /// Explicit pitch transition into this note, if any.
    pub pitchbend: Option<Pitchbend>,
}

impl Note {
    /// A note with default voice parameters and no explicit pitchbend.
    pub fn new(position: Ticks, length: Ticks, lyric: impl Into<String>, pitch: Pitch) -> Self {
        Note {
            position,
            length,
            lyric: lyric.into(),
            pitch,
            config: NoteConfig::default(),
            pitchbend: None,
        }
    }

    /// The first tick after the note. Notes inside a song always end before `Ticks::MAX`.
    pub fn end(&self) -> Ticks {
        self.position.saturating_add(self.length)
    }

    /// Whether the lyric marks a rest, which files can't store as a note.
    pub fn is_rest(&self) -> bool {
        is_rest_lyric(&self.lyric)
    }
}

pub(crate) fn is_rest_lyric(lyric: &str) -> bool {
    lyric == "R" || lyric == "r"
}

/// Voice parameters of a single note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteConfig {
    /// Milliseconds the note starts singing before its position. Voicebank default if unset.
    pub preutterance: Option<f64>,
    /// Milliseconds of crossfade with the previous note. Voicebank default if unset.
    pub overlap: Option<f64>,
    /// Loudness in percent.
    pub intensity: f64,
    /// How much of the sample's own pitch movement is kept, in percent.
    pub modulation: f64,
    pub velocity: Velocity,
    /// Milliseconds cut from the start of the sample.
    pub start_point: f64,
    /// Resampler flags, passed through verbatim.
    pub flags: String,
}

impl Default for NoteConfig {
    fn default() -> Self {
        NoteConfig {
            preutterance: None,
            overlap: None,
            intensity: 100.0,
            modulation: 0.0,
            velocity: Velocity::DEFAULT,
            start_point: 0.0,
            flags: String::new(),
        }
    }
}

/// The consonant velocity of a note in percent.
/// Values above 100 shorten the consonant, values below stretch it.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Velocity(f64);

impl Velocity {
    pub const MAX: Velocity = Velocity(200.0);
    pub const MIN: Velocity = Velocity(0.0);
    pub const DEFAULT: Velocity = Velocity(100.0);

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Convert a percentage in the interval [0, 200] to a velocity.
    ///
    /// # Examples
    ///
    /// ```
    /// use syn_ust::note::*;
    ///
    /// assert_eq!(Velocity::try_from_f64(200.0), Some(Velocity::MAX));
    /// assert_eq!(Velocity::try_from_f64(250.0), None);
    /// assert_eq!(Velocity::try_from_f64(f64::NAN), None);
    /// ```
    pub fn try_from_f64(velocity: f64) -> Option<Velocity> {
        if velocity.is_nan() || velocity < Self::MIN.0 || velocity > Self::MAX.0 {
            return None;
        }
        Some(Velocity(velocity))
    }
}

/// Control points of a pitch transition ("Mode2" pitchbend).
///
/// The first point lies `start_x` milliseconds after the note position (usually
/// negative) at `start_y` tenths of a semitone above the preceding pitch. Each
/// width advances to the next point; the heights of the intermediate points are
/// in tenths of a semitone relative to the note's own pitch, and the last point
/// always returns to the note pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Pitchbend {
    start_x: f64,
    start_y: f64,
    widths: Vec<f64>,
    heights: Vec<f64>,
    shapes: Vec<CurveKind>,
}

impl Pitchbend {
    /// Build a pitchbend, padding or cutting `heights` to one fewer than
    /// `widths` and `shapes` to as many as `widths`.
    ///
    /// ```
    /// use syn_ust::note::Pitchbend;
    /// use syn_ust::portamento::CurveKind;
    ///
    /// let pb = Pitchbend::new(-40.0, 0.0, vec![60.0, 20.0], vec![], vec![CurveKind::Linear]);
    /// assert_eq!(pb.heights(), &[0.0]);
    /// assert_eq!(pb.shapes(), &[CurveKind::Linear, CurveKind::SCurve]);
    /// ```
    pub fn new(
        start_x: f64,
        start_y: f64,
        widths: Vec<f64>,
        mut heights: Vec<f64>,
        mut shapes: Vec<CurveKind>,
    ) -> Self {
        heights.resize(widths.len().saturating_sub(1), 0.0);
        shapes.resize(widths.len(), CurveKind::default());
        Pitchbend {
            start_x,
            start_y,
            widths,
            heights,
            shapes,
        }
    }

    pub fn start_x(&self) -> f64 {
        self.start_x
    }

    pub fn start_y(&self) -> f64 {
        self.start_y
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn shapes(&self) -> &[CurveKind] {
        &self.shapes
    }

    /// Absolute control points `(ms, semitones)` for a note starting at `note_start_ms`.
    ///
    /// ```
    /// use syn_ust::note::Pitchbend;
    ///
    /// let pb = Pitchbend::new(-50.0, 0.0, vec![100.0], vec![], vec![]);
    /// assert_eq!(pb.points(1000.0, 60.0, 62.0), vec![(950.0, 60.0), (1050.0, 62.0)]);
    /// ```
    pub fn points(&self, note_start_ms: f64, prev_pitch: f64, pitch: f64) -> Vec<(f64, f64)> {
        let mut x = note_start_ms + self.start_x;
        let mut points = vec![(x, prev_pitch + self.start_y / 10.0)];
        for (i, width) in self.widths.iter().enumerate() {
            x += width;
            let height = self.heights.get(i).copied().unwrap_or(0.0);
            points.push((x, pitch + height / 10.0));
        }
        points
    }
}
