// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The continuous pitch of a song over time, derived from its notes.

use log::trace;
use snafu::Snafu;

use crate::note::Note;
use crate::portamento::{CurveKind, Portamento, PortamentoError};
use crate::song::TimeSig;

#[derive(Debug, PartialEq, Snafu)]
pub enum CurveError {
    #[snafu(display("{} ms is outside of the pitch curve [0 ms, {} ms]", time, end))]
    OutOfRange { time: f64, end: f64 },
    #[snafu(display("broken pitch curve: {}", source))]
    BrokenGlide { source: PortamentoError },
    #[snafu(display(
        "sampling {} ms every {} ms takes more than {} samples",
        end,
        step,
        MAX_SAMPLES
    ))]
    TooManySamples { step: f64, end: f64 },
}

/// Upper bound on the length of [`PitchCurve::sample`].
pub const MAX_SAMPLES: u64 = 1_000_000;

/// How default transitions between adjacent notes are shaped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveConfig {
    /// Milliseconds the transition starts before the note boundary.
    pub lead_in_ms: f64,
    /// Milliseconds the transition lasts after the note boundary.
    pub lead_out_ms: f64,
    pub shape: CurveKind,
}

impl Default for CurveConfig {
    fn default() -> Self {
        CurveConfig {
            lead_in_ms: 40.0,
            lead_out_ms: 40.0,
            shape: CurveKind::SCurve,
        }
    }
}

/// What determines the pitch within a piece of the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Constant pitch in semitones.
    Hold(f64),
    Glide(Portamento),
}

/// A part of the curve covering `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Piece {
    pub from: f64,
    pub to: f64,
    pub shape: Shape,
}

impl Piece {
    fn eval(&self, time: f64) -> Result<f64, PortamentoError> {
        match &self.shape {
            Shape::Hold(pitch) => Ok(*pitch),
            Shape::Glide(portamento) => portamento.apply(time),
        }
    }
}

/// Pitch in semitones as a function of time in milliseconds.
///
/// The pieces tile `[0, end]` without gaps or overlaps. Every piece is
/// right-open except the last one, which also covers `end`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitchCurve {
    pieces: Vec<Piece>,
    end: f64,
}

impl PitchCurve {
    /// Derive the curve of a sequence of notes ordered by position.
    pub fn build(notes: &[Note], sig: TimeSig, config: &CurveConfig) -> PitchCurve {
        let last = match notes.last() {
            Some(note) => note,
            None => return PitchCurve::default(),
        };
        let end = sig.ms(last.end());
        let mut curve = PitchCurve {
            pieces: Vec::new(),
            end,
        };

        // Holds at the pitch each part of the timeline belongs to.
        let mut cursor = 0;
        for note in notes {
            let pitch = note.pitch.semitones();
            if cursor < note.position {
                curve.push_hold(sig.ms(cursor), sig.ms(note.position), pitch);
            }
            curve.push_hold(sig.ms(note.position), sig.ms(note.end()), pitch);
            cursor = note.end();
        }

        // Transitions are painted on top, later notes winning.
        let mut prev: Option<&Note> = None;
        for note in notes {
            for glide in transitions(&curve, prev, note, sig, config) {
                trace!(
                    "{:?} glide {:.1}..{:.1} ms",
                    glide.kind(),
                    glide.start_time(),
                    glide.end_time()
                );
                curve.paint(glide);
            }
            prev = Some(note);
        }
        curve
    }

    /// The time of the last note's end, in milliseconds.
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Pitch in semitones at `time` ms.
    pub fn pitch_at(&self, time: f64) -> Result<f64, CurveError> {
        if self.pieces.is_empty() || !(time >= 0.0 && time <= self.end) {
            return Err(CurveError::OutOfRange {
                time,
                end: self.end,
            });
        }
        // index of the first piece starting after `time`; pieces[0].from == 0
        let index = self.pieces.partition_point(|piece| piece.from <= time);
        let piece = &self.pieces[index - 1];
        piece
            .eval(time)
            .map_err(|source| CurveError::BrokenGlide { source })
    }

    /// Sample the curve every `step_ms`, including the end point.
    /// Fails if that takes more than `MAX_SAMPLES` samples.
    pub fn sample(&self, step_ms: f64) -> Result<Vec<(f64, f64)>, CurveError> {
        let mut samples = Vec::new();
        if self.pieces.is_empty() || !(step_ms > 0.0) {
            return Ok(samples);
        }
        // NaN and infinity fail the comparison as well
        if !((self.end / step_ms).ceil() < MAX_SAMPLES as f64) {
            return Err(CurveError::TooManySamples {
                step: step_ms,
                end: self.end,
            });
        }
        let mut i = 0u64;
        loop {
            let time = (i as f64 * step_ms).min(self.end);
            samples.push((time, self.pitch_at(time)?));
            if time >= self.end {
                break;
            }
            i += 1;
        }
        Ok(samples)
    }

    fn push_hold(&mut self, from: f64, to: f64, pitch: f64) {
        if from < to {
            self.pieces.push(Piece {
                from,
                to,
                shape: Shape::Hold(pitch),
            });
        }
    }

    /// Replace everything under the glide's span, clipped to the curve.
    fn paint(&mut self, glide: Portamento) {
        let from = glide.start_time().max(0.0);
        let to = glide.end_time().min(self.end);
        if !(from < to) {
            return;
        }
        let mut pieces = Vec::with_capacity(self.pieces.len() + 2);
        for piece in self.pieces.drain(..) {
            if piece.to <= from || piece.from >= to {
                pieces.push(piece);
                continue;
            }
            if piece.from < from {
                pieces.push(Piece { to: from, ..piece });
            }
            if piece.to > to {
                pieces.push(Piece { from: to, ..piece });
            }
        }
        let at = pieces.partition_point(|piece| piece.from < from);
        pieces.insert(
            at,
            Piece {
                from,
                to,
                shape: Shape::Glide(glide),
            },
        );
        self.pieces = pieces;
    }
}

/// The glides leading into `note`. Default glides start from whatever
/// `curve` sings at their start, so they never jump.
fn transitions(
    curve: &PitchCurve,
    prev: Option<&Note>,
    note: &Note,
    sig: TimeSig,
    config: &CurveConfig,
) -> Vec<Portamento> {
    let start = sig.ms(note.position);
    let pitch = note.pitch.semitones();
    // the pitch sung right before this note, if it is sung at all
    let prev_pitch = prev
        .filter(|p| p.end() == note.position)
        .map(|p| p.pitch.semitones());

    if let Some(pitchbend) = &note.pitchbend {
        let points = pitchbend.points(start, prev_pitch.unwrap_or(pitch), pitch);
        return points
            .windows(2)
            .zip(pitchbend.shapes())
            .filter_map(|(pair, kind)| {
                // zero-width steps are jumps, not glides
                Portamento::new(*kind, pair[0].0, pair[0].1, pair[1].0, pair[1].1).ok()
            })
            .collect();
    }

    match (prev, prev_pitch) {
        (Some(prev), Some(prev_pitch)) if prev_pitch != pitch => {
            let from = (start - config.lead_in_ms).max(sig.ms(prev.position));
            let to = (start + config.lead_out_ms).min(sig.ms(note.end()));
            let from_pitch = curve.pitch_at(from).unwrap_or(prev_pitch);
            Portamento::new(config.shape, from, from_pitch, to, pitch)
                .ok()
                .into_iter()
                .collect()
        }
        _ => Vec::new(),
    }
}
