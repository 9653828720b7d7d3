// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Pitch transitions between two points in time.

use std::f64::consts::{FRAC_PI_2, PI};

use snafu::Snafu;

/// The shape of a pitch transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Straight line between the end points.
    Linear,
    /// Slow start and slow finish.
    SCurve,
    /// Fast start, slow finish.
    RCurve,
    /// Slow start, fast finish.
    JCurve,
}

impl Default for CurveKind {
    fn default() -> Self {
        CurveKind::SCurve
    }
}

impl CurveKind {
    /// The code used for this shape in a `PBM` field.
    pub fn code(self) -> &'static str {
        match self {
            CurveKind::SCurve => "",
            CurveKind::Linear => "s",
            CurveKind::RCurve => "r",
            CurveKind::JCurve => "j",
        }
    }

    pub fn from_code(code: &str) -> Option<CurveKind> {
        match code {
            "" => Some(CurveKind::SCurve),
            "s" => Some(CurveKind::Linear),
            "r" => Some(CurveKind::RCurve),
            "j" => Some(CurveKind::JCurve),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Snafu)]
pub enum PortamentoError {
    #[snafu(display("portamento from {} ms to {} ms is empty", start, end))]
    Degenerate { start: f64, end: f64 },
    #[snafu(display(
        "portamento spanning [{} ms, {} ms] evaluated at {} ms",
        start,
        end,
        time
    ))]
    OutOfDomain { time: f64, start: f64, end: f64 },
}

/// The end points of a transition: starting at `y1` semitones at `x1` ms and
/// arriving at `y2` semitones at `x2` ms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Segment {
    /// Fraction of the segment's duration elapsed at `time`, between 0 and 1.
    fn progress(&self, time: f64) -> f64 {
        (time - self.x1) / (self.x2 - self.x1)
    }
}

/// A single pitch transition.
///
/// Every shape is defined on the closed interval `[x1, x2]` of its segment and
/// reports an error for any time outside of it.
///
/// # Examples
///
/// ```
/// use syn_ust::portamento::*;
///
/// let p = Portamento::linear(0.0, 60.0, 1000.0, 72.0).unwrap();
/// assert_eq!(p.apply(500.0), Ok(66.0));
/// assert!(p.apply(1500.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Portamento {
    Linear(Segment),
    SCurve(Segment),
    RCurve(Segment),
    JCurve(Segment),
}

impl Portamento {
    /// Create a portamento of the given shape.
    /// Fails if the segment does not move forward in time.
    pub fn new(
        kind: CurveKind,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    ) -> Result<Portamento, PortamentoError> {
        // also rejects NaN
        if !(x1 < x2) {
            return Err(PortamentoError::Degenerate { start: x1, end: x2 });
        }
        let segment = Segment { x1, y1, x2, y2 };
        Ok(match kind {
            CurveKind::Linear => Portamento::Linear(segment),
            CurveKind::SCurve => Portamento::SCurve(segment),
            CurveKind::RCurve => Portamento::RCurve(segment),
            CurveKind::JCurve => Portamento::JCurve(segment),
        })
    }

    pub fn linear(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Portamento, PortamentoError> {
        Portamento::new(CurveKind::Linear, x1, y1, x2, y2)
    }

    pub fn kind(&self) -> CurveKind {
        match self {
            Portamento::Linear(_) => CurveKind::Linear,
            Portamento::SCurve(_) => CurveKind::SCurve,
            Portamento::RCurve(_) => CurveKind::RCurve,
            Portamento::JCurve(_) => CurveKind::JCurve,
        }
    }

    pub fn segment(&self) -> &Segment {
        match self {
            Portamento::Linear(s)
            | Portamento::SCurve(s)
            | Portamento::RCurve(s)
            | Portamento::JCurve(s) => s,
        }
    }

    /// The pitch in semitones at `time` ms.
    pub fn apply(&self, time: f64) -> Result<f64, PortamentoError> {
        let s = self.segment();
        if !(time >= s.x1 && time <= s.x2) {
            return Err(PortamentoError::OutOfDomain {
                time,
                start: s.x1,
                end: s.x2,
            });
        }
        let rise = s.y2 - s.y1;
        let pitch = match self {
            Portamento::Linear(_) => s.y1 + rise * (time - s.x1) / (s.x2 - s.x1),
            Portamento::SCurve(_) => s.y1 + rise * (1.0 - (PI * s.progress(time)).cos()) / 2.0,
            Portamento::RCurve(_) => s.y1 + rise * (FRAC_PI_2 * s.progress(time)).sin(),
            Portamento::JCurve(_) => s.y1 + rise * (1.0 - (FRAC_PI_2 * s.progress(time)).cos()),
        };
        Ok(pitch)
    }

    pub fn start_pitch(&self) -> f64 {
        self.segment().y1
    }

    pub fn end_pitch(&self) -> f64 {
        self.segment().y2
    }

    pub fn start_time(&self) -> f64 {
        self.segment().x1
    }

    pub fn end_time(&self) -> f64 {
        self.segment().x2
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ALL: [CurveKind; 4] = [
        CurveKind::Linear,
        CurveKind::SCurve,
        CurveKind::RCurve,
        CurveKind::JCurve,
    ];

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn linear() {
        let p = Portamento::linear(0.0, 60.0, 1000.0, 72.0).unwrap();
        assert_eq!(p.apply(500.0), Ok(66.0));
        assert_eq!(p.apply(0.0), Ok(60.0));
        assert_eq!(p.apply(1000.0), Ok(72.0));
        assert_eq!(p.start_pitch(), 60.0);
        assert_eq!(p.end_pitch(), 72.0);
    }

    #[test]
    fn out_of_domain() {
        let p = Portamento::linear(0.0, 60.0, 1000.0, 72.0).unwrap();
        assert_eq!(
            p.apply(1500.0),
            Err(PortamentoError::OutOfDomain {
                time: 1500.0,
                start: 0.0,
                end: 1000.0
            })
        );
        assert!(p.apply(-0.5).is_err());
        assert!(p.apply(f64::NAN).is_err());
    }

    #[test]
    fn degenerate() {
        for kind in ALL.iter() {
            assert_eq!(
                Portamento::new(*kind, 10.0, 60.0, 10.0, 62.0),
                Err(PortamentoError::Degenerate {
                    start: 10.0,
                    end: 10.0
                })
            );
        }
        assert!(Portamento::linear(20.0, 60.0, 10.0, 62.0).is_err());
    }

    #[test]
    fn shapes_meet_end_points() {
        for kind in ALL.iter() {
            let p = Portamento::new(*kind, 100.0, 60.0, 300.0, 64.0).unwrap();
            assert_eq!(p.kind(), *kind);
            assert!(close(p.apply(100.0).unwrap(), 60.0), "{:?}", kind);
            assert!(close(p.apply(300.0).unwrap(), 64.0), "{:?}", kind);
            let mid = p.apply(200.0).unwrap();
            assert!(mid > 60.0 && mid < 64.0, "{:?}", kind);
        }
    }

    #[test]
    fn shape_character() {
        let s = Portamento::new(CurveKind::SCurve, 0.0, 0.0, 100.0, 10.0).unwrap();
        let r = Portamento::new(CurveKind::RCurve, 0.0, 0.0, 100.0, 10.0).unwrap();
        let j = Portamento::new(CurveKind::JCurve, 0.0, 0.0, 100.0, 10.0).unwrap();
        assert!(close(s.apply(50.0).unwrap(), 5.0));
        assert!(r.apply(25.0).unwrap() > 2.5);
        assert!(j.apply(25.0).unwrap() < 2.5);
    }

    #[test]
    fn codes() {
        for kind in ALL.iter() {
            assert_eq!(CurveKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(CurveKind::from_code("x"), None);
    }
}
