// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! UST version 2.0, adding consonant velocity, resampler flags and
//! control-point pitchbends to every note.

use super::grammar::{self, invalid, join, parse_list, parse_number, Dialect, Entry, Lines};
use super::{single_line, Charset, ReadError, SaveFormat, Version, WriteError};
use crate::note::{Note, Pitchbend, Velocity};
use crate::portamento::CurveKind;
use crate::song::Song;

/// Pitchbend fields of the note currently being read.
#[derive(Default)]
struct V20 {
    start: Option<(f64, f64)>,
    widths: Option<Vec<f64>>,
    heights: Vec<f64>,
    shapes: Vec<CurveKind>,
}

impl Dialect for V20 {
    fn note_field(
        &mut self,
        note: &mut Note,
        key: &str,
        entry: &Entry,
    ) -> Result<bool, ReadError> {
        match key {
            "Velocity" => {
                note.config.velocity =
                    Velocity::try_from_f64(parse_number(entry)?).ok_or_else(|| invalid(entry))?;
            }
            "StartPoint" => note.config.start_point = parse_number(entry)?,
            "Flags" => note.config.flags = entry.value.to_string(),
            "PBS" => self.start = Some(parse_start(entry)?),
            "PBW" => self.widths = Some(parse_list(entry)?),
            "PBY" => self.heights = parse_list(entry)?,
            "PBM" => self.shapes = parse_shapes(entry)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn finish_note(&mut self, note: &mut Note) -> Result<(), ReadError> {
        let fields = std::mem::take(self);
        if fields.start.is_none() && fields.widths.is_none() {
            return Ok(());
        }
        let (start_x, start_y) = fields.start.unwrap_or((0.0, 0.0));
        note.pitchbend = Some(Pitchbend::new(
            start_x,
            start_y,
            fields.widths.unwrap_or_default(),
            fields.heights,
            fields.shapes,
        ));
        Ok(())
    }

    fn write_note_fields(&self, note: &Note, out: &mut Lines) -> Result<(), WriteError> {
        out.field("Velocity", note.config.velocity.as_f64());
        out.field("StartPoint", note.config.start_point);
        if !note.config.flags.is_empty() {
            single_line(
                || format!("flags of note at tick {}", note.position),
                &note.config.flags,
            )?;
            out.field("Flags", &note.config.flags);
        }
        if let Some(pitchbend) = &note.pitchbend {
            out.field(
                "PBS",
                format!("{};{}", pitchbend.start_x(), pitchbend.start_y()),
            );
            out.field("PBW", join(pitchbend.widths()));
            out.field("PBY", join(pitchbend.heights()));
            let shapes: Vec<&str> = pitchbend.shapes().iter().map(|s| s.code()).collect();
            out.field("PBM", shapes.join(","));
        }
        Ok(())
    }
}

/// `x;y` or just `x`.
fn parse_start(entry: &Entry) -> Result<(f64, f64), ReadError> {
    let mut parts = entry.value.splitn(2, |ch| ch == ';' || ch == ',');
    let x = parts.next().unwrap_or_default().trim();
    let y = parts.next().map(str::trim).filter(|y| !y.is_empty());
    let parse = |s: &str| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(entry))
    };
    Ok((parse(x)?, y.map(parse).transpose()?.unwrap_or(0.0)))
}

fn parse_shapes(entry: &Entry) -> Result<Vec<CurveKind>, ReadError> {
    if entry.value.is_empty() {
        return Ok(Vec::new());
    }
    entry
        .value
        .split(',')
        .map(|code| CurveKind::from_code(code.trim()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid(entry))
}

pub(super) fn read(text: &str, charset: Charset) -> Result<Song, ReadError> {
    let format = match charset {
        Charset::Utf8 => SaveFormat::Ust20Utf8,
        Charset::ShiftJis => SaveFormat::Ust20ShiftJis,
    };
    grammar::read_song(text, format, &mut V20::default())
}

pub(super) fn write(song: &Song) -> Result<String, WriteError> {
    grammar::write_song(song, Version::V20, &V20::default())
}
