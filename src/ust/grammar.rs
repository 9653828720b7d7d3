// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The section grammar shared by all UST versions.
//!
//! A file is a sequence of `[#NAME]` headers, each followed by `key=value`
//! lines. Note sections are numbered and a note starts where the previous
//! section ended; sections with the lyric `R` are rests.

use std::fmt::Display;

use log::debug;

use super::{lyric_field, single_line, ReadError, SaveFormat, Version, WriteError};
use crate::note::{is_rest_lyric, Note, Ticks};
use crate::pianoroll::PianoRoll;
use crate::pitch::Pitch;
use crate::song::{ProjectSettings, Song, DEFAULT_TEMPO};

/// A line inside a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Entry<'a> {
    /// Line number, starting at 1
    pub line: usize,
    /// `None` for lines without `=`.
    pub key: Option<&'a str>,
    pub value: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Section<'a> {
    pub name: &'a str,
    /// Line number of the header
    pub line: usize,
    pub entries: Vec<Entry<'a>>,
}

/// The parts in which the versions differ.
pub(super) trait Dialect {
    /// Handle a note field not shared by all versions.
    /// Returns `false` if the key is unknown.
    fn note_field(&mut self, note: &mut Note, key: &str, entry: &Entry) -> Result<bool, ReadError>;

    /// Called after all fields of a note section were seen, also for rests.
    fn finish_note(&mut self, _note: &mut Note) -> Result<(), ReadError> {
        Ok(())
    }

    /// Emit the fields not shared by all versions.
    fn write_note_fields(&self, note: &Note, out: &mut Lines) -> Result<(), WriteError>;
}

/// Split a file into its sections.
pub(super) fn scan(text: &str) -> Result<Vec<Section<'_>>, ReadError> {
    let mut sections: Vec<Section> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        if let Some(name) = raw
            .trim_end()
            .strip_prefix("[#")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            sections.push(Section {
                name,
                line,
                entries: Vec::new(),
            });
            continue;
        }
        let section = sections.last_mut().ok_or_else(|| ReadError::Malformed {
            line,
            message: "text before the first section".to_string(),
        })?;
        let (key, value) = match raw.find('=') {
            Some(split) => (Some(&raw[..split]), &raw[split + 1..]),
            None => (None, raw),
        };
        section.entries.push(Entry { line, key, value });
    }
    Ok(sections)
}

/// Build a song from the sections of a file.
pub(super) fn read_song<D: Dialect>(
    text: &str,
    format: SaveFormat,
    dialect: &mut D,
) -> Result<Song, ReadError> {
    let sections = scan(text)?;
    let mut settings = ProjectSettings::default();
    let mut tempo = DEFAULT_TEMPO;
    let mut notes = PianoRoll::new();
    let mut position: Ticks = 0;
    let mut last_number: Option<u64> = None;
    let mut track_end: Option<usize> = None;

    for section in sections.iter() {
        match section.name {
            "VERSION" => {}
            "SETTING" => read_settings(section, &mut settings, &mut tempo)?,
            "TRACKEND" => track_end = Some(section.line),
            name if is_note_section(name) => {
                if let Some(end_line) = track_end {
                    return Err(ReadError::Malformed {
                        line: section.line,
                        message: format!("note after the track ended in line {}", end_line),
                    });
                }
                let number = name.parse::<u64>().ok();
                if number.is_none() || number <= last_number {
                    return Err(ReadError::OutOfOrder {
                        line: section.line,
                        name: name.to_string(),
                    });
                }
                last_number = number;

                let (length, note) = read_note(section, position, dialect)?;
                let next = position
                    .checked_add(length)
                    .ok_or_else(|| ReadError::InvalidValue {
                        line: section.line,
                        key: "Length".to_string(),
                        value: length.to_string(),
                    })?;
                if let Some(note) = note {
                    notes.push(note).map_err(|err| ReadError::Malformed {
                        line: section.line,
                        message: err.to_string(),
                    })?;
                }
                position = next;
            }
            name => {
                return Err(ReadError::Malformed {
                    line: section.line,
                    message: format!("unknown section [#{}]", name),
                })
            }
        }
    }

    Ok(Song::from_parts(settings, tempo, notes, format))
}

fn is_note_section(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

fn keyed<'a>(entry: &Entry<'a>) -> Result<&'a str, ReadError> {
    entry.key.ok_or_else(|| ReadError::Malformed {
        line: entry.line,
        message: format!("expected key=value, got {:?}", entry.value),
    })
}

fn read_settings(
    section: &Section,
    settings: &mut ProjectSettings,
    tempo: &mut f64,
) -> Result<(), ReadError> {
    for entry in section.entries.iter() {
        let value = Some(entry.value.to_string());
        match keyed(entry)? {
            "Tempo" => {
                *tempo = parse_number(entry)?;
                if *tempo <= 0.0 {
                    return Err(invalid(entry));
                }
            }
            "ProjectName" => settings.project_name = value,
            "VoiceDir" => settings.voice_dir = value,
            "OutFile" => settings.out_file = value,
            "CacheDir" => settings.cache_dir = value,
            "Tool1" => settings.tool1 = value,
            "Tool2" => settings.tool2 = value,
            "Flags" => settings.flags = value,
            "Mode2" => settings.mode2 = entry.value.trim().eq_ignore_ascii_case("true"),
            // always a single track; the charset is detected from the bytes
            "Tracks" | "Charset" => {}
            key => debug!("line {}: ignoring setting {}", entry.line, key),
        }
    }
    Ok(())
}

/// Read a note section starting at `position`.
/// Returns its length and the note, which is `None` for rests.
fn read_note<D: Dialect>(
    section: &Section,
    position: Ticks,
    dialect: &mut D,
) -> Result<(Ticks, Option<Note>), ReadError> {
    let mut note = Note::new(position, 0, "", Pitch::from_midi(60));
    let mut length = None;
    let mut lyric = None;
    let mut pitch = None;

    for entry in section.entries.iter() {
        match keyed(entry)? {
            "Length" => length = Some(parse_ticks(entry)?),
            "Lyric" => lyric = Some(entry.value),
            "NoteNum" => pitch = Some(parse_pitch(entry)?),
            "PreUtterance" => note.config.preutterance = parse_optional(entry)?,
            "VoiceOverlap" => note.config.overlap = parse_optional(entry)?,
            "Intensity" => note.config.intensity = parse_number(entry)?,
            "Modulation" => note.config.modulation = parse_number(entry)?,
            key => {
                if !dialect.note_field(&mut note, key, entry)? {
                    debug!("line {}: ignoring note field {}", entry.line, key);
                }
            }
        }
    }
    dialect.finish_note(&mut note)?;

    let missing = |key| ReadError::MissingField {
        line: section.line,
        name: section.name.to_string(),
        key,
    };
    let length = length.ok_or_else(|| missing("Length"))?;
    let lyric = lyric.ok_or_else(|| missing("Lyric"))?;
    if is_rest_lyric(lyric) {
        return Ok((length, None));
    }
    note.length = length;
    note.lyric = lyric.to_string();
    note.pitch = pitch.ok_or_else(|| missing("NoteNum"))?;
    Ok((length, Some(note)))
}

// Parsers for single values

pub(super) fn invalid(entry: &Entry) -> ReadError {
    ReadError::InvalidValue {
        line: entry.line,
        key: entry.key.unwrap_or_default().to_string(),
        value: entry.value.to_string(),
    }
}

pub(super) fn parse_number(entry: &Entry) -> Result<f64, ReadError> {
    parse_f64(entry.value).ok_or_else(|| invalid(entry))
}

/// An empty value means the field is unset.
pub(super) fn parse_optional(entry: &Entry) -> Result<Option<f64>, ReadError> {
    if entry.value.trim().is_empty() {
        Ok(None)
    } else {
        parse_number(entry).map(Some)
    }
}

/// Comma separated numbers where empty items are zero.
pub(super) fn parse_list(entry: &Entry) -> Result<Vec<f64>, ReadError> {
    if entry.value.trim().is_empty() {
        return Ok(Vec::new());
    }
    entry
        .value
        .split(',')
        .map(|item| {
            if item.trim().is_empty() {
                Some(0.0)
            } else {
                parse_f64(item)
            }
        })
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| invalid(entry))
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

fn parse_ticks(entry: &Entry) -> Result<Ticks, ReadError> {
    match entry.value.trim().parse::<Ticks>() {
        Ok(ticks) if ticks > 0 => Ok(ticks),
        _ => Err(invalid(entry)),
    }
}

fn parse_pitch(entry: &Entry) -> Result<Pitch, ReadError> {
    entry
        .value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(Pitch::try_from_midi)
        .ok_or_else(|| invalid(entry))
}

// Output

/// CRLF terminated output lines.
#[derive(Debug, Default)]
pub(super) struct Lines(String);

impl Lines {
    pub fn line(&mut self, text: &str) {
        self.0.push_str(text);
        self.0.push_str("\r\n");
    }

    pub fn field(&mut self, key: &str, value: impl Display) {
        self.line(&format!("{}={}", key, value));
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Numbers are written in the shortest form that parses back to the same value.
pub(super) fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn tempo_str(tempo: f64) -> String {
    if tempo.fract() == 0.0 {
        format!("{:.2}", tempo)
    } else {
        tempo.to_string()
    }
}

/// Serialize a song, filling the gaps between notes with rests.
pub(super) fn write_song<D: Dialect>(
    song: &Song,
    version: Version,
    dialect: &D,
) -> Result<String, WriteError> {
    let mut out = Lines::default();
    out.line("[#VERSION]");
    out.line(version.marker());

    out.line("[#SETTING]");
    out.field("Tempo", tempo_str(song.tempo()));
    out.field("Tracks", 1);
    let settings = song.settings();
    let texts = [
        ("ProjectName", &settings.project_name),
        ("VoiceDir", &settings.voice_dir),
        ("OutFile", &settings.out_file),
        ("CacheDir", &settings.cache_dir),
        ("Tool1", &settings.tool1),
        ("Tool2", &settings.tool2),
        ("Flags", &settings.flags),
    ];
    for (key, value) in texts.iter() {
        if let Some(value) = value {
            single_line(|| key.to_string(), value)?;
            out.field(key, value);
        }
    }
    if settings.mode2 {
        out.field("Mode2", "True");
    }

    let mut number = 0;
    let mut position: Ticks = 0;
    for note in song.notes() {
        if note.position > position {
            out.line(&format!("[#{:04}]", number));
            out.field("Length", note.position - position);
            out.field("Lyric", "R");
            out.field("NoteNum", note.pitch.to_midi());
            out.field("PreUtterance", "");
            number += 1;
        }

        single_line(lyric_field(note.position), &note.lyric)?;
        out.line(&format!("[#{:04}]", number));
        out.field("Length", note.length);
        out.field("Lyric", &note.lyric);
        out.field("NoteNum", note.pitch.to_midi());
        out.field("PreUtterance", optional(note.config.preutterance));
        if let Some(overlap) = note.config.overlap {
            out.field("VoiceOverlap", overlap);
        }
        out.field("Intensity", note.config.intensity);
        out.field("Modulation", note.config.modulation);
        dialect.write_note_fields(note, &mut out)?;

        number += 1;
        position = note.end();
    }
    out.line("[#TRACKEND]");
    Ok(out.into_string())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scanning() {
        let sections = scan("[#VERSION]\nUST Version1.2\n\n[#0000]\r\nLyric=a=b\r\n").unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "VERSION");
        assert_eq!(
            sections[0].entries,
            vec![Entry {
                line: 2,
                key: None,
                value: "UST Version1.2"
            }]
        );
        assert_eq!(sections[1].line, 4);
        assert_eq!(
            sections[1].entries,
            vec![Entry {
                line: 5,
                key: Some("Lyric"),
                value: "a=b"
            }]
        );
    }

    #[test]
    fn text_before_sections() {
        assert!(matches!(
            scan("Tempo=120\n[#SETTING]"),
            Err(ReadError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn lists() {
        let entry = Entry {
            line: 1,
            key: Some("PBW"),
            value: "10,,-2.5",
        };
        assert_eq!(parse_list(&entry).unwrap(), vec![10.0, 0.0, -2.5]);
        let entry = Entry {
            line: 1,
            key: Some("PBW"),
            value: "10,x",
        };
        assert!(matches!(
            parse_list(&entry),
            Err(ReadError::InvalidValue { .. })
        ));
        assert_eq!(join(&[10.0, 0.0, -2.5]), "10,0,-2.5");
    }

    #[test]
    fn tempo_formatting() {
        assert_eq!(tempo_str(120.0), "120.00");
        assert_eq!(tempo_str(97.125), "97.125");
    }
}
