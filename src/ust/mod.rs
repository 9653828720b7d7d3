// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Reading and writing UTAU sequence text (UST) project files.
//!
//! Two versions of the format exist. Version 1.2 is always stored in
//! Shift_JIS, version 2.0 in either Shift_JIS or UTF-8. Which one a file uses
//! is determined by trying to decode it as UTF-8 first.

mod charset;
mod grammar;
mod v12;
mod v20;

pub use charset::{decode, detect, encode, Charset};

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;

use crate::note::Ticks;
use crate::song::Song;

/// Schema version of a project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V12,
    V20,
}

impl Version {
    /// The literal text identifying the version in the `[#VERSION]` section.
    pub fn marker(self) -> &'static str {
        match self {
            Version::V12 => "UST Version1.2",
            Version::V20 => "UST Version2.0",
        }
    }
}

/// The combinations of version and encoding a song can be saved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Ust12ShiftJis,
    Ust20ShiftJis,
    Ust20Utf8,
}

impl SaveFormat {
    pub fn new(version: Version, charset: Charset) -> Option<SaveFormat> {
        match (version, charset) {
            (Version::V12, Charset::ShiftJis) => Some(SaveFormat::Ust12ShiftJis),
            (Version::V12, Charset::Utf8) => None,
            (Version::V20, Charset::ShiftJis) => Some(SaveFormat::Ust20ShiftJis),
            (Version::V20, Charset::Utf8) => Some(SaveFormat::Ust20Utf8),
        }
    }

    pub fn version(self) -> Version {
        match self {
            SaveFormat::Ust12ShiftJis => Version::V12,
            SaveFormat::Ust20ShiftJis | SaveFormat::Ust20Utf8 => Version::V20,
        }
    }

    pub fn charset(self) -> Charset {
        match self {
            SaveFormat::Ust12ShiftJis | SaveFormat::Ust20ShiftJis => Charset::ShiftJis,
            SaveFormat::Ust20Utf8 => Charset::Utf8,
        }
    }
}

impl Default for SaveFormat {
    fn default() -> Self {
        SaveFormat::Ust20Utf8
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveFormat::Ust12ShiftJis => write!(f, "1.2"),
            SaveFormat::Ust20ShiftJis => write!(f, "2.0-sjis"),
            SaveFormat::Ust20Utf8 => write!(f, "2.0-utf8"),
        }
    }
}

impl FromStr for SaveFormat {
    type Err = String;

    /// ```
    /// use syn_ust::ust::SaveFormat;
    ///
    /// assert_eq!("1.2".parse(), Ok(SaveFormat::Ust12ShiftJis));
    /// assert_eq!("2.0-utf8".parse(), Ok(SaveFormat::Ust20Utf8));
    /// assert!("1.2-utf8".parse::<SaveFormat>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.2" | "1.2-sjis" => Ok(SaveFormat::Ust12ShiftJis),
            "2.0-sjis" => Ok(SaveFormat::Ust20ShiftJis),
            "2.0" | "2.0-utf8" => Ok(SaveFormat::Ust20Utf8),
            _ => Err(format!(
                "unknown format {:?}, expected one of 1.2, 2.0-sjis, 2.0-utf8",
                s
            )),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ReadError {
    #[snafu(display("could not read {}: {}", path.display(), source))]
    ReadFile { path: PathBuf, source: io::Error },
    #[snafu(display("project is not valid {} text", charset))]
    Undecodable { charset: Charset },
    #[snafu(display("unrecognized project format, no known UST version header"))]
    UnrecognizedFormat,
    #[snafu(display("line {}: {}", line, message))]
    Malformed { line: usize, message: String },
    #[snafu(display("line {}: invalid {} {:?}", line, key, value))]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
    #[snafu(display("line {}: section [#{}] has no {}", line, name, key))]
    MissingField {
        line: usize,
        name: String,
        key: &'static str,
    },
    #[snafu(display("line {}: note section [#{}] is out of order", line, name))]
    OutOfOrder { line: usize, name: String },
}

impl ReadError {
    /// Whether the file could not be accessed at all, as opposed to having unreadable contents.
    pub fn is_io(&self) -> bool {
        matches!(self, ReadError::ReadFile { .. })
    }
}

#[derive(Debug, Snafu)]
pub enum WriteError {
    #[snafu(display("{} contains a line break", field))]
    InvalidText { field: String },
    #[snafu(display("project contains text that can't be represented in {}", charset))]
    Unencodable { charset: Charset },
    #[snafu(display("could not write {}: {}", path.display(), source))]
    WriteFile { path: PathBuf, source: io::Error },
    #[snafu(display("could not write project: {}", source))]
    Io { source: io::Error },
}

/// Parse a project file. The song's save format is the one the file was read in.
pub fn read(bytes: &[u8]) -> Result<Song, ReadError> {
    let charset = detect(bytes);
    if charset == Charset::ShiftJis {
        debug!("project is not UTF-8, reading it as Shift_JIS");
    }
    let text = decode(bytes, charset).ok_or(ReadError::Undecodable { charset })?;
    let version = detect_version(&text).ok_or(ReadError::UnrecognizedFormat)?;

    let mut song = match version {
        Version::V12 if charset == Charset::Utf8 && !bytes.is_ascii() => {
            let text = decode(bytes, Charset::ShiftJis).ok_or(ReadError::Undecodable {
                charset: Charset::ShiftJis,
            })?;
            v12::read(&text)?
        }
        Version::V12 => v12::read(&text)?,
        Version::V20 => v20::read(&text, charset)?,
    };
    song.clear_actions();
    Ok(song)
}

/// Read a project from disk, remembering where it came from.
pub fn load(path: &Path) -> Result<Song, ReadError> {
    let bytes = fs::read(path).context(ReadFile { path })?;
    let mut song = read(&bytes)?;
    info!(
        "loaded {} ({}, {} notes)",
        path.display(),
        song.save_format(),
        song.notes().len()
    );
    song.set_location(path);
    Ok(song)
}

/// Serialize a song in its save format.
pub fn to_bytes(song: &Song) -> Result<Vec<u8>, WriteError> {
    let format = song.save_format();
    let text = match format.version() {
        Version::V12 => v12::write(song)?,
        Version::V20 => v20::write(song)?,
    };
    encode(&text, format.charset()).ok_or(WriteError::Unencodable {
        charset: format.charset(),
    })
}

/// Write a song to a stream. Nothing is written if the song can't be serialized.
pub fn write<W: Write>(song: &Song, out: &mut W) -> Result<(), WriteError> {
    let bytes = to_bytes(song)?;
    out.write_all(&bytes).context(Io)?;
    out.flush().context(Io)
}

/// Save a song to `path`, replacing the file only once the whole project was written.
/// On success the song remembers the location and is no longer dirty.
pub fn save(song: &mut Song, path: &Path) -> Result<(), WriteError> {
    let bytes = to_bytes(song)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).context(WriteFile { path })?;
    file.write_all(&bytes).context(WriteFile { path })?;
    file.persist(path)
        .map_err(|err| err.error)
        .context(WriteFile { path })?;

    info!("saved {} ({})", path.display(), song.save_format());
    song.set_location(path);
    song.mark_saved();
    Ok(())
}

/// Find the version marker in the `[#VERSION]` section.
fn detect_version(text: &str) -> Option<Version> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .skip_while(|line| *line != "[#VERSION]")
        .skip(1)
        .take_while(|line| !line.starts_with("[#"));
    lines.find_map(|line| {
        if line.contains(Version::V20.marker()) {
            Some(Version::V20)
        } else if line.contains(Version::V12.marker()) {
            Some(Version::V12)
        } else {
            None
        }
    })
}

/// Check that a text field fits on a single line.
fn single_line(field: impl FnOnce() -> String, text: &str) -> Result<(), WriteError> {
    if text.contains(|ch: char| ch == '\n' || ch == '\r') {
        Err(WriteError::InvalidText { field: field() })
    } else {
        Ok(())
    }
}

fn lyric_field(position: Ticks) -> impl FnOnce() -> String {
    move || format!("lyric of note at tick {}", position)
}
