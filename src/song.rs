// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! A singing synthesis project: notes, project settings and where it is stored.

use std::path::{Path, PathBuf};

use crate::curve::{CurveConfig, CurveError, PitchCurve};
use crate::history::CommandHistory;
use crate::note::{Note, Ticks, TICKS_PER_BEAT};
use crate::pianoroll::{Change, NoteError, PianoRoll};
use crate::ust::SaveFormat;

/// Tempo used by new songs and by files that don't specify one.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// The tempo of the song, needed for converting ticks to time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeSig {
    /// How many quarter notes per minute.
    pub beats_per_minute: f64,
}

impl TimeSig {
    pub fn ms(&self, ticks: Ticks) -> f64 {
        ticks as f64 * 60_000.0 / (self.beats_per_minute * TICKS_PER_BEAT as f64)
    }
}

/// Project-wide settings as stored in the `[#SETTING]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectSettings {
    pub project_name: Option<String>,
    /// The voicebank singing this song.
    pub voice_dir: Option<String>,
    pub out_file: Option<String>,
    pub cache_dir: Option<String>,
    /// The concatenation tool.
    pub tool1: Option<String>,
    /// The resampler.
    pub tool2: Option<String>,
    /// Resampler flags applied to every note.
    pub flags: Option<String>,
    /// Whether notes use control-point pitchbends.
    pub mode2: bool,
}

/// What changed around a note besides the note itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteResponse {
    /// Notes shortened to avoid overlaps, in their new form.
    pub truncated: Vec<Note>,
    /// The note before the edited position, whose transition may have changed.
    pub prev: Option<Note>,
    /// The note after the edited position.
    pub next: Option<Note>,
}

/// A complete song.
///
/// Notes can only be changed through `add_note`, `remove_note` and
/// `modify_note`, which record the edit for undo and update the pitch curve
/// before returning.
#[derive(Debug, Clone)]
pub struct Song {
    settings: ProjectSettings,
    sig: TimeSig,
    notes: PianoRoll,
    curve: PitchCurve,
    curve_config: CurveConfig,
    location: Option<PathBuf>,
    save_format: SaveFormat,
    history: CommandHistory,
}

impl Song {
    /// An empty, unsaved song.
    pub fn new() -> Self {
        Song::from_parts(
            ProjectSettings::default(),
            DEFAULT_TEMPO,
            PianoRoll::new(),
            SaveFormat::default(),
        )
    }

    pub(crate) fn from_parts(
        settings: ProjectSettings,
        tempo: f64,
        notes: PianoRoll,
        save_format: SaveFormat,
    ) -> Self {
        let mut song = Song {
            settings,
            sig: TimeSig {
                beats_per_minute: tempo,
            },
            notes,
            curve: PitchCurve::default(),
            curve_config: CurveConfig::default(),
            location: None,
            save_format,
            history: CommandHistory::new(),
        };
        song.rederive();
        song
    }

    // ==================== Metadata ====================

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn voicebank(&self) -> Option<&str> {
        self.settings.voice_dir.as_deref()
    }

    pub fn tempo(&self) -> f64 {
        self.sig.beats_per_minute
    }

    pub fn time_sig(&self) -> TimeSig {
        self.sig
    }

    pub fn has_permanent_location(&self) -> bool {
        self.location.is_some()
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, location: impl Into<PathBuf>) {
        self.location = Some(location.into());
    }

    pub fn save_format(&self) -> SaveFormat {
        self.save_format
    }

    pub fn set_save_format(&mut self, format: SaveFormat) {
        self.save_format = format;
    }

    // ==================== Notes ====================

    /// All notes in the order they are sung.
    pub fn notes(&self) -> &[Note] {
        self.notes.as_slice()
    }

    pub fn note_at(&self, position: Ticks) -> Option<&Note> {
        self.notes.get(position)
    }

    /// The end of the last note, in ticks.
    pub fn length(&self) -> Ticks {
        self.notes.length()
    }

    /// Insert a note. Fails with `NoteError::AlreadyExists` without touching
    /// the song if a note starts at the same position.
    pub fn add_note(&mut self, note: Note) -> Result<NoteResponse, NoteError> {
        let position = note.position;
        let change = self.notes.add(note)?;
        Ok(self.commit(position, change))
    }

    /// Remove the note at `position`. Removing nothing is not an error.
    pub fn remove_note(&mut self, position: Ticks) -> NoteResponse {
        let change = self.notes.remove(position);
        self.commit(position, change)
    }

    /// Replace the note starting at the same position as `note`.
    pub fn modify_note(&mut self, note: Note) -> Result<NoteResponse, NoteError> {
        let position = note.position;
        let change = self.notes.modify(note)?;
        Ok(self.commit(position, change))
    }

    fn commit(&mut self, position: Ticks, change: Change) -> NoteResponse {
        if change.is_empty() {
            return NoteResponse::default();
        }
        let (prev, next) = self.notes.neighbors(position);
        let response = NoteResponse {
            truncated: change.truncated.clone(),
            prev: prev.cloned(),
            next: next.cloned(),
        };
        self.history.record(change);
        self.rederive();
        response
    }

    // ==================== History ====================

    /// Revert the last edit. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(change) => {
                self.notes.replace(&change.after, &change.before);
                self.rederive();
                true
            }
            None => false,
        }
    }

    /// Apply the last undone edit again. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(change) => {
                self.notes.replace(&change.before, &change.after);
                self.rederive();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Whether the song changed since it was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    pub fn clear_actions(&mut self) {
        self.history.clear_actions();
    }

    // ==================== Pitch ====================

    pub fn pitch_curve(&self) -> &PitchCurve {
        &self.curve
    }

    /// Pitch in semitones at `time` ms after the start of the song.
    pub fn pitch_at(&self, time: f64) -> Result<f64, CurveError> {
        self.curve.pitch_at(time)
    }

    pub fn curve_config(&self) -> &CurveConfig {
        &self.curve_config
    }

    pub fn set_curve_config(&mut self, config: CurveConfig) {
        self.curve_config = config;
        self.rederive();
    }

    fn rederive(&mut self) {
        self.curve = PitchCurve::build(self.notes.as_slice(), self.sig, &self.curve_config);
    }
}

impl Default for Song {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pitch::Pitch;

    fn note(position: Ticks, length: Ticks, key: u8) -> Note {
        Note::new(position, length, "la", Pitch::from_midi(key))
    }

    #[test]
    fn time_sig() {
        let sig = TimeSig {
            beats_per_minute: 120.0,
        };
        assert_eq!(sig.ms(480), 500.0);
        assert_eq!(sig.ms(0), 0.0);
    }

    #[test]
    fn add_conflict_leaves_song_untouched() {
        let mut song = Song::new();
        song.add_note(note(0, 480, 60)).unwrap();
        song.mark_saved();
        assert_eq!(
            song.add_note(note(0, 240, 62)),
            Err(NoteError::AlreadyExists { position: 0 })
        );
        assert_eq!(song.notes(), &[note(0, 480, 60)]);
        assert!(!song.is_dirty());
    }

    #[test]
    fn responses_report_neighbors() {
        let mut song = Song::new();
        song.add_note(note(0, 960, 60)).unwrap();
        song.add_note(note(960, 480, 64)).unwrap();
        let response = song.add_note(note(480, 480, 62)).unwrap();
        assert_eq!(response.truncated, vec![note(0, 480, 60)]);
        assert_eq!(response.prev, Some(note(0, 480, 60)));
        assert_eq!(response.next, Some(note(960, 480, 64)));

        let response = song.remove_note(480);
        assert_eq!(response.prev, Some(note(0, 480, 60)));
        assert_eq!(response.next, Some(note(960, 480, 64)));
        assert!(response.truncated.is_empty());
    }

    #[test]
    fn invalid_notes_leave_song_untouched() {
        let mut song = Song::new();
        assert_eq!(
            song.add_note(note(10, Ticks::MAX, 60)),
            Err(NoteError::TooLong { position: 10 })
        );
        let mut rest = note(0, 480, 60);
        rest.lyric = "R".to_string();
        assert!(song.add_note(rest).is_err());
        assert!(song.notes().is_empty());
        assert!(!song.is_dirty());
    }

    #[test]
    fn modify_without_difference_is_not_an_edit() {
        let mut song = Song::new();
        song.add_note(note(0, 480, 60)).unwrap();
        song.mark_saved();
        assert_eq!(
            song.modify_note(note(0, 480, 60)),
            Ok(NoteResponse::default())
        );
        assert!(!song.is_dirty());
        assert!(song.undo());
        assert!(song.notes().is_empty());
    }

    #[test]
    fn removing_nothing() {
        let mut song = Song::new();
        song.add_note(note(0, 480, 60)).unwrap();
        song.mark_saved();
        assert_eq!(song.remove_note(100), NoteResponse::default());
        assert_eq!(song.notes().len(), 1);
        assert!(!song.is_dirty());
    }

    #[test]
    fn undo_redo() {
        let mut song = Song::new();
        song.add_note(note(0, 960, 60)).unwrap();
        song.add_note(note(480, 480, 62)).unwrap();
        assert_eq!(song.notes(), &[note(0, 480, 60), note(480, 480, 62)]);

        assert!(song.undo());
        assert_eq!(song.notes(), &[note(0, 960, 60)]);
        assert!(song.undo());
        assert!(song.notes().is_empty());
        assert!(!song.is_dirty());
        assert!(!song.undo());

        assert!(song.redo());
        assert!(song.redo());
        assert_eq!(song.notes(), &[note(0, 480, 60), note(480, 480, 62)]);
        assert!(!song.redo());
        assert!(song.is_dirty());
    }

    #[test]
    fn curve_follows_edits() {
        let mut song = Song::new();
        assert!(song.pitch_at(0.0).is_err());
        song.add_note(note(0, 480, 60)).unwrap();
        assert_eq!(song.pitch_at(250.0), Ok(60.0));
        let mut higher = note(0, 480, 67);
        higher.lyric = "lo".to_string();
        song.modify_note(higher).unwrap();
        assert_eq!(song.pitch_at(250.0), Ok(67.0));
        song.undo();
        assert_eq!(song.pitch_at(250.0), Ok(60.0));
        assert_eq!(song.pitch_curve().end(), 500.0);
    }

    #[test]
    fn location() {
        let mut song = Song::new();
        assert!(!song.has_permanent_location());
        song.set_location("/tmp/song.ust");
        assert_eq!(song.location(), Some(Path::new("/tmp/song.ust")));
        song.set_save_format(SaveFormat::Ust12ShiftJis);
        assert_eq!(song.save_format(), SaveFormat::Ust12ShiftJis);
    }
}
