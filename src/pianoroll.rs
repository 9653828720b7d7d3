// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Ordered storage of the notes of a song.

use snafu::Snafu;

use crate::note::{Note, Ticks};

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum NoteError {
    #[snafu(display("there already is a note at tick {}", position))]
    AlreadyExists { position: Ticks },
    #[snafu(display("there is no note at tick {}", position))]
    NotFound { position: Ticks },
    #[snafu(display("note at tick {} has no length", position))]
    InvalidLength { position: Ticks },
    #[snafu(display("note at tick {} overlaps the note before it", position))]
    Overlaps { position: Ticks },
    #[snafu(display("note at tick {} ends after the last representable tick", position))]
    TooLong { position: Ticks },
    #[snafu(display("note at tick {} has the rest lyric {:?}", position, lyric))]
    RestLyric { position: Ticks, lyric: String },
}

/// The notes touched by a single edit, as they were before and after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Change {
    pub before: Vec<Note>,
    pub after: Vec<Note>,
    /// Notes that were shortened to keep the roll free of overlaps, in their new form.
    pub truncated: Vec<Note>,
}

impl Change {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// A piano roll is a sequence of notes ordered by position where no two notes overlap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PianoRoll {
    notes: Vec<Note>,
}

impl PianoRoll {
    pub fn new() -> Self {
        PianoRoll { notes: Vec::new() }
    }

    fn find(&self, position: Ticks) -> Result<usize, usize> {
        self.notes.binary_search_by_key(&position, |note| note.position)
    }

    /// Reject notes no edit may put on the roll.
    fn check(note: &Note) -> Result<(), NoteError> {
        let position = note.position;
        if note.length == 0 {
            return Err(NoteError::InvalidLength { position });
        }
        if position.checked_add(note.length).is_none() {
            return Err(NoteError::TooLong { position });
        }
        if note.is_rest() {
            return Err(NoteError::RestLyric {
                position,
                lyric: note.lyric.clone(),
            });
        }
        Ok(())
    }

    /// Append a note after all existing notes. Used when reading a song front to back.
    pub fn push(&mut self, note: Note) -> Result<(), NoteError> {
        Self::check(&note)?;
        if note.position < self.length() {
            return Err(NoteError::Overlaps {
                position: note.position,
            });
        }
        self.notes.push(note);
        Ok(())
    }

    /// Insert a note, shortening the note before it if that one reaches into
    /// the new note, and shortening the new note so it ends where the next begins.
    pub fn add(&mut self, mut note: Note) -> Result<Change, NoteError> {
        Self::check(&note)?;
        let index = match self.find(note.position) {
            Ok(_) => {
                return Err(NoteError::AlreadyExists {
                    position: note.position,
                })
            }
            Err(index) => index,
        };

        let mut change = Change::default();
        if index > 0 {
            let prev = &mut self.notes[index - 1];
            if prev.end() > note.position {
                change.before.push(prev.clone());
                prev.length = note.position - prev.position;
                change.after.push(prev.clone());
                change.truncated.push(prev.clone());
            }
        }
        if let Some(next) = self.notes.get(index) {
            if note.end() > next.position {
                note.length = next.position - note.position;
                change.truncated.push(note.clone());
            }
        }
        change.after.push(note.clone());
        self.notes.insert(index, note);
        Ok(change)
    }

    /// Remove the note at `position`. Nothing changes if there is none.
    pub fn remove(&mut self, position: Ticks) -> Change {
        match self.find(position) {
            Ok(index) => Change {
                before: vec![self.notes.remove(index)],
                ..Change::default()
            },
            Err(_) => Change::default(),
        }
    }

    /// Replace the note at the new note's position, shortening it to end where the next begins.
    pub fn modify(&mut self, mut note: Note) -> Result<Change, NoteError> {
        Self::check(&note)?;
        let index = self.find(note.position).map_err(|_| NoteError::NotFound {
            position: note.position,
        })?;

        let mut change = Change::default();
        if let Some(next) = self.notes.get(index + 1) {
            if note.end() > next.position {
                note.length = next.position - note.position;
                change.truncated.push(note.clone());
            }
        }
        if self.notes[index] == note {
            return Ok(Change::default());
        }
        change.before.push(std::mem::replace(&mut self.notes[index], note.clone()));
        change.after.push(note);
        Ok(change)
    }

    /// Remove the notes at the positions of `remove`, then put `insert` in place.
    /// Used for replaying recorded changes, which are free of overlaps by construction.
    pub(crate) fn replace(&mut self, remove: &[Note], insert: &[Note]) {
        for note in remove {
            if let Ok(index) = self.find(note.position) {
                self.notes.remove(index);
            }
        }
        for note in insert {
            match self.find(note.position) {
                Ok(index) => self.notes[index] = note.clone(),
                Err(index) => self.notes.insert(index, note.clone()),
            }
        }
    }

    pub fn get(&self, position: Ticks) -> Option<&Note> {
        self.find(position).ok().map(|index| &self.notes[index])
    }

    /// The closest notes strictly before and strictly after `position`.
    pub fn neighbors(&self, position: Ticks) -> (Option<&Note>, Option<&Note>) {
        let (before_end, after_start) = match self.find(position) {
            Ok(index) => (index, index + 1),
            Err(index) => (index, index),
        };
        let prev = before_end.checked_sub(1).map(|index| &self.notes[index]);
        (prev, self.notes.get(after_start))
    }

    /// Iterate all notes on this piano roll in the order they are sung.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// The end of the last note.
    pub fn length(&self) -> Ticks {
        self.notes.last().map_or(0, Note::end)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pitch::Pitch;

    fn note(position: Ticks, length: Ticks) -> Note {
        Note::new(position, length, "a", Pitch::from_midi(60))
    }

    fn spans(roll: &PianoRoll) -> Vec<(Ticks, Ticks)> {
        roll.iter().map(|n| (n.position, n.length)).collect()
    }

    fn assert_ordered(roll: &PianoRoll) {
        for pair in roll.as_slice().windows(2) {
            assert!(pair[0].end() <= pair[1].position, "{:?}", spans(roll));
        }
    }

    #[test]
    fn add_in_any_order() {
        let mut roll = PianoRoll::new();
        roll.add(note(960, 480)).unwrap();
        roll.add(note(0, 480)).unwrap();
        roll.add(note(480, 480)).unwrap();
        assert_eq!(spans(&roll), vec![(0, 480), (480, 480), (960, 480)]);
        assert_eq!(roll.length(), 1440);
    }

    #[test]
    fn add_conflict() {
        let mut roll = PianoRoll::new();
        roll.add(note(480, 480)).unwrap();
        let before = roll.clone();
        assert_eq!(
            roll.add(note(480, 240)),
            Err(NoteError::AlreadyExists { position: 480 })
        );
        assert_eq!(roll, before);
    }

    #[test]
    fn add_truncates_neighbors() {
        let mut roll = PianoRoll::new();
        roll.add(note(0, 960)).unwrap();
        roll.add(note(960, 480)).unwrap();
        let change = roll.add(note(480, 960)).unwrap();
        assert_eq!(spans(&roll), vec![(0, 480), (480, 480), (960, 480)]);
        assert_eq!(change.before, vec![note(0, 960)]);
        assert_eq!(change.after, vec![note(0, 480), note(480, 480)]);
        assert_eq!(change.truncated, vec![note(0, 480), note(480, 480)]);
        assert_ordered(&roll);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut roll = PianoRoll::new();
        roll.add(note(0, 480)).unwrap();
        assert_eq!(roll.remove(240), Change::default());
        assert_eq!(roll.len(), 1);
        assert_eq!(roll.remove(0).before, vec![note(0, 480)]);
        assert!(roll.remove(0).is_empty());
        assert!(roll.is_empty());
    }

    #[test]
    fn modify() {
        let mut roll = PianoRoll::new();
        roll.add(note(0, 480)).unwrap();
        roll.add(note(480, 480)).unwrap();
        let mut longer = note(0, 960);
        longer.lyric = "ka".to_string();
        let change = roll.modify(longer).unwrap();
        assert_eq!(change.truncated.len(), 1);
        assert_eq!(roll.get(0).unwrap().length, 480);
        assert_eq!(roll.get(0).unwrap().lyric, "ka");
        assert_eq!(
            roll.modify(note(100, 10)),
            Err(NoteError::NotFound { position: 100 })
        );
        assert_eq!(
            roll.modify(note(0, 0)),
            Err(NoteError::InvalidLength { position: 0 })
        );
    }

    #[test]
    fn neighbors() {
        let mut roll = PianoRoll::new();
        roll.add(note(0, 100)).unwrap();
        roll.add(note(200, 100)).unwrap();
        let (prev, next) = roll.neighbors(200);
        assert_eq!(prev.map(|n| n.position), Some(0));
        assert_eq!(next, None);
        let (prev, next) = roll.neighbors(150);
        assert_eq!(prev.map(|n| n.position), Some(0));
        assert_eq!(next.map(|n| n.position), Some(200));
    }

    #[test]
    fn push_rejects_overlap() {
        let mut roll = PianoRoll::new();
        roll.push(note(0, 480)).unwrap();
        assert_eq!(
            roll.push(note(240, 480)),
            Err(NoteError::Overlaps { position: 240 })
        );
        roll.push(note(480, 480)).unwrap();
    }

    #[test]
    fn notes_past_the_last_tick() {
        let mut roll = PianoRoll::new();
        assert_eq!(
            roll.add(note(10, Ticks::MAX)),
            Err(NoteError::TooLong { position: 10 })
        );
        assert_eq!(
            roll.push(note(10, Ticks::MAX)),
            Err(NoteError::TooLong { position: 10 })
        );
        roll.add(note(0, 480)).unwrap();
        assert_eq!(
            roll.modify(note(0, Ticks::MAX)),
            Err(NoteError::TooLong { position: 0 })
        );
        assert_eq!(spans(&roll), vec![(0, 480)]);
        // the largest note that still fits
        roll.add(note(480, Ticks::MAX - 480)).unwrap();
        assert_eq!(roll.length(), Ticks::MAX);
    }

    #[test]
    fn rest_lyrics_are_rejected() {
        let mut roll = PianoRoll::new();
        let mut rest = note(0, 480);
        rest.lyric = "R".to_string();
        assert!(matches!(
            roll.add(rest.clone()),
            Err(NoteError::RestLyric { position: 0, .. })
        ));
        roll.add(note(0, 480)).unwrap();
        rest.lyric = "r".to_string();
        assert!(matches!(
            roll.modify(rest),
            Err(NoteError::RestLyric { .. })
        ));
        assert_eq!(roll.get(0).unwrap().lyric, "a");
    }

    #[test]
    fn modify_without_difference() {
        let mut roll = PianoRoll::new();
        roll.add(note(0, 480)).unwrap();
        roll.add(note(480, 480)).unwrap();
        assert!(roll.modify(note(0, 480)).unwrap().is_empty());
        // truncated back to what is already there
        assert!(roll.modify(note(0, 960)).unwrap().is_empty());
    }

    #[test]
    fn non_overlap_under_random_edits() {
        // a fixed pseudo-random walk over add/remove/modify
        let mut roll = PianoRoll::new();
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..2000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let position = (state % 64) * 60;
            let length = (state >> 8) % 500 + 1;
            let _ = match (state >> 20) % 3 {
                0 => roll.add(note(position, length)).map(|_| ()),
                1 => {
                    roll.remove(position);
                    Ok(())
                }
                _ => roll.modify(note(position, length)).map(|_| ()),
            };
            assert_ordered(&roll);
        }
    }
}
