// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! UST version 1.2, which only knows the fields shared by all versions.

use log::debug;

use super::grammar::{self, Dialect, Entry, Lines};
use super::{ReadError, SaveFormat, Version, WriteError};
use crate::note::Note;
use crate::song::Song;

struct V12;

impl Dialect for V12 {
    fn note_field(
        &mut self,
        _note: &mut Note,
        _key: &str,
        _entry: &Entry,
    ) -> Result<bool, ReadError> {
        Ok(false)
    }

    fn write_note_fields(&self, note: &Note, _out: &mut Lines) -> Result<(), WriteError> {
        if note.pitchbend.is_some() {
            debug!("dropping pitchbend of note at tick {}", note.position);
        }
        Ok(())
    }
}

pub(super) fn read(text: &str) -> Result<Song, ReadError> {
    grammar::read_song(text, SaveFormat::Ust12ShiftJis, &mut V12)
}

pub(super) fn write(song: &Song) -> Result<String, WriteError> {
    grammar::write_song(song, Version::V12, &V12)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pitch::Pitch;
    use expect_test::expect;

    const SONG: &str = "[#VERSION]
UST Version1.2
[#SETTING]
Tempo=120.00
Tracks=1
ProjectName=test
VoiceDir=%VOICE%uta
Tool1=wavtool.exe
Tool2=resampler.exe
[#0000]
Length=480
Lyric=a
NoteNum=60
PreUtterance=
Intensity=100
Modulation=0
[#0001]
Length=240
Lyric=R
NoteNum=60
PreUtterance=
[#0002]
Length=960
Lyric=ka
NoteNum=67
PreUtterance=25
VoiceOverlap=5
Intensity=80
Modulation=100
Velocity=150
[#TRACKEND]
";

    #[test]
    fn reading() {
        let song = read(SONG).unwrap();
        assert_eq!(song.tempo(), 120.0);
        assert_eq!(song.settings().tool2.as_deref(), Some("resampler.exe"));
        let notes = song.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0], Note::new(0, 480, "a", Pitch::from_midi(60)));
        let ka = &notes[1];
        assert_eq!((ka.position, ka.length), (720, 960));
        assert_eq!(ka.pitch, Pitch::from_midi(67));
        assert_eq!(ka.config.preutterance, Some(25.0));
        assert_eq!(ka.config.overlap, Some(5.0));
        assert_eq!(ka.config.intensity, 80.0);
        assert_eq!(ka.config.modulation, 100.0);
        // not part of this version
        assert_eq!(ka.config.velocity.as_f64(), 100.0);
    }

    #[test]
    fn writing() {
        let song = read(SONG).unwrap();
        let text = write(&song).unwrap().replace("\r\n", "\n");
        expect![[r#"
            [#VERSION]
            UST Version1.2
            [#SETTING]
            Tempo=120.00
            Tracks=1
            ProjectName=test
            VoiceDir=%VOICE%uta
            Tool1=wavtool.exe
            Tool2=resampler.exe
            [#0000]
            Length=480
            Lyric=a
            NoteNum=60
            PreUtterance=
            Intensity=100
            Modulation=0
            [#0001]
            Length=240
            Lyric=R
            NoteNum=67
            PreUtterance=
            [#0002]
            Length=960
            Lyric=ka
            NoteNum=67
            PreUtterance=25
            VoiceOverlap=5
            Intensity=80
            Modulation=100
            [#TRACKEND]
        "#]]
        .assert_eq(&text);
    }

    #[test]
    fn malformed_notes() {
        let missing_length = SONG.replace("Length=960\n", "");
        assert!(matches!(
            read(&missing_length),
            Err(ReadError::MissingField { key: "Length", .. })
        ));

        let zero_length = SONG.replace("Length=960", "Length=0");
        assert!(matches!(
            read(&zero_length),
            Err(ReadError::InvalidValue { line: 23, .. })
        ));

        let endless = SONG.replace("Length=960", "Length=18446744073709551615");
        assert!(matches!(
            read(&endless),
            Err(ReadError::InvalidValue { line: 22, .. })
        ));

        let bad_pitch = SONG.replace("NoteNum=67", "NoteNum=200");
        assert!(matches!(
            read(&bad_pitch),
            Err(ReadError::InvalidValue { .. })
        ));

        let bare_line = SONG.replace("Modulation=100", "Modulation");
        assert!(matches!(read(&bare_line), Err(ReadError::Malformed { .. })));
    }

    #[test]
    fn sections_out_of_order() {
        let swapped = SONG.replace("[#0002]", "[#0001]");
        assert!(matches!(
            read(&swapped),
            Err(ReadError::OutOfOrder { line: 22, .. })
        ));
        let after_end = SONG.replace("[#TRACKEND]\n", "[#TRACKEND]\n[#0003]\nLength=1\nLyric=R\n");
        assert!(matches!(read(&after_end), Err(ReadError::Malformed { .. })));
        let unknown = SONG.replace("[#TRACKEND]", "[#PREV]");
        assert!(matches!(read(&unknown), Err(ReadError::Malformed { .. })));
    }
}
