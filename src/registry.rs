// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The table of open songs, keyed by the file they belong to.
//!
//! Keys are canonicalized before every lookup, so two spellings of the same
//! file always refer to the same entry. Songs that were never saved get a
//! synthetic path inside a scratch directory that lives as long as the
//! registry.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use snafu::{ResultExt, Snafu};
use tempfile::TempDir;

use crate::song::Song;
use crate::ust::{self, ReadError, WriteError};

#[derive(Debug, Snafu)]
pub enum RegistryError {
    #[snafu(display("could not create scratch directory: {}", source))]
    ScratchDir { source: io::Error },
    #[snafu(display("no song is registered for {}", path.display()))]
    NotRegistered { path: PathBuf },
    #[snafu(display("another song is already registered for {}", path.display()))]
    Occupied { path: PathBuf },
    #[snafu(display("could not open {}: {}", path.display(), source))]
    Open { path: PathBuf, source: ReadError },
    #[snafu(display("could not save {}: {}", path.display(), source))]
    Save { path: PathBuf, source: WriteError },
}

pub struct SongRegistry {
    songs: HashMap<PathBuf, Song>,
    /// Home of the synthetic paths of unsaved songs, deleted on drop.
    scratch: TempDir,
    counter: u64,
}

impl SongRegistry {
    pub fn new() -> Result<Self, RegistryError> {
        let scratch = tempfile::Builder::new()
            .prefix("syn-ust")
            .tempdir()
            .context(ScratchDir)?;
        debug!("scratch directory {}", scratch.path().display());
        Ok(Self {
            songs: HashMap::new(),
            scratch,
            counter: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// The keys of all registered songs, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.songs.keys().map(PathBuf::as_path)
    }

    pub fn has_song(&self, path: &Path) -> bool {
        self.songs.contains_key(&canonical(path))
    }

    pub fn get_song(&self, path: &Path) -> Option<&Song> {
        self.songs.get(&canonical(path))
    }

    pub fn get_song_mut(&mut self, path: &Path) -> Option<&mut Song> {
        self.songs.get_mut(&canonical(path))
    }

    /// Register `song` under `path`, returning the song it replaced.
    pub fn set_song(&mut self, path: &Path, song: Song) -> Option<Song> {
        self.songs.insert(canonical(path), song)
    }

    /// Register a song that has no file yet under a fresh synthetic path, which is returned.
    pub fn add_song(&mut self, song: Song) -> PathBuf {
        let key = loop {
            self.counter += 1;
            let key = canonical(&self.scratch.path().join(format!("song{}.ust", self.counter)));
            if !self.songs.contains_key(&key) {
                break key;
            }
        };
        self.songs.insert(key.clone(), song);
        key
    }

    /// Whether `path` is one of the synthetic paths handed out by [`add_song`](Self::add_song).
    pub fn is_scratch(&self, path: &Path) -> bool {
        canonical(path).starts_with(canonical(self.scratch.path()))
    }

    /// Re-key a song, e.g. after it was saved for the first time.
    /// Moving a song onto its own key does nothing.
    pub fn move_song(&mut self, old: &Path, new: &Path) -> Result<PathBuf, RegistryError> {
        let old = canonical(old);
        let new = canonical(new);
        if !self.songs.contains_key(&old) {
            return Err(RegistryError::NotRegistered { path: old });
        }
        if old == new {
            return Ok(new);
        }
        if self.songs.contains_key(&new) {
            return Err(RegistryError::Occupied { path: new });
        }
        if let Some(song) = self.songs.remove(&old) {
            self.songs.insert(new.clone(), song);
        }
        debug!("moved {} to {}", old.display(), new.display());
        Ok(new)
    }

    pub fn remove_song(&mut self, path: &Path) -> Option<Song> {
        self.songs.remove(&canonical(path))
    }

    /// Load the project at `path` unless it is open already, returning its key.
    /// Nothing is registered if the file can't be read.
    pub fn open(&mut self, path: &Path) -> Result<PathBuf, RegistryError> {
        let key = canonical(path);
        if self.songs.contains_key(&key) {
            debug!("{} is already open", key.display());
            return Ok(key);
        }
        let song = ust::load(path).context(Open { path })?;
        self.songs.insert(key.clone(), song);
        Ok(key)
    }

    /// Save the song registered under `key` to `path` and register it there.
    /// Fails without writing anything if a different song is registered for `path`.
    pub fn save_as(&mut self, key: &Path, path: &Path) -> Result<PathBuf, RegistryError> {
        let old = canonical(key);
        let new = canonical(path);
        if old != new && self.songs.contains_key(&new) {
            return Err(RegistryError::Occupied { path: new });
        }
        let song = self
            .songs
            .get_mut(&old)
            .ok_or_else(|| RegistryError::NotRegistered { path: old.clone() })?;
        ust::save(song, path).context(Save { path })?;
        self.move_song(&old, &new)
    }
}

impl Drop for SongRegistry {
    fn drop(&mut self) {
        let dirty = self.songs.values().filter(|song| song.is_dirty()).count();
        if dirty > 0 {
            info!("closing {} songs with unsaved changes", dirty);
        }
    }
}

/// The identity of a file: absolute, with symlinks and `..` resolved.
/// Files that don't exist yet are resolved through their closest existing ancestor.
fn canonical(path: &Path) -> PathBuf {
    match try_canonical(path) {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!("could not resolve {}, using it as is: {}", path.display(), err);
            path.to_path_buf()
        }
    }
}

fn try_canonical(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    let mut last_err = None;
    for ancestor in absolute.ancestors() {
        match fs::canonicalize(ancestor) {
            Ok(mut resolved) => {
                let rest = absolute.strip_prefix(ancestor).unwrap_or_else(|_| Path::new(""));
                for component in rest.components() {
                    match component {
                        Component::CurDir => {}
                        Component::ParentDir => {
                            resolved.pop();
                        }
                        other => resolved.push(other),
                    }
                }
                return Ok(resolved);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no existing ancestor")))
}
