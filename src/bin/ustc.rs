// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `ustc` inspects UST projects, dumps their pitch curves and converts them
//! between the file format versions.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use log::error;
use structopt::StructOpt;

use syn_ust::registry::SongRegistry;
use syn_ust::song::Song;
use syn_ust::ust::{self, SaveFormat};

#[derive(Debug, StructOpt)]
#[structopt(name = "ustc", about = "Inspecting and converting UST projects")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// The project file.
    #[structopt(parse(from_os_str))]
    source: PathBuf,

    /// Save the project to this file.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Format to write in: 1.2, 2.0-sjis or 2.0-utf8. Without an output file
    /// the converted project is written to stdout.
    #[structopt(short, long)]
    format: Option<SaveFormat>,

    /// Print the pitch curve, sampled every STEP milliseconds (default 10).
    #[structopt(long, value_name = "STEP")]
    #[allow(clippy::option_option)]
    dump_curve: Option<Option<f64>>,

    /// Milliseconds a default transition starts before the next note.
    #[structopt(long)]
    lead_in: Option<f64>,

    /// Milliseconds a default transition reaches into the next note.
    #[structopt(long)]
    lead_out: Option<f64>,
}

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    if let Err(err) = simple_logger::init_with_level(level) {
        eprintln!("could not set up logging: {}", err);
    }

    if let Err(err) = run(opt) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn Error>> {
    let mut registry = SongRegistry::new()?;
    let key = registry.open(&opt.source)?;
    let song = registry
        .get_song_mut(&key)
        .ok_or("project vanished from the registry")?;

    let mut config = *song.curve_config();
    if let Some(lead_in) = opt.lead_in {
        config.lead_in_ms = lead_in;
    }
    if let Some(lead_out) = opt.lead_out {
        config.lead_out_ms = lead_out;
    }
    song.set_curve_config(config);
    if let Some(format) = opt.format {
        song.set_save_format(format);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if opt.output.is_some() || opt.format.is_none() {
        summary(song, &mut out)?;
    }
    if let Some(step) = opt.dump_curve {
        for (time, pitch) in song.pitch_curve().sample(step.unwrap_or(10.0))? {
            writeln!(out, "{:.3}\t{:.4}", time, pitch)?;
        }
    }

    match opt.output {
        Some(output) => {
            registry.save_as(&key, &output)?;
        }
        None if opt.format.is_some() => ust::write(song, &mut out)?,
        None => {}
    }
    Ok(())
}

fn summary<W: Write>(song: &Song, out: &mut W) -> io::Result<()> {
    let settings = song.settings();
    let unset = || "-".to_string();
    writeln!(
        out,
        "project:   {}",
        settings.project_name.clone().unwrap_or_else(unset)
    )?;
    writeln!(
        out,
        "voicebank: {}",
        song.voicebank().map(str::to_string).unwrap_or_else(unset)
    )?;
    writeln!(out, "format:    {}", song.save_format())?;
    writeln!(out, "tempo:     {} bpm", song.tempo())?;
    writeln!(
        out,
        "notes:     {} over {} ticks ({:.0} ms)",
        song.notes().len(),
        song.length(),
        song.pitch_curve().end()
    )?;
    for note in song.notes() {
        writeln!(
            out,
            "  {:>8} {:>6}  {:<4} {}",
            note.position,
            note.length,
            note.pitch.to_string(),
            note.lyric
        )?;
    }
    Ok(())
}
