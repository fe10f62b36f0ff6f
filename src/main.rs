use std::{
    ffi::OsString,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use reader::{
    bookmarks::PositionStore,
    cmds::{self, protocol::CONTROLS_HELP, StartPoint},
    controller::PlaybackController,
    state::{AppState, Settings},
    util::logging,
    voices::VoiceLibrary,
};

/// Read a PDF aloud with pause/resume controls and bookmarks.
#[derive(Parser, Debug)]
#[command(name = "reader", version)]
struct Cli {
    /// PDF to read; prompted for when omitted
    #[arg(value_name = "DOCUMENT")]
    document: Option<PathBuf>,

    /// File holding saved reading positions
    #[arg(long, env = "READER_BOOKMARKS", default_value = "bookmarks.json")]
    bookmarks: PathBuf,

    /// Python script that extracts page text as JSON
    #[arg(long, env = "READER_PDF_SCRIPT", default_value = "scripts/py/pdf_extract.py")]
    pdf_script: PathBuf,

    /// Python interpreter used to run the extractor
    #[arg(long, env = "READER_PYTHON_BIN", default_value = "python")]
    python: OsString,

    /// Command line used to launch Piper
    #[arg(long, env = "READER_PIPER_COMMAND")]
    piper_command: Option<String>,

    /// Directory with bundled helpers (runtime/piper)
    #[arg(long, env = "READER_RUNTIME_DIR")]
    runtime_dir: Option<PathBuf>,

    /// Directory searched for Piper voices (*.onnx)
    #[arg(long, env = "READER_VOICES_DIR", default_value = "assets/voices")]
    voices_dir: PathBuf,

    /// Voice id (model file stem); defaults to the first voice found
    #[arg(long, env = "READER_VOICE")]
    voice: Option<String>,

    /// Speech length scale, above 1.0 is slower
    #[arg(long, env = "READER_LENGTH_SCALE", default_value_t = 1.0)]
    length_scale: f32,

    /// Playback volume between 0.0 and 1.0
    #[arg(long, env = "READER_VOLUME", default_value_t = 0.9)]
    volume: f32,

    #[arg(long, env = "READER_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Start at this 1-based page
    #[arg(long, conflicts_with_all = ["chapter", "intro", "resume"])]
    page: Option<i64>,

    /// Start at the first page mentioning this chapter
    #[arg(long, conflicts_with_all = ["intro", "resume"])]
    chapter: Option<String>,

    /// Start at the detected introduction
    #[arg(long, conflicts_with = "resume")]
    intro: bool,

    /// Start at the saved bookmark
    #[arg(long)]
    resume: bool,

    /// List the available voices and exit
    #[arg(long)]
    list_voices: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            bookmarks: self.bookmarks.clone(),
            pdf_script: self.pdf_script.clone(),
            python: self.python.clone(),
            piper_command: self.piper_command.clone(),
            runtime_dir: self.runtime_dir.clone(),
            voices_dir: self.voices_dir.clone(),
            voice: self.voice.clone(),
            length_scale: self.length_scale,
            volume: self.volume,
        }
    }

    fn start_point(&self) -> Option<StartPoint> {
        if let Some(page) = self.page {
            Some(StartPoint::Page(page))
        } else if let Some(chapter) = &self.chapter {
            Some(StartPoint::Chapter(chapter.clone()))
        } else if self.intro {
            Some(StartPoint::Introduction)
        } else if self.resume {
            Some(StartPoint::Resume)
        } else {
            None
        }
    }
}

fn list_voices(dir: &Path) {
    let voices = VoiceLibrary::scan(dir.to_path_buf()).list();
    if voices.is_empty() {
        println!("No voices found in {}", dir.display());
    }
    for voice in voices {
        println!(
            "{:<24} {} [{}]",
            voice.id,
            voice.label,
            voice.quality.as_deref().unwrap_or("-")
        );
    }
}

fn document_path(cli: &Cli, input: &mut impl BufRead, out: &mut impl Write) -> Result<PathBuf> {
    let path = match &cli.document {
        Some(path) => path.clone(),
        None => {
            write!(out, "\nEnter the path to your PDF file: ")?;
            out.flush()?;
            let mut line = String::new();
            input.read_line(&mut line)?;
            PathBuf::from(line.trim())
        }
    };
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    Ok(path)
}

fn run(cli: Cli) -> Result<()> {
    if cli.list_voices {
        list_voices(&cli.voices_dir);
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "PDF Text-to-Speech Reader")?;
    writeln!(out, "{}", "=".repeat(60))?;

    let state = AppState::initialise(&cli.settings())?;

    let (document, start_page) = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let path = document_path(&cli, &mut input, &mut out)?;
        let document = path.to_string_lossy().into_owned();
        let point = match cli.start_point() {
            Some(point) => point,
            None => {
                let bookmark = state.store.get(&document);
                cmds::choose_start(&mut input, &mut out, bookmark)?
            }
        };
        let page = cmds::resolve_start(
            &point,
            state.source.as_ref(),
            state.store.as_ref(),
            &document,
            &mut out,
        )?;
        (document, page)
    };

    let mut controller = PlaybackController::new(document, state.source, state.sink, state.store);
    let range = controller
        .start(start_page)
        .context("could not start narration")?;
    writeln!(out, "\nReading from page {}...", range.start_page + 1)?;
    writeln!(out, "{CONTROLS_HELP}")?;
    out.flush()?;

    let lines = cmds::spawn_stdin_reader();
    let end = cmds::run_session(&mut controller, &lines, &mut out)?;
    info!("Session ended: {end:?}");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init(&cli.log_dir, &cli.log_level) {
        eprintln!("Failed to initialise logger: {err}");
    }
    info!("Starting reader");

    if let Err(err) = run(cli) {
        error!("{err:?}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
