//! Sorting a folder of images into review categories.
//!
//! A session walks the images of one directory in name order. Each image can
//! be assigned one category or have its category discarded. Assignments are
//! written to a state file after every change so an interrupted session picks
//! up where it stopped, and can be exported as a dated JSON map of
//! `file name -> category`.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::display::DisplaySink;

pub const STATE_FILE_NAME: &str = ".boxcheck_labels.json";

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Garbage,
    Normal,
    Atypical,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Garbage => "garbage",
            Category::Normal => "normal",
            Category::Atypical => "atypical",
        }
    }
}

pub fn is_labelable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// File names of the labelable images directly inside `dir`, sorted.
pub fn discover_images(dir: &Path) -> anyhow::Result<Vec<String>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read image directory {:?}", dir))?;

    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || !is_labelable(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// Everything a session persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelState {
    pub images: Vec<String>,
    pub labels: BTreeMap<String, Category>,
}

impl LabelState {
    pub fn new(images: Vec<String>) -> Self {
        Self {
            images,
            labels: BTreeMap::new(),
        }
    }
}

/// JSON file holding a [`LabelState`].
#[derive(Debug, Clone)]
pub struct LabelStore {
    path: PathBuf,
}

impl LabelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store kept next to the images.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved state, or `None` when nothing has been saved yet.
    pub fn load(&self) -> anyhow::Result<Option<LabelState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read label state {:?}", self.path))?;
        let state = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse label state {:?}", self.path))?;
        Ok(Some(state))
    }

    pub fn save(&self, state: &LabelState) -> anyhow::Result<()> {
        let data = serde_json::to_string(state)?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write label state {:?}", self.path))?;
        debug!("Saved label state to {}", self.path.display());
        Ok(())
    }

    /// Forget the saved state. Missing state is not an error.
    pub fn reset(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared label state {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", self.path)),
        }
    }
}

/// Result of moving forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(usize),
    /// Already on the last image; carries the number of labelled images.
    Done { labeled: usize },
}

/// Cursor over the images plus their assignments.
#[derive(Debug, Clone)]
pub struct LabelSession {
    state: LabelState,
    current: usize,
}

impl LabelSession {
    pub fn new(state: LabelState) -> Self {
        Self { state, current: 0 }
    }

    pub fn state(&self) -> &LabelState {
        &self.state
    }

    pub fn labels(&self) -> &BTreeMap<String, Category> {
        &self.state.labels
    }

    pub fn is_empty(&self) -> bool {
        self.state.images.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_image(&self) -> Option<&str> {
        self.state.images.get(self.current).map(String::as_str)
    }

    pub fn current_label(&self) -> Option<Category> {
        self.current_image().and_then(|name| self.state.labels.get(name).copied())
    }

    pub fn labeled_count(&self) -> usize {
        self.state.labels.len()
    }

    /// Assign `category` to the current image, replacing any earlier one.
    pub fn assign(&mut self, category: Category) {
        if let Some(name) = self.current_image().map(str::to_string) {
            self.state.labels.insert(name, category);
        }
    }

    /// Drop the current image's category, if any.
    pub fn discard(&mut self) {
        if let Some(name) = self.current_image().map(str::to_string) {
            self.state.labels.remove(&name);
        }
    }

    /// Jump to image `index`. Out-of-range indices leave the cursor alone.
    pub fn show(&mut self, index: usize) -> bool {
        if index >= self.state.images.len() {
            return false;
        }
        self.current = index;
        true
    }

    pub fn prev(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.show(index),
            None => false,
        }
    }

    pub fn next(&mut self) -> Step {
        if self.current + 1 >= self.state.images.len() {
            return Step::Done {
                labeled: self.labeled_count(),
            };
        }
        self.current += 1;
        Step::Moved(self.current)
    }

    pub fn progress(&self) -> String {
        let total = self.state.images.len();
        format!(
            "Image {}/{} • Labeled: {}/{}",
            (self.current + 1).min(total),
            total,
            self.labeled_count(),
            total
        )
    }
}

/// `GE_BeesLab_Labels_YYYY-MM-DD.json`
pub fn export_file_name(date: Date) -> String {
    format!("GE_BeesLab_Labels_{}.json", date)
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Write `labels` as indented JSON into `dir`. Returns the written path.
pub fn export_labels(
    labels: &BTreeMap<String, Category>,
    dir: &Path,
    date: Date,
) -> anyhow::Result<PathBuf> {
    let path = dir.join(export_file_name(date));
    let data = serde_json::to_string_pretty(labels)?;
    std::fs::write(&path, data).with_context(|| format!("Failed to write labels to {:?}", path))?;
    info!("Exported {} labels to {}", labels.len(), path.display());
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelCommand {
    Assign(Category),
    Discard,
    Prev,
    Next,
    Export,
    Quit,
}

/// Keys: `1`-`3` assign, `4` discards, `p` goes back, `n` or ENTER goes on,
/// `e` exports, `q` quits.
pub fn parse_command(input: &str) -> Option<LabelCommand> {
    let command = match input.trim().to_ascii_lowercase().as_str() {
        "1" | "garbage" => LabelCommand::Assign(Category::Garbage),
        "2" | "normal" => LabelCommand::Assign(Category::Normal),
        "3" | "atypical" => LabelCommand::Assign(Category::Atypical),
        "4" | "discard" => LabelCommand::Discard,
        "p" | "prev" => LabelCommand::Prev,
        "" | "n" | "next" => LabelCommand::Next,
        "e" | "export" => LabelCommand::Export,
        "q" | "quit" => LabelCommand::Quit,
        _ => return None,
    };
    Some(command)
}

#[derive(Debug, Default)]
pub struct LabelingReport {
    pub labeled: usize,
    pub exported: Vec<PathBuf>,
}

/// Interactive labelling over one image directory.
pub struct Labeler {
    session: LabelSession,
    store: LabelStore,
    image_dir: PathBuf,
    export_dir: PathBuf,
    date: Date,
}

impl Labeler {
    /// Resume the saved session in `store`, or start a fresh one from the
    /// images in `image_dir`.
    pub fn open(image_dir: &Path, store: LabelStore) -> anyhow::Result<Self> {
        let state = match store.load()? {
            Some(state) => {
                info!(
                    "Resuming {} images with {} labels",
                    state.images.len(),
                    state.labels.len()
                );
                state
            }
            None => {
                let state = LabelState::new(discover_images(image_dir)?);
                store.save(&state)?;
                state
            }
        };

        Ok(Self {
            session: LabelSession::new(state),
            store,
            image_dir: image_dir.to_path_buf(),
            export_dir: image_dir.to_path_buf(),
            date: today(),
        })
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn with_date(mut self, date: Date) -> Self {
        self.date = date;
        self
    }

    pub fn session(&self) -> &LabelSession {
        &self.session
    }

    /// Apply one command. Returns `false` once the operator quits.
    pub fn apply(
        &mut self,
        command: LabelCommand,
        report: &mut LabelingReport,
    ) -> anyhow::Result<bool> {
        match command {
            LabelCommand::Assign(category) => {
                self.session.assign(category);
                self.store.save(self.session.state())?;
            }
            LabelCommand::Discard => {
                self.session.discard();
                self.store.save(self.session.state())?;
            }
            LabelCommand::Prev => {
                self.session.prev();
            }
            LabelCommand::Next => {
                if let Step::Done { labeled } = self.session.next() {
                    println!("All images reviewed. Labeled: {}", labeled);
                }
            }
            LabelCommand::Export => {
                let path = export_labels(self.session.labels(), &self.export_dir, self.date)?;
                report.exported.push(path);
            }
            LabelCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Read commands from `input` until `q` or end of input, showing the
    /// current image through `sink` whenever the cursor moves.
    pub fn run<R: BufRead, S: DisplaySink>(
        &mut self,
        mut input: R,
        sink: &mut S,
    ) -> anyhow::Result<LabelingReport> {
        let mut report = LabelingReport::default();
        if self.session.is_empty() {
            warn!("No images to label in {}", self.image_dir.display());
            return Ok(report);
        }

        let mut shown = None;
        loop {
            if shown != Some(self.session.current()) {
                self.show_current(sink)?;
                shown = Some(self.session.current());
            }

            let marker = self.session.current_label().map(|c| c.as_str()).unwrap_or("-");
            println!("{} [{}]", self.session.progress(), marker);
            println!("1 garbage, 2 normal, 3 atypical, 4 discard, p prev, ENTER next, e export, q quit");

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            let Some(command) = parse_command(&line) else {
                warn!("Unknown command: {}", line.trim());
                continue;
            };
            if !self.apply(command, &mut report)? {
                break;
            }
        }

        report.labeled = self.session.labeled_count();
        Ok(report)
    }

    fn show_current<S: DisplaySink>(&self, sink: &mut S) -> anyhow::Result<()> {
        let Some(name) = self.session.current_image() else {
            return Ok(());
        };
        match image::open(self.image_dir.join(name)) {
            Ok(img) => sink.show(name, &img),
            Err(e) => {
                warn!("Cannot open {}: {}", name, e);
                Ok(())
            }
        }
    }
}
