use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::DynamicImage;
use tracing::info;

/// Where finished figures go.
pub trait DisplaySink {
    fn show(&mut self, title: &str, image: &DynamicImage) -> anyhow::Result<()>;
}

/// Only reports what would be shown.
#[derive(Debug, Default)]
pub struct LogSink {
    pub shown: usize,
}

impl DisplaySink for LogSink {
    fn show(&mut self, title: &str, image: &DynamicImage) -> anyhow::Result<()> {
        self.shown += 1;
        info!("{} [{}x{}]", title, image.width(), image.height());
        Ok(())
    }
}

/// Writes each figure as a PNG named after its title.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        Ok(Self { dir, saved: Vec::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

impl DisplaySink for DirectorySink {
    fn show(&mut self, title: &str, image: &DynamicImage) -> anyhow::Result<()> {
        let path = self.dir.join(figure_file_name(title));
        image
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save figure {:?}: {}", path, e))?;
        info!("Saved {}", path.display());
        self.saved.push(path);
        Ok(())
    }
}

/// File name for a figure title: path separators and punctuation become `_`,
/// and a `.png` extension is ensured.
pub fn figure_file_name(title: &str) -> String {
    let stem = title.strip_suffix(".png").unwrap_or(title);
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    name.push_str(".png");
    name
}

/// Operator decision after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next,
    Stop,
}

/// Gate between steps of an interactive walk-through.
pub trait Operator {
    fn acknowledge(&mut self, prompt: &str) -> anyhow::Result<Advance>;
}

/// Never blocks.
#[derive(Debug, Default)]
pub struct AutoAdvance;

impl Operator for AutoAdvance {
    fn acknowledge(&mut self, _prompt: &str) -> anyhow::Result<Advance> {
        Ok(Advance::Next)
    }
}

/// Waits for a line on the given reader. `q` stops, end of input stops.
pub struct LineOperator<R> {
    input: R,
}

impl<R: BufRead> LineOperator<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Operator for LineOperator<R> {
    fn acknowledge(&mut self, prompt: &str) -> anyhow::Result<Advance> {
        println!("{}", prompt);
        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 || line.trim().eq_ignore_ascii_case("q") {
            return Ok(Advance::Stop);
        }
        Ok(Advance::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn figure_names_are_filesystem_safe() {
        assert_eq!(figure_file_name("img_1_crop_2.png"), "img_1_crop_2.png");
        assert_eq!(
            figure_file_name("Detected Cells: a.png (3 found)"),
            "Detected_Cells__a.png__3_found_.png"
        );
        assert_eq!(figure_file_name("dir/x"), "dir_x.png");
    }

    #[test]
    fn line_operator_reads_acknowledgements() {
        let mut op = LineOperator::new(Cursor::new("\n\nq\n"));
        assert_eq!(op.acknowledge("next").unwrap(), Advance::Next);
        assert_eq!(op.acknowledge("next").unwrap(), Advance::Next);
        assert_eq!(op.acknowledge("next").unwrap(), Advance::Stop);
        // exhausted input
        assert_eq!(op.acknowledge("next").unwrap(), Advance::Stop);
    }

    #[test]
    fn directory_sink_writes_png() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let mut sink = DirectorySink::new(dir.path().join("figures"))?;
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        sink.show("a.png", &img)?;
        assert_eq!(sink.saved().len(), 1);
        assert!(sink.dir().join("a.png").is_file());
        Ok(())
    }
}
