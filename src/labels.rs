//! YOLO label file parsing.
//!
//! Each line is `class cx cy w h`. Lines that do not have exactly five
//! numeric tokens are kept as [`LabelLine::Skipped`] so callers can count them;
//! they never turn into errors.

use std::path::Path;

use anyhow::Context;

use crate::models::YoloLabel;

const FIELD_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    WrongFieldCount(usize),
    InvalidNumber(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelLine {
    Valid { index: usize, label: YoloLabel },
    Skipped { index: usize, reason: SkipReason },
}

impl LabelLine {
    pub fn index(&self) -> usize {
        match self {
            LabelLine::Valid { index, .. } | LabelLine::Skipped { index, .. } => *index,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, LabelLine::Valid { .. })
    }
}

/// Parse one line. `index` is the zero-based line number in the file.
pub fn parse_label_line(index: usize, line: &str) -> LabelLine {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != FIELD_COUNT {
        return LabelLine::Skipped {
            index,
            reason: SkipReason::WrongFieldCount(tokens.len()),
        };
    }

    let mut values = [0f64; FIELD_COUNT];
    for (slot, token) in values.iter_mut().zip(&tokens) {
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => *slot = v,
            _ => {
                return LabelLine::Skipped {
                    index,
                    reason: SkipReason::InvalidNumber(token.to_string()),
                };
            }
        }
    }

    let [class, center_x, center_y, width, height] = values;
    LabelLine::Valid {
        index,
        label: YoloLabel {
            class_id: class.max(0.0) as u32,
            center_x,
            center_y,
            width,
            height,
        },
    }
}

/// All lines of one label file, in file order.
#[derive(Debug, Clone, Default)]
pub struct LabelFile {
    pub lines: Vec<LabelLine>,
}

impl LabelFile {
    pub fn parse(contents: &str) -> Self {
        Self {
            lines: contents
                .lines()
                .enumerate()
                .map(|(index, line)| parse_label_line(index, line))
                .collect(),
        }
    }

    /// Valid labels paired with their original line index.
    pub fn labels(&self) -> impl Iterator<Item = (usize, &YoloLabel)> {
        self.lines.iter().filter_map(|line| match line {
            LabelLine::Valid { index, label } => Some((*index, label)),
            LabelLine::Skipped { .. } => None,
        })
    }

    pub fn valid_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_valid()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.lines.len() - self.valid_count()
    }
}

pub fn read_label_file(path: &Path) -> anyhow::Result<LabelFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read label file {:?}", path))?;
    Ok(LabelFile::parse(&contents))
}
