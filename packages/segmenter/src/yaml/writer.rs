//! YAML writer for segmented works.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::alignment::Sentence;
use crate::config::DEFAULT_OUTPUT_DIR;
use crate::corpus::SegmentedWork;
use crate::error::Result;
use crate::types::{Division, DivisionFields, Line};

/// Line representation for YAML serialization.
#[derive(Debug, Serialize)]
struct YamlLine {
    id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    title: bool,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    citation: Option<String>,
}

impl From<&Line> for YamlLine {
    fn from(line: &Line) -> Self {
        Self {
            id: line.id.0,
            number: line.number,
            title: line.is_title,
            content: line.content.clone(),
            citation: line.citation.clone(),
        }
    }
}

/// Division representation for YAML serialization.
#[derive(Debug, Serialize)]
struct YamlDivision {
    citation: String,
    #[serde(flatten)]
    fields: DivisionFields,
    lines: Vec<YamlLine>,
}

impl From<&Division> for YamlDivision {
    fn from(division: &Division) -> Self {
        Self {
            citation: division.citation.clone(),
            fields: division.fields.clone(),
            lines: division.lines.iter().map(YamlLine::from).collect(),
        }
    }
}

/// Line range of a sentence for YAML serialization.
#[derive(Debug, Serialize)]
struct YamlLink {
    line: usize,
    start: usize,
    end: usize,
}

/// Sentence representation for YAML serialization.
#[derive(Debug, Serialize)]
struct YamlSentence {
    index: usize,
    division: usize,
    content: String,
    lines: Vec<YamlLink>,
}

impl From<&Sentence> for YamlSentence {
    fn from(sentence: &Sentence) -> Self {
        Self {
            index: sentence.index,
            division: sentence.division,
            content: sentence.content.clone(),
            lines: sentence
                .links
                .iter()
                .map(|link| YamlLink {
                    line: link.line_id.0,
                    start: link.start,
                    end: link.end,
                })
                .collect(),
        }
    }
}

/// Full work representation for YAML serialization.
#[derive(Debug, Serialize)]
struct YamlWork {
    author_id: String,
    work_id: String,
    author: String,
    work: String,
    schema: Vec<String>,
    generated_at: String,
    divisions: Vec<YamlDivision>,
    sentences: Vec<YamlSentence>,
}

/// Generate the YAML document for a segmented work.
pub fn generate_yaml(work: &SegmentedWork) -> Result<String> {
    let tree = &work.tree;
    let yaml_struct = YamlWork {
        author_id: tree.author_id.clone(),
        work_id: tree.work_id.clone(),
        author: tree.author_name.clone(),
        work: tree.work_name.clone(),
        schema: tree.schema.clone(),
        generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        divisions: tree.divisions.iter().map(YamlDivision::from).collect(),
        sentences: work.sentences.iter().map(YamlSentence::from).collect(),
    };

    let yaml_string = serde_yaml_ng::to_string(&yaml_struct)?;
    let lines: Vec<&str> = yaml_string.lines().map(str::trim_end).collect();
    Ok(format!("---\n{}\n", lines.join("\n")))
}

/// Save a segmented work as `<output_base>/<author>/<work>.yaml`.
///
/// Writes to a temp file, syncs and renames, so an interrupted run never
/// leaves a truncated export behind.
///
/// # Returns
/// Path to the saved file
pub fn save_yaml(work: &SegmentedWork, output_base: Option<&Path>) -> Result<PathBuf> {
    let output_base = output_base.unwrap_or(Path::new(DEFAULT_OUTPUT_DIR));
    let output_dir = output_base.join(&work.tree.author_id);
    fs::create_dir_all(&output_dir)?;

    let work_id = &work.tree.work_id;
    let output_file = output_dir.join(format!("{work_id}.yaml"));
    let temp_file = output_dir.join(format!(".{work_id}.yaml.tmp"));

    let content = generate_yaml(work)?;

    {
        let mut file = File::create(&temp_file)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if output_file.exists() {
        fs::remove_file(&output_file)?;
    }

    fs::rename(&temp_file, &output_file)?;

    tracing::debug!(path = %output_file.display(), "saved YAML export");
    Ok(output_file)
}
