use crate::app::models::FileEntry;
use crate::app::parser::{file_close_marker, file_open_marker};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub struct BundleWriter;

impl BundleWriter {
    /// Serializes one file block. The content is always followed by a
    /// newline so that parsing restores it byte for byte.
    pub fn file_block(relative_path: &str, content: &str) -> String {
        format!(
            "{}\n{}\n{}\n",
            file_open_marker(relative_path),
            content,
            file_close_marker(relative_path)
        )
    }

    /// Returns the bundle text and the number of files it holds.
    pub fn generate(entries: &[FileEntry]) -> (String, usize) {
        let mut output = String::new();
        let mut count = 0;

        for entry in entries {
            match fs::read_to_string(&entry.path) {
                Ok(content) => {
                    output.push_str(&Self::file_block(&entry.relative_path, &content));
                    count += 1;
                }
                Err(e) => log::warn!("Skipping {}: {}", entry.relative_path, e),
            }
        }

        (output, count)
    }

    pub fn write(entries: &[FileEntry], output_file: &Path) -> Result<usize> {
        let (bundle, count) = Self::generate(entries);
        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        fs::write(output_file, bundle)
            .with_context(|| format!("Failed to write bundle {:?}", output_file))?;
        Ok(count)
    }
}
