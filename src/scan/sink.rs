//! Output sink: stdout, or file with atomic temp-then-rename publish
//! (non-resume) versus plain append (resume).
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ScoutResult;

pub enum OutputSink {
    Stdout(std::io::Stdout),
    Atomic {
        tmp_path: PathBuf,
        final_path: PathBuf,
        writer: BufWriter<File>,
    },
    Append(BufWriter<File>),
}

impl OutputSink {
    pub fn stdout() -> Self {
        OutputSink::Stdout(std::io::stdout())
    }

    /// Non-resume file mode: write to a sibling `.tmp` file; the scan must
    /// call `finish` to atomically publish it.
    pub fn new_file(path: &Path) -> ScoutResult<Self> {
        let tmp_path = tmp_path_for(path);
        let file = File::create(&tmp_path)?;
        Ok(OutputSink::Atomic {
            tmp_path,
            final_path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Resume file mode: append directly to the existing output.
    pub fn append_file(path: &Path) -> ScoutResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(OutputSink::Append(BufWriter::new(file)))
    }

    pub fn write_line(&mut self, line: &str) -> ScoutResult<()> {
        match self {
            OutputSink::Stdout(out) => {
                let mut lock = out.lock();
                writeln!(lock, "{line}")?;
            }
            OutputSink::Atomic { writer, .. } => writeln!(writer, "{line}")?,
            OutputSink::Append(writer) => writeln!(writer, "{line}")?,
        }
        Ok(())
    }

    /// Publish the output. For atomic file mode, flushes and renames the
    /// temp file into place; a no-op otherwise. Must only be called on a
    /// clean completion — on any error during scanning, the caller should
    /// simply drop the sink, leaving the temp file behind for diagnosis.
    pub fn finish(self) -> ScoutResult<()> {
        match self {
            OutputSink::Stdout(mut out) => {
                out.flush()?;
                Ok(())
            }
            OutputSink::Atomic {
                tmp_path,
                final_path,
                mut writer,
            } => {
                writer.flush()?;
                drop(writer);
                std::fs::rename(&tmp_path, &final_path)?;
                Ok(())
            }
            OutputSink::Append(mut writer) => {
                writer.flush()?;
                Ok(())
            }
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".tmp");
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_finish_renames_tmp_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson");
        let mut sink = OutputSink::new_file(&path).unwrap();
        sink.write_line("{\"a\":1}").unwrap();
        assert!(!path.exists());
        sink.finish().unwrap();
        assert!(path.exists());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\"a\":1}\n");
    }

    #[test]
    fn dropping_without_finish_leaves_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson");
        let tmp = tmp_path_for(&path);
        {
            let mut sink = OutputSink::new_file(&path).unwrap();
            sink.write_line("{\"a\":1}").unwrap();
        }
        assert!(tmp.exists());
        assert!(!path.exists());
    }

    #[test]
    fn append_mode_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson");
        std::fs::write(&path, "{\"a\":1}\n").unwrap();
        let mut sink = OutputSink::append_file(&path).unwrap();
        sink.write_line("{\"a\":2}").unwrap();
        sink.finish().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\"a\":1}\n{\"a\":2}\n");
    }
}
