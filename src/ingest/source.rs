//! Discovery and reading of access-log files
//!
//! Files are located with a glob inside the log directory and read line by
//! line; `.gz` files are decompressed on the fly.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{DecodeError, PipelineError, PipelineResult};
use crate::ingest::entry::RequestEvent;

/// A directory of access logs
#[derive(Debug, Clone)]
pub struct LogSource {
    directory: PathBuf,
    pattern: String,
}

impl LogSource {
    pub fn new(directory: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            pattern: pattern.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// List the log files to scan, in path order.
    pub fn files(&self) -> PipelineResult<Vec<PathBuf>> {
        let metadata =
            std::fs::metadata(&self.directory).map_err(|e| PipelineError::SourceUnavailable {
                path: self.directory.clone(),
                reason: e.to_string(),
            })?;
        if !metadata.is_dir() {
            return Err(PipelineError::SourceUnavailable {
                path: self.directory.clone(),
                reason: "not a directory".to_string(),
            });
        }

        let escaped = glob::Pattern::escape(&self.directory.to_string_lossy());
        let pattern = Path::new(&escaped).join(&self.pattern);
        let entries =
            glob::glob(&pattern.to_string_lossy()).map_err(|e| PipelineError::SourceUnavailable {
                path: self.directory.clone(),
                reason: format!("invalid log file pattern {:?}: {}", self.pattern, e),
            })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PipelineError::LogRead {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        debug!("Found {} log files in {}", files.len(), self.directory.display());
        Ok(files)
    }
}

/// An opened log file
pub struct LogFile {
    path: PathBuf,
    size_bytes: u64,
    reader: Box<dyn BufRead + Send>,
}

impl LogFile {
    /// Open a log file, decompressing it when it has a `.gz` extension.
    pub fn open(path: &Path) -> PipelineResult<Self> {
        let read_error = |source| PipelineError::LogRead {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(read_error)?;
        let size_bytes = file.metadata().map_err(read_error)?.len();

        let inner: Box<dyn Read + Send> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes,
            reader: Box::new(BufReader::new(inner)),
        })
    }

    /// Size of the file on disk (compressed size for `.gz`)
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the file's lines in order. Blank lines are skipped; the first
    /// unreadable or malformed line ends the sequence with an error.
    pub fn events(self) -> impl Iterator<Item = PipelineResult<RequestEvent>> {
        let path = self.path;
        self.reader
            .split(b'\n')
            .enumerate()
            .filter_map(move |(index, line)| {
                let line = match line {
                    Ok(line) => line,
                    Err(source) => {
                        return Some(Err(PipelineError::LogRead {
                            path: path.clone(),
                            source,
                        }))
                    }
                };
                if line.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                Some(RequestEvent::from_line(&line).map_err(|source| {
                    PipelineError::Decode(DecodeError {
                        file: path.clone(),
                        line: index as u64 + 1,
                        source,
                    })
                }))
            })
    }
}
