pub mod classify;
pub mod enzyme;
pub mod fasta;
pub mod graph;
pub mod groups;
pub mod identification;
pub mod mass;
pub mod resolver;
pub mod target_decoy;

use serde::Serialize;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A protein record that could not be parsed or digested
    MalformedProtein,
    /// A peptide identification without a usable top hit
    MalformedIdentification,
}

/// A recoverable problem with a single input record. The record is skipped
/// and processing continues.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn malformed_protein<S: Into<String>>(message: S) -> Self {
        Diagnostic {
            kind: DiagnosticKind::MalformedProtein,
            message: message.into(),
        }
    }

    pub fn malformed_identification<S: Into<String>>(message: S) -> Self {
        Diagnostic {
            kind: DiagnosticKind::MalformedIdentification,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            DiagnosticKind::MalformedProtein => write!(f, "malformed protein: {}", self.message),
            DiagnosticKind::MalformedIdentification => {
                write!(f, "malformed identification: {}", self.message)
            }
        }
    }
}

pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<fasta::Fasta, Error> {
    let contents = std::fs::read_to_string(path)?;
    Ok(fasta::Fasta::parse(contents))
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
