use crate::Diagnostic;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProteinEntry {
    /// Accession: the first whitespace-delimited token of the header
    pub identifier: Arc<str>,
    pub description: String,
    pub sequence: String,
}

impl ProteinEntry {
    pub fn new<S: AsRef<str>>(identifier: S, sequence: S) -> Self {
        ProteinEntry {
            identifier: Arc::from(identifier.as_ref()),
            description: String::new(),
            sequence: sequence.as_ref().into(),
        }
    }
}

#[derive(Default, Debug)]
pub struct Fasta {
    pub entries: Vec<ProteinEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Fasta {
    // Parse a string into a fasta database
    pub fn parse<S: AsRef<str>>(contents: S) -> Fasta {
        let mut fasta = Fasta::default();
        let mut header: Option<&str> = None;
        let mut s = String::new();

        for line in contents.as_ref().lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(id) = line.strip_prefix('>') {
                if let Some(last) = header.replace(id) {
                    fasta.push(last, std::mem::take(&mut s));
                } else if !s.is_empty() {
                    fasta.diagnostics.push(Diagnostic::malformed_protein(
                        "sequence data before the first FASTA header",
                    ));
                    s.clear();
                }
            } else {
                s.extend(
                    line.chars()
                        .filter(|c| !c.is_whitespace() && *c != '*')
                        .map(|c| c.to_ascii_uppercase()),
                );
            }
        }

        if let Some(last) = header {
            fasta.push(last, s);
        }

        fasta
    }

    fn push(&mut self, header: &str, sequence: String) {
        let header = header.trim();
        let (identifier, description) = match header.split_once(char::is_whitespace) {
            Some((id, desc)) => (id, desc.trim()),
            None => (header, ""),
        };

        if identifier.is_empty() {
            self.diagnostics.push(Diagnostic::malformed_protein(
                "FASTA header without an identifier",
            ));
        } else if sequence.is_empty() {
            self.diagnostics.push(Diagnostic::malformed_protein(format!(
                "FASTA entry `{}` has an empty sequence",
                identifier
            )));
        } else {
            self.entries.push(ProteinEntry {
                identifier: Arc::from(identifier),
                description: description.into(),
                sequence,
            });
        }
    }
}
