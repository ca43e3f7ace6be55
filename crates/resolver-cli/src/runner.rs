use crate::design::{single_batches, Batch, ExperimentalDesign};
use crate::input::Search;
use anyhow::{bail, ensure, Context};
use log::info;
use rayon::prelude::*;
use resolver_core::fasta::ProteinEntry;
use resolver_core::identification::{ConsensusMap, IdentificationSource, PeptideIdentification};
use resolver_core::resolver::{ProteinResolver, Resolution};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;

/// Contents of an identification file: either a flat list of peptide
/// identifications, or consensus features aggregating them across runs
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    Identifications(Vec<PeptideIdentification>),
    Consensus(ConsensusMap),
}

impl Evidence {
    pub fn source(&self) -> &dyn IdentificationSource {
        match self {
            Evidence::Identifications(identifications) => identifications,
            Evidence::Consensus(consensus) => consensus,
        }
    }

    /// Concatenate the evidence of two files belonging to the same batch
    pub fn merge(self, other: Evidence) -> anyhow::Result<Evidence> {
        match (self, other) {
            (Evidence::Identifications(mut lhs), Evidence::Identifications(rhs)) => {
                lhs.extend(rhs);
                Ok(Evidence::Identifications(lhs))
            }
            (Evidence::Consensus(mut lhs), Evidence::Consensus(rhs)) => {
                lhs.features.extend(rhs.features);
                Ok(Evidence::Consensus(lhs))
            }
            _ => bail!("peptide identifications and consensus features cannot be merged"),
        }
    }
}

pub struct BatchResult {
    pub name: String,
    pub evidence: Evidence,
    pub resolution: Resolution,
}

pub struct Runner {
    pub proteins: Vec<ProteinEntry>,
    pub parameters: Search,
    /// Number of FASTA records that were skipped
    pub fasta_diagnostics: usize,
    resolver: ProteinResolver,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Search) -> anyhow::Result<Self> {
        let start = Instant::now();
        let fasta = resolver_core::read_fasta(&parameters.fasta)
            .with_context(|| format!("Failed to read FASTA from `{}`", parameters.fasta))?;
        for diagnostic in &fasta.diagnostics {
            log::warn!("{}: {}", parameters.fasta, diagnostic);
        }
        info!(
            "read {} proteins in {:#?}",
            fasta.entries.len(),
            start.elapsed()
        );

        Ok(Self {
            proteins: fasta.entries,
            fasta_diagnostics: fasta.diagnostics.len(),
            resolver: ProteinResolver::new(parameters.resolver.clone()),
            parameters,
            start,
        })
    }

    pub fn batches(&self) -> anyhow::Result<Vec<Batch>> {
        match &self.parameters.design {
            Some(settings) => {
                let design = ExperimentalDesign::load(settings)?;
                Ok(design.batches(&self.parameters.identification_paths))
            }
            None => Ok(single_batches(&self.parameters.identification_paths)),
        }
    }

    fn load_batch(&self, batch: &Batch) -> anyhow::Result<Evidence> {
        let mut evidence: Option<Evidence> = None;
        for &ix in &batch.inputs {
            let path = &self.parameters.identification_paths[ix];
            let loaded: Evidence = resolver_core::read_json(path)
                .with_context(|| format!("Failed to read identifications from `{path}`"))?;
            evidence = Some(match evidence {
                Some(evidence) => evidence
                    .merge(loaded)
                    .with_context(|| format!("Failed to merge `{path}` into `{}`", batch.name))?,
                None => loaded,
            });
        }
        evidence.with_context(|| format!("`{}` has no input files", batch.name))
    }

    pub fn resolve_batch(&self, batch: &Batch) -> anyhow::Result<BatchResult> {
        let evidence = self.load_batch(batch)?;
        let resolution = match &evidence {
            Evidence::Identifications(identifications) => self
                .resolver
                .resolve_identifications(&self.proteins, identifications),
            Evidence::Consensus(consensus) => {
                self.resolver.resolve_consensus(&self.proteins, consensus)
            }
        };
        for diagnostic in &resolution.diagnostics {
            log::warn!("{}: {}", batch.name, diagnostic);
        }

        Ok(BatchResult {
            name: batch.name.clone(),
            evidence,
            resolution,
        })
    }

    pub fn run(mut self, parallel: usize) -> anyhow::Result<Search> {
        let batches = self.batches()?;
        ensure!(
            !batches.is_empty(),
            "none of the identification files match the experimental design"
        );

        let mut results = Vec::with_capacity(batches.len());
        for chunk in batches.chunks(parallel.max(1)) {
            let resolved = chunk
                .par_iter()
                .map(|batch| self.resolve_batch(batch))
                .collect::<anyhow::Result<Vec<_>>>()?;
            results.extend(resolved);
        }

        for result in &results {
            let stats = result.resolution.statistics();
            info!(
                "{}: {} MSD groups, {} active proteins ({} primary), {} active peptides",
                result.name,
                stats.msd_groups,
                stats.active_proteins,
                stats.primary_proteins,
                stats.active_peptides
            );
        }

        log::trace!("writing outputs");
        let path = self.write_protein_groups(&results)?;
        self.parameters.output_paths.push(path);
        let path = self.write_peptide_table(&results)?;
        self.parameters.output_paths.push(path);
        let path = self.write_protein_table(&results)?;
        self.parameters.output_paths.push(path);
        let path = self.write_statistics(&results)?;
        self.parameters.output_paths.push(path);

        let path = self.make_path("results.json");
        self.parameters.output_paths.push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;

        info!("finished in {}s", (Instant::now() - self.start).as_secs());
        Ok(self.parameters)
    }

    // Create a path for `file_name` in the output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }
}
