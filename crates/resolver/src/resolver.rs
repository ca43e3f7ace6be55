use crate::classify::classify;
use crate::enzyme::{Cleavage, EnzymeParameters};
use crate::fasta::ProteinEntry;
use crate::graph::{Graph, ProteinType};
use crate::groups::{compute_intensity, partition_isd, partition_msd, IsdGroup, MsdGroup, Reindex};
use crate::identification::{ConsensusMap, IdentificationSource, PeptideIdentification};
use crate::target_decoy::{annotate_groups, TargetDecoyCounts};
use crate::Diagnostic;
use log::{info, trace};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct EnzymeBuilder {
    /// How many missed cleavages to use
    pub missed_cleavages: Option<u8>,
    /// Minimum length of a digestion product
    pub min_len: Option<usize>,
    /// Maximum length of a digestion product
    pub max_len: Option<usize>,
    /// Residues to cleave at. `"$"` disables digestion, `""` is non-specific
    pub cleave_at: Option<String>,
    pub restrict: Option<char>,
    pub c_terminal: Option<bool>,
}

impl Default for EnzymeBuilder {
    fn default() -> Self {
        Self {
            missed_cleavages: Some(2),
            min_len: Some(6),
            max_len: Some(100),
            cleave_at: Some("KR".into()),
            restrict: Some('P'),
            c_terminal: Some(true),
        }
    }
}

impl EnzymeBuilder {
    /// Fill every unset field with its default. The proline rule only
    /// applies to the default cleavage residues: an explicit `cleave_at`
    /// without `restrict` cleaves unconditionally.
    pub fn resolved(self) -> Self {
        let restrict = match (&self.cleave_at, self.restrict) {
            (_, Some(restrict)) => Some(restrict),
            (None, None) => Some('P'),
            (Some(_), None) => None,
        };
        Self {
            missed_cleavages: Some(self.missed_cleavages.unwrap_or(2)),
            min_len: Some(self.min_len.unwrap_or(6)),
            max_len: Some(self.max_len.unwrap_or(100)),
            cleave_at: Some(self.cleave_at.unwrap_or_else(|| "KR".into())),
            restrict,
            c_terminal: Some(self.c_terminal.unwrap_or(true)),
        }
    }
}

impl From<EnzymeBuilder> for EnzymeParameters {
    fn from(en: EnzymeBuilder) -> EnzymeParameters {
        let en = en.resolved();
        EnzymeParameters {
            missed_cleavages: en.missed_cleavages.unwrap_or_default(),
            min_len: en.min_len.unwrap_or_default(),
            max_len: en.max_len.unwrap_or_default(),
            cleavage: Cleavage::new(
                en.cleave_at.as_deref().unwrap_or_default(),
                en.restrict,
                en.c_terminal.unwrap_or(true),
            ),
        }
    }
}

#[derive(Deserialize, Default, Clone, Debug)]
/// Resolver configuration, as read from a parameter file
pub struct Builder {
    pub enzyme: Option<EnzymeBuilder>,
}

impl Builder {
    pub fn make_parameters(self) -> Parameters {
        Parameters {
            enzyme: self.enzyme.unwrap_or_default().resolved(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Parameters {
    pub enzyme: EnzymeBuilder,
}

/// Which shape of experimental evidence was resolved
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    PeptideIdentifications,
    Consensus,
}

/// Output of a single resolver run. All arenas are owned by the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resolution {
    pub kind: InputKind,
    pub graph: Graph,
    pub isd_groups: Vec<IsdGroup>,
    pub msd_groups: Vec<MsdGroup>,
    pub reindex: Reindex,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub proteins: usize,
    pub peptides: usize,
    pub isd_groups: usize,
    pub msd_groups: usize,
    /// Sum of peptide members over all MSD groups
    pub peptides_in_msd_groups: usize,
    pub active_proteins: usize,
    pub active_peptides: usize,
    pub primary_proteins: usize,
    pub indistinguishable_proteins: usize,
    pub counts: TargetDecoyCounts,
    /// decoy / (target + target_and_decoy)
    pub fdr_lower: Option<f64>,
    /// (decoy + target_and_decoy) / target
    pub fdr_upper: Option<f64>,
    pub diagnostics: usize,
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    match denominator {
        0 => None,
        d => Some(numerator as f64 / d as f64),
    }
}

impl Resolution {
    pub fn statistics(&self) -> Statistics {
        let mut counts = TargetDecoyCounts::default();
        for group in &self.msd_groups {
            counts += TargetDecoyCounts::from(group);
        }

        let active = |ty: fn(ProteinType) -> bool| {
            self.reindex
                .active_proteins
                .iter()
                .filter(|&&ix| ty(self.graph[ix].protein_type()))
                .count()
        };

        Statistics {
            proteins: self.graph.proteins.len(),
            peptides: self.graph.peptides.len(),
            isd_groups: self.isd_groups.len(),
            msd_groups: self.msd_groups.len(),
            peptides_in_msd_groups: self.msd_groups.iter().map(|g| g.peptide_refs.len()).sum(),
            active_proteins: self.reindex.active_proteins.len(),
            active_peptides: self.reindex.active_peptides.len(),
            primary_proteins: active(|ty| {
                matches!(ty, ProteinType::Primary | ProteinType::PrimaryIndistinguishable)
            }),
            indistinguishable_proteins: active(|ty| {
                matches!(
                    ty,
                    ProteinType::PrimaryIndistinguishable | ProteinType::SecondaryIndistinguishable
                )
            }),
            counts,
            fdr_lower: ratio(counts.decoy, counts.target + counts.target_and_decoy),
            fdr_upper: ratio(counts.decoy + counts.target_and_decoy, counts.target),
            diagnostics: self.diagnostics.len(),
        }
    }
}

/// Builds and partitions the protein/peptide graph. Holds configuration only;
/// every call to [`ProteinResolver::resolve`] is independent.
pub struct ProteinResolver {
    digestion: EnzymeParameters,
}

impl ProteinResolver {
    pub fn new(parameters: Parameters) -> Self {
        ProteinResolver {
            digestion: parameters.enzyme.into(),
        }
    }

    pub fn resolve_identifications(
        &self,
        proteins: &[ProteinEntry],
        identifications: &[PeptideIdentification],
    ) -> Resolution {
        self.resolve(proteins, identifications, InputKind::PeptideIdentifications)
    }

    pub fn resolve_consensus(&self, proteins: &[ProteinEntry], consensus: &ConsensusMap) -> Resolution {
        self.resolve(proteins, consensus, InputKind::Consensus)
    }

    pub fn resolve<S>(&self, proteins: &[ProteinEntry], source: &S, kind: InputKind) -> Resolution
    where
        S: IdentificationSource + ?Sized,
    {
        let start = Instant::now();

        let mut builder = crate::graph::GraphBuilder::new(proteins, &self.digestion);
        trace!("- digested {} proteins", proteins.len());
        let found = builder.include_experimental(source);
        let (mut graph, diagnostics) = builder.build();
        info!(
            "- built graph: {} proteins, {} peptides ({} experimental) ({} ms)",
            graph.proteins.len(),
            graph.peptides.len(),
            found,
            (Instant::now() - start).as_millis()
        );

        let mut isd_groups = partition_isd(&mut graph);
        let mut msd_groups = partition_msd(&mut graph, &mut isd_groups);
        info!(
            "- partitioned into {} ISD groups, {} MSD groups ({} ms)",
            isd_groups.len(),
            msd_groups.len(),
            (Instant::now() - start).as_millis()
        );

        let reindex = Reindex::new(&msd_groups, graph.proteins.len(), graph.peptides.len());
        compute_intensity(&graph, &mut msd_groups);
        classify(&mut graph, &reindex);
        annotate_groups(&mut msd_groups, &graph, source);
        info!(
            "- resolved {} active proteins, {} active peptides ({} ms)",
            reindex.active_proteins.len(),
            reindex.active_peptides.len(),
            (Instant::now() - start).as_millis()
        );

        Resolution {
            kind,
            graph,
            isd_groups,
            msd_groups,
            reindex,
            diagnostics,
        }
    }
}
