use crate::graph::{Graph, ProteinIx};
use crate::groups::MsdGroup;
use crate::identification::{IdentificationSource, TargetDecoy};
use serde::Serialize;
use std::ops::AddAssign;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TargetDecoyCounts {
    pub target: usize,
    pub decoy: usize,
    pub target_and_decoy: usize,
}

impl TargetDecoyCounts {
    pub fn total(&self) -> usize {
        self.target + self.decoy + self.target_and_decoy
    }

    fn record(&mut self, annotation: TargetDecoy) {
        match annotation {
            TargetDecoy::Target => self.target += 1,
            TargetDecoy::Decoy => self.decoy += 1,
            TargetDecoy::TargetAndDecoy => self.target_and_decoy += 1,
        }
    }
}

impl AddAssign for TargetDecoyCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.target += rhs.target;
        self.decoy += rhs.decoy;
        self.target_and_decoy += rhs.target_and_decoy;
    }
}

impl From<&MsdGroup> for TargetDecoyCounts {
    fn from(group: &MsdGroup) -> Self {
        TargetDecoyCounts {
            target: group.num_target,
            decoy: group.num_decoy,
            target_and_decoy: group.num_target_and_decoy,
        }
    }
}

/// The combined annotation of the top hits behind a protein's experimental
/// peptides, or `None` if none of them is annotated.
pub fn protein_annotation<S>(graph: &Graph, protein: ProteinIx, source: &S) -> Option<TargetDecoy>
where
    S: IdentificationSource + ?Sized,
{
    graph[protein]
        .peptide_refs
        .iter()
        .map(|&pep| &graph[pep])
        .filter(|peptide| peptide.experimental)
        .flat_map(|peptide| peptide.evidence.iter())
        .filter_map(|&hit_ref| {
            source
                .peptide_hit(hit_ref)
                .unwrap_or_else(|| {
                    panic!(
                        "BUG: evidence {:?} does not resolve in the identification source",
                        hit_ref
                    )
                })
                .target_decoy
        })
        .reduce(TargetDecoy::merge)
}

/// Count the proteins of an MSD group by target/decoy annotation. Proteins
/// without any annotation are not counted.
pub fn count_target_decoy<S>(group: &MsdGroup, graph: &Graph, source: &S) -> TargetDecoyCounts
where
    S: IdentificationSource + ?Sized,
{
    let mut counts = TargetDecoyCounts::default();
    for &prot in &group.protein_refs {
        if let Some(annotation) = protein_annotation(graph, prot, source) {
            counts.record(annotation);
        }
    }
    counts
}

/// Fill in the counters of every MSD group
pub fn annotate_groups<S>(msd_groups: &mut [MsdGroup], graph: &Graph, source: &S)
where
    S: IdentificationSource + ?Sized,
{
    for group in msd_groups.iter_mut() {
        let counts = count_target_decoy(group, graph, source);
        group.num_target = counts.target;
        group.num_decoy = counts.decoy;
        group.num_target_and_decoy = counts.target_and_decoy;
    }
}
