//! Connected-component partitioning of the protein/peptide graph.
//!
//! ISD groups ("in-silico digest") are the components of the full graph.
//! MSD groups ("MS derived") are the components that remain inside each ISD
//! group once every node without experimental evidence is removed.

use crate::graph::{Graph, Node, PeptideIx, ProteinIx, Visited};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IsdGroup {
    pub index: usize,
    pub protein_refs: Vec<ProteinIx>,
    pub peptide_refs: Vec<PeptideIx>,
    pub msd_group_refs: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MsdGroup {
    pub index: usize,
    pub isd_group_ref: usize,
    pub protein_refs: Vec<ProteinIx>,
    pub peptide_refs: Vec<PeptideIx>,
    pub num_target: usize,
    pub num_decoy: usize,
    pub num_target_and_decoy: usize,
    /// Median intensity of the member peptides, where known
    pub intensity: Option<f64>,
}

pub fn partition_isd(graph: &mut Graph) -> Vec<IsdGroup> {
    let mut visited = Visited::new(graph);
    let seeds = graph
        .protein_ixs()
        .map(Node::Protein)
        .chain(graph.peptide_ixs().map(Node::Peptide))
        .collect::<Vec<_>>();

    let mut groups = Vec::new();
    for seed in seeds {
        let component = graph.component(seed, &mut visited, |_| true);
        if component.is_empty() {
            continue;
        }

        let index = groups.len();
        for &ix in &component.proteins {
            graph[ix].isd_group_ref = Some(index);
        }
        for &ix in &component.peptides {
            graph[ix].isd_group_ref = Some(index);
        }
        groups.push(IsdGroup {
            index,
            protein_refs: component.proteins,
            peptide_refs: component.peptides,
            msd_group_refs: Vec::new(),
        });
    }
    groups
}

/// Carve MSD groups out of every ISD group, seeding from evidenced proteins
/// first and then from experimental peptides without proteins.
pub fn partition_msd(graph: &mut Graph, isd_groups: &mut [IsdGroup]) -> Vec<MsdGroup> {
    let mut visited = Visited::new(graph);
    let mut groups = Vec::new();

    for isd in isd_groups.iter_mut() {
        let seeds = isd
            .protein_refs
            .iter()
            .copied()
            .map(Node::Protein)
            .chain(isd.peptide_refs.iter().copied().map(Node::Peptide))
            .collect::<Vec<_>>();

        for seed in seeds {
            let component = {
                let graph: &Graph = graph;
                graph.component(seed, &mut visited, |node| graph.is_evidenced(node))
            };
            if component.is_empty() {
                continue;
            }

            let index = groups.len();
            for &ix in &component.proteins {
                let node = &mut graph[ix];
                assert_eq!(
                    node.isd_group_ref,
                    Some(isd.index),
                    "BUG: MSD group escapes its ISD group"
                );
                node.msd_group_ref = Some(index);
            }
            for &ix in &component.peptides {
                let node = &mut graph[ix];
                assert_eq!(
                    node.isd_group_ref,
                    Some(isd.index),
                    "BUG: MSD group escapes its ISD group"
                );
                node.msd_group_ref = Some(index);
            }

            isd.msd_group_refs.push(index);
            groups.push(MsdGroup {
                index,
                isd_group_ref: isd.index,
                protein_refs: component.proteins,
                peptide_refs: component.peptides,
                ..Default::default()
            });
        }
    }
    groups
}

/// Set each MSD group's intensity to the median of its peptide intensities
pub fn compute_intensity(graph: &Graph, msd_groups: &mut [MsdGroup]) {
    for group in msd_groups.iter_mut() {
        let mut intensities = group
            .peptide_refs
            .iter()
            .filter_map(|&ix| graph[ix].intensity)
            .collect::<Vec<_>>();
        group.intensity = median(&mut intensities);
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    match values.len() % 2 {
        0 => Some((values[mid - 1] + values[mid]) / 2.0),
        _ => Some(values[mid]),
    }
}

/// Compacted indices for the nodes that belong to an MSD group ("active"
/// nodes). Inactive nodes map to `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reindex {
    /// Arena index -> compacted index
    pub proteins: Vec<Option<usize>>,
    pub peptides: Vec<Option<usize>>,
    /// Compacted index -> arena index
    pub active_proteins: Vec<ProteinIx>,
    pub active_peptides: Vec<PeptideIx>,
}

impl Reindex {
    pub fn new(msd_groups: &[MsdGroup], protein_count: usize, peptide_count: usize) -> Self {
        let mut reindex = Reindex {
            proteins: vec![None; protein_count],
            peptides: vec![None; peptide_count],
            active_proteins: Vec::new(),
            active_peptides: Vec::new(),
        };

        for group in msd_groups {
            for &ix in &group.protein_refs {
                let slot = &mut reindex.proteins[ix.0 as usize];
                if slot.is_none() {
                    *slot = Some(reindex.active_proteins.len());
                    reindex.active_proteins.push(ix);
                }
            }
            for &ix in &group.peptide_refs {
                let slot = &mut reindex.peptides[ix.0 as usize];
                if slot.is_none() {
                    *slot = Some(reindex.active_peptides.len());
                    reindex.active_peptides.push(ix);
                }
            }
        }
        reindex
    }

    pub fn protein(&self, ix: ProteinIx) -> Option<usize> {
        self.proteins[ix.0 as usize]
    }

    pub fn peptide(&self, ix: PeptideIx) -> Option<usize> {
        self.peptides[ix.0 as usize]
    }
}
