use crate::graph::{Graph, PeptideIx, ProteinIx, Uniqueness};
use crate::groups::Reindex;
use itertools::Itertools;
use log::info;
use std::collections::BTreeMap;

/// Classify every active protein by its active peptide evidence.
///
/// * A peptide mapping to exactly one protein makes that protein unique
///   (primary).
/// * Proteins with identical evidence sets form an indistinguishable group.
///   The group is unique only if one of its members already is. Peptides
///   shared between the members never make the group unique.
/// * Everything else is shared (secondary).
///
/// Only sets of peptide indices are compared, so the result does not depend
/// on the order in which evidence was loaded.
pub fn classify(graph: &mut Graph, reindex: &Reindex) {
    for protein in graph.proteins.iter_mut() {
        protein.uniqueness = Uniqueness::Shared;
        protein.indistinguishable_group = None;
        protein.indistinguishable_refs.clear();
    }

    for &pep in &reindex.active_peptides {
        let refs = &graph[pep].protein_refs;
        if refs.len() == 1 {
            let only = refs[0];
            graph[only].uniqueness = Uniqueness::Unique;
        }
    }

    let mut evidence_sets: BTreeMap<Vec<PeptideIx>, Vec<ProteinIx>> = BTreeMap::new();
    for &prot in &reindex.active_proteins {
        let evidence = graph[prot]
            .peptide_refs
            .iter()
            .copied()
            .filter(|&pep| reindex.peptide(pep).is_some())
            .collect::<Vec<_>>();
        if !evidence.is_empty() {
            evidence_sets.entry(evidence).or_default().push(prot);
        }
    }

    let indistinguishable = evidence_sets
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(evidence, members)| (evidence, members.into_iter().sorted().collect_vec()))
        .sorted_by_key(|(_, members)| members[0])
        .collect_vec();

    let groups = indistinguishable.len();
    for (group, (_, members)) in indistinguishable.into_iter().enumerate() {
        let unique = members
            .iter()
            .any(|&prot| graph[prot].uniqueness == Uniqueness::Unique);

        for &prot in &members {
            let node = &mut graph[prot];
            node.indistinguishable_group = Some(group);
            node.indistinguishable_refs = members.iter().copied().filter(|&m| m != prot).collect();
            if unique {
                node.uniqueness = Uniqueness::Unique;
            }
        }
    }

    info!(
        "-  classified {} active proteins, {} unique, {} indistinguishable groups",
        reindex.active_proteins.len(),
        reindex
            .active_proteins
            .iter()
            .filter(|&&prot| graph[prot].uniqueness == Uniqueness::Unique)
            .count(),
        groups
    );
}
