//! Bipartite protein/peptide graph stored as two index-linked arenas.
//!
//! Proteins and peptides reference each other through [`ProteinIx`] and
//! [`PeptideIx`]. The peptide arena is sorted by sequence, which allows
//! lookups through binary search once the graph has been built.

use crate::enzyme::Digestion;
use crate::fasta::ProteinEntry;
use crate::identification::{unmodified, HitRef, IdentificationSource};
use crate::mass::Mass;
use crate::Diagnostic;
use log::warn;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Index, IndexMut};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct ProteinIx(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct PeptideIx(pub u32);

/// Does at least one peptide map to this protein (or its indistinguishable
/// group) and to no other protein?
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Uniqueness {
    Unique,
    #[default]
    Shared,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProteinType {
    Primary,
    Secondary,
    PrimaryIndistinguishable,
    SecondaryIndistinguishable,
}

impl ProteinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProteinType::Primary => "primary",
            ProteinType::Secondary => "secondary",
            ProteinType::PrimaryIndistinguishable => "primary_indistinguishable",
            ProteinType::SecondaryIndistinguishable => "secondary_indistinguishable",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProteinNode {
    pub index: ProteinIx,
    /// Position of the originating entry in the protein list
    pub source_ref: usize,
    pub identifier: Arc<str>,
    /// Sorted, unique
    pub peptide_refs: Vec<PeptideIx>,
    /// Monoisotopic mass of the full sequence, `None` if it contains `X`
    pub weight: Option<f32>,
    /// Percent of residues covered by experimentally observed peptides
    pub coverage: f32,
    pub num_experimental_peptides: usize,
    pub isd_group_ref: Option<usize>,
    pub msd_group_ref: Option<usize>,
    pub uniqueness: Uniqueness,
    pub indistinguishable_group: Option<usize>,
    pub indistinguishable_refs: Vec<ProteinIx>,
}

impl ProteinNode {
    pub fn protein_type(&self) -> ProteinType {
        match (self.uniqueness, self.indistinguishable_group.is_some()) {
            (Uniqueness::Unique, false) => ProteinType::Primary,
            (Uniqueness::Shared, false) => ProteinType::Secondary,
            (Uniqueness::Unique, true) => ProteinType::PrimaryIndistinguishable,
            (Uniqueness::Shared, true) => ProteinType::SecondaryIndistinguishable,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeptideNode {
    pub index: PeptideIx,
    pub sequence: String,
    /// Sorted, unique
    pub protein_refs: Vec<ProteinIx>,
    /// Observed in at least one MS run, rather than only a digestion product
    pub experimental: bool,
    /// Sorted references into the identification source
    pub evidence: Vec<HitRef>,
    /// Highest intensity of any consensus feature this peptide was observed in
    pub intensity: Option<f64>,
    pub origin: Option<String>,
    pub isd_group_ref: Option<usize>,
    pub msd_group_ref: Option<usize>,
}

impl PeptideNode {
    pub fn identification_ref(&self) -> Option<usize> {
        self.evidence.first().map(|r| r.identification)
    }

    pub fn hit_ref(&self) -> Option<usize> {
        self.evidence.first().map(|r| r.hit)
    }

    /// `None` if the sequence contains residues without a known mass
    pub fn monoisotopic(&self) -> Option<f32> {
        self.sequence.monoisotopic()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Protein(ProteinIx),
    Peptide(PeptideIx),
}

/// Visitation state for a single traversal pass. Every pass allocates its own.
pub struct Visited {
    proteins: Vec<bool>,
    peptides: Vec<bool>,
}

impl Visited {
    pub fn new(graph: &Graph) -> Self {
        Visited {
            proteins: vec![false; graph.proteins.len()],
            peptides: vec![false; graph.peptides.len()],
        }
    }

    pub fn contains(&self, node: Node) -> bool {
        match node {
            Node::Protein(ix) => self.proteins[ix.0 as usize],
            Node::Peptide(ix) => self.peptides[ix.0 as usize],
        }
    }

    /// Returns `true` if the node had not been visited before
    fn insert(&mut self, node: Node) -> bool {
        let slot = match node {
            Node::Protein(ix) => &mut self.proteins[ix.0 as usize],
            Node::Peptide(ix) => &mut self.peptides[ix.0 as usize],
        };
        !std::mem::replace(slot, true)
    }
}

/// Members of a connected component, in discovery order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Component {
    pub proteins: Vec<ProteinIx>,
    pub peptides: Vec<PeptideIx>,
}

impl Component {
    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty() && self.peptides.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Graph {
    pub proteins: Vec<ProteinNode>,
    pub peptides: Vec<PeptideNode>,
}

impl Graph {
    /// Panics if the arenas are not consistent: indices must match positions,
    /// peptides must be strictly sorted by sequence and every edge must be
    /// in bounds and present on both sides.
    pub fn new(proteins: Vec<ProteinNode>, peptides: Vec<PeptideNode>) -> Self {
        assert!(
            peptides.windows(2).all(|w| w[0].sequence < w[1].sequence),
            "BUG: peptide arena is not sorted by sequence"
        );
        for (ix, protein) in proteins.iter().enumerate() {
            assert_eq!(protein.index.0 as usize, ix, "BUG: protein index mismatch");
            for pep in &protein.peptide_refs {
                let peptide = peptides
                    .get(pep.0 as usize)
                    .unwrap_or_else(|| panic!("BUG: {:?} is out of bounds", pep));
                assert!(
                    peptide.protein_refs.binary_search(&protein.index).is_ok(),
                    "BUG: edge {:?} -> {:?} is not bidirectional",
                    protein.index,
                    pep
                );
            }
        }
        for (ix, peptide) in peptides.iter().enumerate() {
            assert_eq!(peptide.index.0 as usize, ix, "BUG: peptide index mismatch");
            assert!(
                peptide
                    .protein_refs
                    .iter()
                    .all(|prot| (prot.0 as usize) < proteins.len()),
                "BUG: peptide `{}` references a protein out of bounds",
                peptide.sequence
            );
        }
        Graph { proteins, peptides }
    }

    /// Binary search over the sorted peptide arena
    pub fn find_peptide(&self, sequence: &str) -> Option<PeptideIx> {
        self.peptides
            .binary_search_by(|node| node.sequence.as_str().cmp(sequence))
            .ok()
            .map(|ix| PeptideIx(ix as u32))
    }

    pub fn protein_ixs(&self) -> impl Iterator<Item = ProteinIx> {
        (0..self.proteins.len() as u32).map(ProteinIx)
    }

    pub fn peptide_ixs(&self) -> impl Iterator<Item = PeptideIx> {
        (0..self.peptides.len() as u32).map(PeptideIx)
    }

    /// Does this node carry experimental evidence?
    pub fn is_evidenced(&self, node: Node) -> bool {
        match node {
            Node::Protein(ix) => self[ix].num_experimental_peptides > 0,
            Node::Peptide(ix) => self[ix].experimental,
        }
    }

    /// Collect the connected component containing `seed`, alternating between
    /// proteins and peptides. Only nodes for which `follow` returns `true` are
    /// entered, and nodes already in `visited` are skipped, so every node is
    /// visited at most once per pass.
    pub fn component<F>(&self, seed: Node, visited: &mut Visited, follow: F) -> Component
    where
        F: Fn(Node) -> bool,
    {
        let mut component = Component::default();
        if visited.contains(seed) || !follow(seed) {
            return component;
        }
        visited.insert(seed);

        let mut stack = vec![seed];
        while let Some(node) = stack.pop() {
            match node {
                Node::Protein(ix) => {
                    component.proteins.push(ix);
                    for &pep in &self[ix].peptide_refs {
                        let next = Node::Peptide(pep);
                        if !visited.contains(next) && follow(next) {
                            visited.insert(next);
                            stack.push(next);
                        }
                    }
                }
                Node::Peptide(ix) => {
                    component.peptides.push(ix);
                    for &prot in &self[ix].protein_refs {
                        let next = Node::Protein(prot);
                        if !visited.contains(next) && follow(next) {
                            visited.insert(next);
                            stack.push(next);
                        }
                    }
                }
            }
        }
        component
    }
}

impl Index<ProteinIx> for Graph {
    type Output = ProteinNode;

    fn index(&self, index: ProteinIx) -> &Self::Output {
        &self.proteins[index.0 as usize]
    }
}

impl IndexMut<ProteinIx> for Graph {
    fn index_mut(&mut self, index: ProteinIx) -> &mut Self::Output {
        &mut self.proteins[index.0 as usize]
    }
}

impl Index<PeptideIx> for Graph {
    type Output = PeptideNode;

    fn index(&self, index: PeptideIx) -> &Self::Output {
        &self.peptides[index.0 as usize]
    }
}

impl IndexMut<PeptideIx> for Graph {
    fn index_mut(&mut self, index: PeptideIx) -> &mut Self::Output {
        &mut self.peptides[index.0 as usize]
    }
}

#[derive(Default)]
struct PeptideDraft {
    /// Positions in `GraphBuilder::proteins`
    proteins: BTreeSet<u32>,
    evidence: Vec<HitRef>,
    intensity: Option<f64>,
    origin: Option<String>,
}

/// Accumulates digestion products and experimental evidence, then lays them
/// out as a [`Graph`].
pub struct GraphBuilder<'a> {
    proteins: Vec<(usize, &'a ProteinEntry)>,
    peptides: BTreeMap<String, PeptideDraft>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> GraphBuilder<'a> {
    /// Digest every protein. Proteins the digestion rejects are skipped and
    /// reported as diagnostics.
    pub fn new<D: Digestion + ?Sized>(proteins: &'a [ProteinEntry], digestion: &D) -> Self {
        let mut builder = GraphBuilder {
            proteins: Vec::with_capacity(proteins.len()),
            peptides: BTreeMap::new(),
            diagnostics: Vec::new(),
        };

        for (source_ref, entry) in proteins.iter().enumerate() {
            let digests = match digestion.digest(&entry.sequence) {
                Ok(digests) => digests,
                Err(e) => {
                    warn!("skipping protein `{}`: {}", entry.identifier, e);
                    builder.diagnostics.push(Diagnostic::malformed_protein(format!(
                        "skipping protein `{}`: {}",
                        entry.identifier, e
                    )));
                    continue;
                }
            };

            let position = builder.proteins.len() as u32;
            builder.proteins.push((source_ref, entry));
            for digest in digests {
                builder
                    .peptides
                    .entry(digest.sequence)
                    .or_default()
                    .proteins
                    .insert(position);
            }
        }
        builder
    }

    /// Mark every top-hit sequence of `source` as experimentally observed.
    /// Sequences that no protein produced are added as peptides without
    /// protein links. Returns the number of peptides that became experimental.
    pub fn include_experimental<S: IdentificationSource + ?Sized>(&mut self, source: &S) -> usize {
        let mark = self.diagnostics.len();
        let mut found = 0;
        for observation in source.observations() {
            let hit = match observation.hit {
                Some(hit) => hit,
                None => {
                    self.diagnostics
                        .push(Diagnostic::malformed_identification(format!(
                            "identification {:?} has no hits",
                            observation.hit_ref
                        )));
                    continue;
                }
            };

            let sequence = unmodified(&hit.sequence);
            if sequence.is_empty() {
                self.diagnostics
                    .push(Diagnostic::malformed_identification(format!(
                        "identification {:?} has an empty sequence: `{}`",
                        observation.hit_ref, hit.sequence
                    )));
                continue;
            }

            let draft = self.peptides.entry(sequence).or_default();
            if draft.evidence.is_empty() {
                found += 1;
            }
            draft.evidence.push(observation.hit_ref);
            if let Some(intensity) = observation.intensity {
                draft.intensity = Some(draft.intensity.map_or(intensity, |i| i.max(intensity)));
            }
            if draft.origin.is_none() {
                draft.origin = observation.origin.map(String::from);
            }
        }

        let dropped = self.dropped_since(mark);
        if dropped > 0 {
            warn!("{} identifications without a usable top hit", dropped);
        }
        found
    }

    /// Identifications rejected after the first `mark` diagnostics
    fn dropped_since(&self, mark: usize) -> usize {
        self.diagnostics[mark..]
            .iter()
            .filter(|d| d.kind == crate::DiagnosticKind::MalformedIdentification)
            .count()
    }

    pub fn build(self) -> (Graph, Vec<Diagnostic>) {
        let mut proteins = self
            .proteins
            .iter()
            .enumerate()
            .map(|(ix, (source_ref, entry))| ProteinNode {
                index: ProteinIx(ix as u32),
                source_ref: *source_ref,
                identifier: entry.identifier.clone(),
                peptide_refs: Vec::new(),
                weight: entry.sequence.monoisotopic(),
                coverage: 0.0,
                num_experimental_peptides: 0,
                isd_group_ref: None,
                msd_group_ref: None,
                uniqueness: Uniqueness::Shared,
                indistinguishable_group: None,
                indistinguishable_refs: Vec::new(),
            })
            .collect::<Vec<_>>();

        // BTreeMap iteration yields sequences in sorted order, and each
        // protein receives its peptides in increasing index order
        let peptides = self
            .peptides
            .into_iter()
            .enumerate()
            .map(|(ix, (sequence, mut draft))| {
                let index = PeptideIx(ix as u32);
                let experimental = !draft.evidence.is_empty();
                for &prot in &draft.proteins {
                    let protein = &mut proteins[prot as usize];
                    protein.peptide_refs.push(index);
                    if experimental {
                        protein.num_experimental_peptides += 1;
                    }
                }
                draft.evidence.sort();
                PeptideNode {
                    index,
                    sequence,
                    protein_refs: draft.proteins.into_iter().map(ProteinIx).collect(),
                    experimental,
                    evidence: draft.evidence,
                    intensity: draft.intensity,
                    origin: draft.origin,
                    isd_group_ref: None,
                    msd_group_ref: None,
                }
            })
            .collect::<Vec<_>>();

        for (protein, (_, entry)) in proteins.iter_mut().zip(&self.proteins) {
            protein.coverage = coverage(
                &entry.sequence,
                protein
                    .peptide_refs
                    .iter()
                    .map(|ix| &peptides[ix.0 as usize])
                    .filter(|peptide| peptide.experimental)
                    .map(|peptide| peptide.sequence.as_str()),
            );
        }

        (Graph::new(proteins, peptides), self.diagnostics)
    }
}

/// Percent of `sequence` covered by (possibly overlapping) occurrences of `peptides`
fn coverage<'s, I: Iterator<Item = &'s str>>(sequence: &str, peptides: I) -> f32 {
    if sequence.is_empty() {
        return 0.0;
    }
    let mut covered = vec![false; sequence.len()];
    for peptide in peptides {
        let mut start = 0;
        while let Some(pos) = sequence[start..].find(peptide) {
            let begin = start + pos;
            covered[begin..begin + peptide.len()]
                .iter_mut()
                .for_each(|c| *c = true);
            start = begin + 1;
            if start >= sequence.len() {
                break;
            }
        }
    }
    100.0 * covered.iter().filter(|c| **c).count() as f32 / sequence.len() as f32
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::enzyme::{Cleavage, EnzymeParameters};
    use crate::identification::{PeptideHit, PeptideIdentification};

    fn lys_c() -> EnzymeParameters {
        EnzymeParameters {
            missed_cleavages: 0,
            min_len: 3,
            max_len: 50,
            cleavage: Cleavage::new("K", None, true),
        }
    }

    fn ident(sequence: &str) -> PeptideIdentification {
        PeptideIdentification {
            hits: vec![PeptideHit {
                sequence: sequence.into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn shared_peptide_links_proteins() {
        let proteins = vec![
            ProteinEntry::new("P1", "AAAKHHHK"),
            ProteinEntry::new("P2", "CCCKHHHK"),
        ];
        let (graph, diagnostics) = GraphBuilder::new(&proteins, &lys_c()).build();
        assert!(diagnostics.is_empty());

        let sequences = graph
            .peptides
            .iter()
            .map(|p| p.sequence.as_str())
            .collect::<Vec<_>>();
        assert_eq!(sequences, vec!["AAAK", "CCCK", "HHHK"]);

        let shared = graph.find_peptide("HHHK").unwrap();
        assert_eq!(graph[shared].protein_refs, vec![ProteinIx(0), ProteinIx(1)]);
        assert_eq!(graph[ProteinIx(0)].peptide_refs, vec![PeptideIx(0), PeptideIx(2)]);
        assert_eq!(graph[ProteinIx(1)].peptide_refs, vec![PeptideIx(1), PeptideIx(2)]);
        assert!(graph.find_peptide("DDDK").is_none());
    }

    #[test]
    fn experimental_evidence_and_orphans() {
        let proteins = vec![ProteinEntry::new("P1", "AAAKHHHK")];
        let idents = vec![
            ident("HHHK"),
            ident("K.HHHK.A"),
            ident("XXXK"),
            PeptideIdentification::default(),
        ];

        let mut builder = GraphBuilder::new(&proteins, &lys_c());
        assert_eq!(builder.include_experimental(idents.as_slice()), 2);
        let (graph, diagnostics) = builder.build();
        assert_eq!(diagnostics.len(), 1);

        let hhhk = &graph[graph.find_peptide("HHHK").unwrap()];
        assert!(hhhk.experimental);
        assert_eq!(hhhk.evidence.len(), 2);
        assert_eq!(hhhk.identification_ref(), Some(0));
        assert_eq!(hhhk.hit_ref(), Some(0));

        let orphan = &graph[graph.find_peptide("XXXK").unwrap()];
        assert!(orphan.experimental);
        assert!(orphan.protein_refs.is_empty());
        assert_eq!(orphan.monoisotopic(), None);
        assert!(hhhk.monoisotopic().is_some());

        let protein = &graph[ProteinIx(0)];
        assert_eq!(protein.num_experimental_peptides, 1);
        assert!((protein.coverage - 50.0).abs() < 1e-4);
        assert!(protein.weight.is_some());
    }

    #[test]
    fn malformed_protein_is_skipped() {
        let proteins = vec![
            ProteinEntry::new("bad", "AAA1K"),
            ProteinEntry::new("good", "AAAKHHHK"),
        ];
        let (graph, diagnostics) = GraphBuilder::new(&proteins, &lys_c()).build();
        assert_eq!(graph.proteins.len(), 1);
        assert_eq!(graph[ProteinIx(0)].source_ref, 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, crate::DiagnosticKind::MalformedProtein);
    }

    #[test]
    fn dropped_identifications_per_call() {
        let proteins = vec![ProteinEntry::new("P1", "AAAKHHHK")];
        let mut builder = GraphBuilder::new(&proteins, &lys_c());

        let mark = builder.diagnostics.len();
        builder.include_experimental([PeptideIdentification::default(), ident("[+42]")].as_slice());
        assert_eq!(builder.dropped_since(mark), 2);

        let mark = builder.diagnostics.len();
        assert_eq!(builder.include_experimental([ident("AAAK")].as_slice()), 1);
        assert_eq!(builder.dropped_since(mark), 0);

        let (_, diagnostics) = builder.build();
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn ambiguous_residues_are_digested() {
        let proteins = vec![
            ProteinEntry::new("P1", "AAAKBBBK"),
            ProteinEntry::new("P2", "CCCKXBBK"),
        ];
        let (graph, diagnostics) = GraphBuilder::new(&proteins, &lys_c()).build();
        assert!(diagnostics.is_empty());
        assert_eq!(graph.proteins.len(), 2);
        assert!(graph[ProteinIx(0)].weight.is_some());
        assert_eq!(graph[ProteinIx(1)].weight, None);

        let asx = graph.find_peptide("BBBK").unwrap();
        assert_eq!(graph[asx].protein_refs, vec![ProteinIx(0)]);
        assert!(graph[asx].monoisotopic().is_some());
    }

    #[test]
    fn traversal_respects_predicate() {
        let proteins = vec![
            ProteinEntry::new("P1", "AAAKHHHK"),
            ProteinEntry::new("P2", "CCCKHHHK"),
            ProteinEntry::new("P3", "DDDK"),
        ];
        let (graph, _) = GraphBuilder::new(&proteins, &lys_c()).build();

        let mut visited = Visited::new(&graph);
        let all = graph.component(Node::Protein(ProteinIx(0)), &mut visited, |_| true);
        assert_eq!(all.proteins.len(), 2);
        assert_eq!(all.peptides.len(), 3);

        // Already visited: nothing new
        let again = graph.component(Node::Protein(ProteinIx(1)), &mut visited, |_| true);
        assert!(again.is_empty());

        let mut visited = Visited::new(&graph);
        let blocked = graph.component(Node::Protein(ProteinIx(0)), &mut visited, |node| {
            node != Node::Peptide(graph.find_peptide("HHHK").unwrap())
        });
        assert_eq!(blocked.proteins, vec![ProteinIx(0)]);
        assert_eq!(blocked.peptides.len(), 1);
    }

    #[test]
    fn overlapping_coverage() {
        assert_eq!(coverage("AAAA", ["AA"].into_iter()), 100.0);
        assert_eq!(coverage("ABCD", ["XY"].into_iter()), 0.0);
        assert_eq!(coverage("ABCDABCD", ["BC"].into_iter()), 50.0);
    }

    #[test]
    #[should_panic]
    fn unsorted_arena_panics() {
        let peptide = |ix: u32, sequence: &str| PeptideNode {
            index: PeptideIx(ix),
            sequence: sequence.into(),
            protein_refs: vec![],
            experimental: false,
            evidence: vec![],
            intensity: None,
            origin: None,
            isd_group_ref: None,
            msd_group_ref: None,
        };
        Graph::new(vec![], vec![peptide(0, "HHH"), peptide(1, "AAA")]);
    }
}
