//! Experimental peptide evidence, either as a flat list of peptide
//! identifications or aggregated into consensus features.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetDecoy {
    #[serde(rename = "target")]
    Target,
    #[serde(rename = "decoy")]
    Decoy,
    #[serde(rename = "target+decoy")]
    TargetAndDecoy,
}

impl TargetDecoy {
    /// Combine two annotations of the same entity
    pub fn merge(self, other: TargetDecoy) -> TargetDecoy {
        if self == other {
            self
        } else {
            TargetDecoy::TargetAndDecoy
        }
    }
}

impl FromStr for TargetDecoy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "target" => Ok(Self::Target),
            "decoy" => Ok(Self::Decoy),
            "target+decoy" => Ok(Self::TargetAndDecoy),
            _ => Err(format!("unknown target/decoy annotation: `{}`", s)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeptideHit {
    /// Peptide sequence, possibly with modification annotations
    pub sequence: String,
    #[serde(default)]
    pub charge: i32,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub target_decoy: Option<TargetDecoy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeptideIdentification {
    #[serde(default)]
    pub rt: Option<f64>,
    #[serde(default)]
    pub mz: Option<f64>,
    /// Ranked hits, best first. Only the top hit is used as evidence.
    pub hits: Vec<PeptideHit>,
}

impl PeptideIdentification {
    pub fn top_hit(&self) -> Option<&PeptideHit> {
        self.hits.first()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusFeature {
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub file_origin: Option<String>,
    pub peptide_identifications: Vec<PeptideIdentification>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMap {
    pub features: Vec<ConsensusFeature>,
}

/// Back-reference into an identification source
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HitRef {
    /// Index of the peptide identification (flat list) or consensus feature
    pub identification: usize,
    /// Index of the identification within a consensus feature, 0 for flat lists
    pub hit: usize,
}

/// A single piece of evidence yielded by an [`IdentificationSource`]
#[derive(Clone, Debug, PartialEq)]
pub struct Observation<'a> {
    pub hit_ref: HitRef,
    pub hit: Option<&'a PeptideHit>,
    pub intensity: Option<f64>,
    pub origin: Option<&'a str>,
}

/// Uniform access to flat and aggregated evidence, so that graph building
/// and target/decoy counting are written once for both shapes.
pub trait IdentificationSource {
    /// Every peptide identification, in source order. `hit` is `None` when the
    /// identification carries no hits.
    fn observations(&self) -> Box<dyn Iterator<Item = Observation<'_>> + '_>;

    fn peptide_identification(&self, hit_ref: HitRef) -> Option<&PeptideIdentification>;

    fn peptide_hit(&self, hit_ref: HitRef) -> Option<&PeptideHit> {
        self.peptide_identification(hit_ref)
            .and_then(PeptideIdentification::top_hit)
    }
}

impl IdentificationSource for [PeptideIdentification] {
    fn observations(&self) -> Box<dyn Iterator<Item = Observation<'_>> + '_> {
        Box::new(self.iter().enumerate().map(|(ix, ident)| Observation {
            hit_ref: HitRef {
                identification: ix,
                hit: 0,
            },
            hit: ident.top_hit(),
            intensity: None,
            origin: None,
        }))
    }

    fn peptide_identification(&self, hit_ref: HitRef) -> Option<&PeptideIdentification> {
        match hit_ref.hit {
            0 => self.get(hit_ref.identification),
            _ => None,
        }
    }
}

impl IdentificationSource for Vec<PeptideIdentification> {
    fn observations(&self) -> Box<dyn Iterator<Item = Observation<'_>> + '_> {
        self.as_slice().observations()
    }

    fn peptide_identification(&self, hit_ref: HitRef) -> Option<&PeptideIdentification> {
        self.as_slice().peptide_identification(hit_ref)
    }
}

impl IdentificationSource for ConsensusMap {
    fn observations(&self) -> Box<dyn Iterator<Item = Observation<'_>> + '_> {
        Box::new(
            self.features
                .iter()
                .enumerate()
                .flat_map(|(feature_ix, feature)| {
                    feature
                        .peptide_identifications
                        .iter()
                        .enumerate()
                        .map(move |(ix, ident)| Observation {
                            hit_ref: HitRef {
                                identification: feature_ix,
                                hit: ix,
                            },
                            hit: ident.top_hit(),
                            intensity: feature.intensity,
                            origin: feature.file_origin.as_deref(),
                        })
                }),
        )
    }

    fn peptide_identification(&self, hit_ref: HitRef) -> Option<&PeptideIdentification> {
        self.features
            .get(hit_ref.identification)
            .and_then(|feature| feature.peptide_identifications.get(hit_ref.hit))
    }
}

/// Strip modification annotations from a peptide sequence: bracketed or
/// parenthesised blocks, flanking residues (`K.PEPTIDE.R`) and anything that
/// is not a letter. The result is upper-cased.
pub fn unmodified(sequence: &str) -> String {
    let core = match (sequence.find('.'), sequence.rfind('.')) {
        // Flanking residue notation: exactly one residue (or `-`) on each side
        (Some(l), Some(r)) if l == 1 && r + 2 == sequence.len() && l < r => &sequence[l + 1..r],
        _ => sequence,
    };

    let mut depth = 0usize;
    let mut s = String::with_capacity(core.len());
    for c in core.chars() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            c if depth == 0 && c.is_ascii_alphabetic() => s.push(c.to_ascii_uppercase()),
            _ => {}
        }
    }
    s
}
