use fnv::FnvHashSet;
use regex::Regex;

use crate::mass::{is_residue, VALID_AA};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
/// A peptide produced by digesting a protein
pub struct Digest {
    pub sequence: String,
    /// Number of cleavage sites spanned by this peptide
    pub missed_cleavages: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    #[error("empty protein sequence")]
    EmptySequence,
    /// Neither a standard residue nor an ambiguity code, with its 0-based position
    #[error("invalid residue '{residue}' at position {position}")]
    InvalidResidue { position: usize, residue: char },
}

/// Produces the candidate peptides of a protein sequence.
///
/// Implementations must return each distinct peptide at most once, and must
/// reject (rather than silently digest) sequences they cannot interpret.
pub trait Digestion {
    fn digest(&self, sequence: &str) -> Result<Vec<Digest>, DigestError>;
}

/// Site-specific protease
pub struct Enzyme {
    regex: Regex,
    /// Do not cleave if the site is followed by this residue
    pub restrict: Option<char>,
    /// Cleave after (true) or before (false) the matched residue
    pub c_terminal: bool,
}

pub enum Cleavage {
    /// Proteins are kept intact
    Disabled,
    /// Every subsequence within the length limits
    Nonspecific,
    Enzyme(Enzyme),
}

impl Cleavage {
    /// `cleave_at` is either a set of residues, `"$"` to disable digestion,
    /// or `""` for a non-specific digest.
    pub fn new(cleave_at: &str, restrict: Option<char>, c_terminal: bool) -> Self {
        assert!(
            cleave_at == "$" || cleave_at.bytes().all(|aa| VALID_AA.contains(&aa)),
            "cleavage residues contain non-amino acid characters: {}",
            cleave_at
        );
        assert!(
            restrict.map_or(true, |aa| aa.is_ascii() && VALID_AA.contains(&(aa as u8))),
            "cleavage restriction is a non-amino acid character: {:?}",
            restrict
        );

        match cleave_at {
            "$" => Cleavage::Disabled,
            "" => Cleavage::Nonspecific,
            residues => Cleavage::Enzyme(Enzyme {
                regex: Regex::new(&format!("[{}]", residues))
                    .expect("residue class is a valid regex"),
                restrict,
                c_terminal,
            }),
        }
    }
}

impl Enzyme {
    /// Positions between residues where the sequence is cut, including both
    /// ends of the sequence. Sorted and unique.
    fn boundaries(&self, sequence: &str) -> Vec<usize> {
        let mut cuts = vec![0];
        cuts.extend(
            self.regex
                .find_iter(sequence)
                .map(|site| match self.c_terminal {
                    true => site.end(),
                    false => site.start(),
                })
                .filter(|&cut| match self.restrict {
                    Some(aa) => !sequence[cut..].starts_with(aa),
                    None => true,
                }),
        );
        cuts.push(sequence.len());
        cuts.dedup();
        cuts
    }
}

pub struct EnzymeParameters {
    /// Maximum number of cleavage sites a peptide may span
    pub missed_cleavages: u8,
    /// Inclusive
    pub min_len: usize,
    /// Inclusive
    pub max_len: usize,
    pub cleavage: Cleavage,
}

impl EnzymeParameters {
    fn validate(sequence: &str) -> Result<(), DigestError> {
        if sequence.is_empty() {
            return Err(DigestError::EmptySequence);
        }
        match sequence
            .bytes()
            .enumerate()
            .find(|(_, aa)| !is_residue(*aa))
        {
            Some((position, residue)) => Err(DigestError::InvalidResidue {
                position,
                residue: residue as char,
            }),
            None => Ok(()),
        }
    }

    fn accepts(&self, len: usize) -> bool {
        len > 0 && len >= self.min_len && len <= self.max_len
    }

    fn nonspecific(&self, sequence: &str) -> Vec<Digest> {
        let mut seen = FnvHashSet::default();
        let mut digests = Vec::new();
        for len in self.min_len.max(1)..=self.max_len.min(sequence.len()) {
            for start in 0..=sequence.len() - len {
                let peptide = &sequence[start..start + len];
                if seen.insert(peptide) {
                    digests.push(Digest {
                        sequence: peptide.into(),
                        missed_cleavages: 0,
                    });
                }
            }
        }
        digests
    }

    fn specific(&self, sequence: &str, cuts: &[usize]) -> Vec<Digest> {
        // A protein may contain the same peptide more than once
        let mut seen = FnvHashSet::default();
        let mut digests = Vec::new();
        for missed in 0..=self.missed_cleavages {
            let span = missed as usize + 1;
            for window in cuts.windows(span + 1) {
                let peptide = &sequence[window[0]..window[span]];
                if self.accepts(peptide.len()) && seen.insert(peptide) {
                    digests.push(Digest {
                        sequence: peptide.into(),
                        missed_cleavages: missed,
                    });
                }
            }
        }
        digests
    }
}

impl Digestion for EnzymeParameters {
    fn digest(&self, sequence: &str) -> Result<Vec<Digest>, DigestError> {
        Self::validate(sequence)?;
        Ok(match &self.cleavage {
            Cleavage::Disabled => self.specific(sequence, &[0, sequence.len()]),
            Cleavage::Nonspecific => self.nonspecific(sequence),
            Cleavage::Enzyme(enzyme) => self.specific(sequence, &enzyme.boundaries(sequence)),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parameters(cleavage: Cleavage, missed_cleavages: u8, min_len: usize) -> EnzymeParameters {
        EnzymeParameters {
            missed_cleavages,
            min_len,
            max_len: 50,
            cleavage,
        }
    }

    fn sequences(params: &EnzymeParameters, sequence: &str) -> Vec<String> {
        params
            .digest(sequence)
            .unwrap()
            .into_iter()
            .map(|d| d.sequence)
            .collect()
    }

    #[test]
    fn trypsin_skips_proline() {
        let tryp = parameters(Cleavage::new("KR", Some('P'), true), 0, 2);
        assert_eq!(
            sequences(&tryp, "MKPLLRAGKWERPQK"),
            vec!["MKPLLR", "AGK", "WERPQK"]
        );
    }

    #[test]
    fn trypsin_missed_cleavage() {
        let tryp = parameters(Cleavage::new("KR", Some('P'), true), 1, 1);
        assert_eq!(
            sequences(&tryp, "MKPLLRAGKWERPQK"),
            vec!["MKPLLR", "AGK", "WERPQK", "MKPLLRAGK", "AGKWERPQK"]
        );
    }

    #[test]
    fn missed_cleavage_count() {
        let lys_c = parameters(Cleavage::new("K", None, true), 2, 1);
        let digests = lys_c.digest("AAAKHHHKCCCK").unwrap();
        let joined = digests
            .iter()
            .find(|d| d.sequence == "AAAKHHHKCCCK")
            .unwrap();
        assert_eq!(joined.missed_cleavages, 2);
        assert_eq!(digests.len(), 6);
    }

    #[test]
    fn n_terminal_cleavage() {
        let asp_n = parameters(Cleavage::new("D", None, false), 0, 1);
        assert_eq!(sequences(&asp_n, "MADEEKDPG"), vec!["MA", "DEEK", "DPG"]);
        // A site at the very start produces no empty peptide
        assert_eq!(sequences(&asp_n, "DAAA"), vec!["DAAA"]);
    }

    #[test]
    fn nonspecific() {
        let params = EnzymeParameters {
            min_len: 3,
            max_len: 3,
            missed_cleavages: 2,
            cleavage: Cleavage::new("", None, true),
        };
        assert_eq!(
            sequences(&params, "PEPTIDE"),
            vec!["PEP", "EPT", "PTI", "TID", "IDE"]
        );
    }

    #[test]
    fn disabled() {
        let sequence = "MADEEKLPPGWEKRMSR";
        let params = parameters(Cleavage::new("$", None, true), 2, 0);
        assert_eq!(sequences(&params, sequence), vec![sequence]);

        let short = EnzymeParameters {
            max_len: 10,
            ..parameters(Cleavage::new("$", None, true), 0, 0)
        };
        assert!(sequences(&short, sequence).is_empty());
    }

    #[test]
    fn repeated_peptides_are_unique() {
        let lys_c = parameters(Cleavage::new("K", None, true), 0, 2);
        assert_eq!(sequences(&lys_c, "GGGKAAAKGGGK"), vec!["GGGK", "AAAK"]);
    }

    #[test]
    fn reject_malformed() {
        let tryp = parameters(Cleavage::new("KR", Some('P'), true), 0, 2);
        assert_eq!(tryp.digest(""), Err(DigestError::EmptySequence));
        assert_eq!(
            tryp.digest("PEPT1DEK"),
            Err(DigestError::InvalidResidue {
                position: 4,
                residue: '1'
            })
        );
        assert_eq!(
            tryp.digest("PEPT1DEK").unwrap_err().to_string(),
            "invalid residue '1' at position 4"
        );
    }

    #[test]
    fn ambiguity_codes_are_residues() {
        let lys_c = parameters(Cleavage::new("K", None, true), 0, 3);
        assert_eq!(sequences(&lys_c, "AAAKBBBKJZXK"), vec!["AAAK", "BBBK", "JZXK"]);
    }

    #[test]
    #[should_panic]
    fn invalid_cleavage_residue() {
        Cleavage::new("K1", None, true);
    }

    #[test]
    #[should_panic]
    fn non_ascii_restriction() {
        // U+0141 truncates to b'A'
        Cleavage::new("K", Some('\u{141}'), true);
    }
}
