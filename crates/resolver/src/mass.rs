pub const H2O: f32 = 18.010565;

pub const VALID_AA: [u8; 22] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y', b'U', b'O',
];

/// Ambiguity codes: B (N or D), J (I or L), Z (Q or E) and X (any residue)
pub const AMBIGUOUS_AA: [u8; 4] = [b'B', b'J', b'X', b'Z'];

/// Can this residue appear in a protein sequence?
pub fn is_residue(aa: u8) -> bool {
    VALID_AA.contains(&aa) || AMBIGUOUS_AA.contains(&aa)
}

pub trait Mass {
    /// `None` if the mass is unknown
    fn monoisotopic(&self) -> Option<f32>;
}

impl Mass for u8 {
    fn monoisotopic(&self) -> Option<f32> {
        let mass = match self {
            b'A' => 71.03711,
            b'R' => 156.1011,
            b'N' => 114.04293,
            b'D' => 115.02694,
            b'C' => 103.00919,
            b'E' => 129.04259,
            b'Q' => 128.05858,
            b'G' => 57.02146,
            b'H' => 137.05891,
            b'I' | b'L' | b'J' => 113.08406,
            b'K' => 128.09496,
            b'M' => 131.0405,
            b'F' => 147.0684,
            b'P' => 97.05276,
            b'S' => 87.03203,
            b'T' => 101.04768,
            b'W' => 186.07931,
            b'Y' => 163.06333,
            b'V' => 99.06841,
            b'U' => 150.95363,
            b'O' => 237.14773,
            // Averages of the two residues the code stands for
            b'B' => 114.534935,
            b'Z' => 128.550585,
            _ => return None,
        };
        Some(mass)
    }
}

impl Mass for str {
    /// Monoisotopic mass of an unmodified sequence, including the terminal water
    fn monoisotopic(&self) -> Option<f32> {
        self.bytes()
            .map(|aa| aa.monoisotopic())
            .sum::<Option<f32>>()
            .map(|mass| mass + H2O)
    }
}
