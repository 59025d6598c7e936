//! Biological alphabets and residue digitization.
//!
//! Sequences are held internally as digitized residue codes `0..K-1` plus
//! two sentinel codes for gaps and unrecognized symbols. The alphabet
//! identity also selects the prior distribution and the relative-entropy
//! floor used by the entropy-weighting strategy.

/// Digitized code for a gap character (`-`, `.`, `_`, `~`).
pub const GAP: u8 = 0xff;

/// Digitized code for a symbol outside the canonical alphabet (degenerate
/// or unknown residues). Counts toward column occupancy but contributes no
/// emission count.
pub const UNKNOWN: u8 = 0xfe;

/// Canonical amino acid symbols, in digitization order.
pub const AMINO_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Canonical DNA symbols.
pub const DNA_SYMBOLS: &[u8] = b"ACGT";

/// Canonical RNA symbols.
pub const RNA_SYMBOLS: &[u8] = b"ACGU";

/// Identity of the residue alphabet a model is built in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alphabet {
    Amino,
    Dna,
    Rna,
    /// A caller-supplied symbol set; gets the Laplace fallback prior.
    Custom(Vec<u8>),
}

impl Alphabet {
    /// Number of canonical residues.
    pub fn k(&self) -> usize {
        self.symbols().len()
    }

    /// Canonical symbol table, in digitization order.
    pub fn symbols(&self) -> &[u8] {
        match self {
            Alphabet::Amino => AMINO_SYMBOLS,
            Alphabet::Dna => DNA_SYMBOLS,
            Alphabet::Rna => RNA_SYMBOLS,
            Alphabet::Custom(s) => s,
        }
    }

    /// Digitize one symbol. Case-insensitive; gap characters map to [`GAP`],
    /// anything else outside the canonical set maps to [`UNKNOWN`].
    pub fn digitize(&self, c: u8) -> u8 {
        if matches!(c, b'-' | b'.' | b'_' | b'~') {
            return GAP;
        }
        let up = c.to_ascii_uppercase();
        match self.symbols().iter().position(|&s| s == up) {
            Some(i) => i as u8,
            None => UNKNOWN,
        }
    }

    /// Digitize a whole row, preserving alignment columns.
    pub fn digitize_seq(&self, text: &[u8]) -> Vec<u8> {
        text.iter().map(|&c| self.digitize(c)).collect()
    }

    /// Text symbol for a digitized code.
    pub fn decode(&self, code: u8) -> char {
        match code {
            GAP => '-',
            UNKNOWN => 'X',
            c => self.symbols()[c as usize] as char,
        }
    }

    /// Parse an alphabet name as used on the command line.
    pub fn from_name(name: &str) -> Option<Alphabet> {
        match name.to_ascii_lowercase().as_str() {
            "amino" | "protein" | "aa" => Some(Alphabet::Amino),
            "dna" => Some(Alphabet::Dna),
            "rna" => Some(Alphabet::Rna),
            _ => None,
        }
    }
}

/// True when a digitized code is a canonical residue.
#[inline]
pub fn is_residue(code: u8) -> bool {
    code != GAP
}

/// True when a digitized code carries an emission count.
#[inline]
pub fn is_canonical(code: u8) -> bool {
    code != GAP && code != UNKNOWN
}
