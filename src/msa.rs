//! Multiple sequence alignment container.
//!
//! Holds digitized aligned rows with per-sequence weights, optional
//! reference (RF) consensus markup, annotation, and the three score-cutoff
//! families carried through to a finished model. A minimal aligned-FASTA
//! reader is provided for the CLI; richer alignment formats are out of
//! scope here.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::alphabet::{self, Alphabet};
use crate::error::{BuildError, Result};

/// Index of the gathering cutoff pair in [`Msa::cutoffs`].
pub const CUTOFF_GA: usize = 0;
/// Index of the trusted cutoff pair.
pub const CUTOFF_TC: usize = 1;
/// Index of the noise cutoff pair.
pub const CUTOFF_NC: usize = 2;

#[derive(Debug, Clone)]
pub struct Msa {
    pub alphabet: Alphabet,
    pub name: Option<String>,
    pub acc: Option<String>,
    pub desc: Option<String>,
    /// Per-row sequence identifiers.
    pub names: Vec<String>,
    /// Digitized rows; all the same length (the alignment width).
    pub rows: Vec<Vec<u8>>,
    /// Relative sequence weights; all 1.0 until a weighting stage runs.
    pub wgt: Vec<f64>,
    /// Reference consensus annotation line (ASCII, alignment width), if any.
    pub rf: Option<Vec<u8>>,
    /// Gathering / trusted / noise cutoff pairs, if annotated.
    pub cutoffs: [Option<(f64, f64)>; 3],
}

impl Msa {
    /// Build an alignment from text rows. Rows must be equal length and
    /// identifiers unique.
    pub fn from_rows(alphabet: Alphabet, names: Vec<String>, seqs: &[&[u8]]) -> Result<Msa> {
        if seqs.is_empty() {
            return Err(BuildError::Format("alignment has no sequences".into()));
        }
        if names.len() != seqs.len() {
            return Err(BuildError::Format(
                "alignment has mismatched name and sequence counts".into(),
            ));
        }
        let alen = seqs[0].len();
        let mut seen = FxHashSet::default();
        for (name, seq) in names.iter().zip(seqs) {
            if seq.len() != alen {
                return Err(BuildError::Format(format!(
                    "sequence {} has length {}, expected alignment width {}",
                    name,
                    seq.len(),
                    alen
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(BuildError::Format(format!(
                    "duplicate sequence identifier {}",
                    name
                )));
            }
        }
        let rows: Vec<Vec<u8>> = seqs.iter().map(|s| alphabet.digitize_seq(s)).collect();
        let nseq = rows.len();
        Ok(Msa {
            alphabet,
            name: None,
            acc: None,
            desc: None,
            names,
            rows,
            wgt: vec![1.0; nseq],
            rf: None,
            cutoffs: [None; 3],
        })
    }

    /// Read an aligned FASTA file. The alignment name defaults to the file
    /// stem.
    pub fn from_afa_path(path: &Path, alphabet: Alphabet) -> Result<Msa> {
        let reader = bio::io::fasta::Reader::from_file(path)
            .map_err(|e| BuildError::NotFound(format!("failed to open {}: {}", path.display(), e)))?;
        let mut names = Vec::new();
        let mut seqs: Vec<Vec<u8>> = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| BuildError::Format(format!("bad FASTA record: {}", e)))?;
            names.push(record.id().to_string());
            seqs.push(record.seq().to_vec());
        }
        let refs: Vec<&[u8]> = seqs.iter().map(|s| s.as_slice()).collect();
        let mut msa = Msa::from_rows(alphabet, names, &refs)?;
        msa.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
        Ok(msa)
    }

    pub fn nseq(&self) -> usize {
        self.rows.len()
    }

    /// Alignment width in columns.
    pub fn alen(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    /// Attach a reference consensus annotation line (hand architecture).
    pub fn set_rf(&mut self, rf: &[u8]) -> Result<()> {
        if rf.len() != self.alen() {
            return Err(BuildError::Format(format!(
                "reference annotation has length {}, expected alignment width {}",
                rf.len(),
                self.alen()
            )));
        }
        self.rf = Some(rf.to_vec());
        Ok(())
    }

    /// Order-sensitive 32-bit checksum over the digitized rows. Stable
    /// across runs; used to tie a finished model back to its source
    /// alignment.
    pub fn checksum(&self) -> u32 {
        let mut h: u32 = 5381;
        for row in &self.rows {
            for &c in row {
                h = h.wrapping_mul(33) ^ u32::from(c);
            }
            h = h.wrapping_mul(33) ^ 0x5a;
        }
        h
    }

    /// Fractional identity between rows `i` and `j`: identical canonical
    /// residues over aligned positions, divided by the shorter raw sequence
    /// length.
    pub fn pairwise_identity(&self, i: usize, j: usize) -> f64 {
        let (ri, rj) = (&self.rows[i], &self.rows[j]);
        let mut idents = 0usize;
        for (&a, &b) in ri.iter().zip(rj) {
            if alphabet::is_canonical(a) && a == b {
                idents += 1;
            }
        }
        let len_i = ri.iter().filter(|&&c| alphabet::is_residue(c)).count();
        let len_j = rj.iter().filter(|&&c| alphabet::is_residue(c)).count();
        let denom = len_i.min(len_j);
        if denom == 0 {
            0.0
        } else {
            idents as f64 / denom as f64
        }
    }
}
