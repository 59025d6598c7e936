//! Score matrix parsing, builtins, and file resolution.
//!
//! Matrices are plain-text tables: an optional run of `#` comment lines, a
//! header row of symbols, then one labeled row of integer scores per
//! symbol. Symbols outside the canonical alphabet (B, Z, X, `*`) are
//! ignored. Matrix files resolve against the working directory first, then
//! each directory of a colon-delimited environment variable; `-` reads
//! from standard input.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::alphabet::Alphabet;
use crate::error::{BuildError, Result};

/// BLOSUM62, standard 20-residue columns.
const BLOSUM62_TEXT: &str = "\
# BLOSUM62 substitution matrix
   A  R  N  D  C  Q  E  G  H  I  L  K  M  F  P  S  T  W  Y  V
A  4 -1 -2 -2  0 -1 -1  0 -2 -1 -1 -1 -1 -2 -1  1  0 -3 -2  0
R -1  5  0 -2 -3  1  0 -2  0 -3 -2  2 -1 -3 -2 -1 -1 -3 -2 -3
N -2  0  6  1 -3  0  0  0  1 -3 -3  0 -2 -3 -2  1  0 -4 -2 -3
D -2 -2  1  6 -3  0  2 -1 -1 -3 -4 -1 -3 -3 -1  0 -1 -4 -3 -3
C  0 -3 -3 -3  9 -3 -4 -3 -3 -1 -1 -3 -1 -2 -3 -1 -1 -2 -2 -1
Q -1  1  0  0 -3  5  2 -2  0 -3 -2  1  0 -3 -1  0 -1 -2 -1 -2
E -1  0  0  2 -4  2  5 -2  0 -3 -3  1 -2 -3 -1  0 -1 -3 -2 -2
G  0 -2  0 -1 -3 -2 -2  6 -2 -4 -4 -2 -3 -3 -2  0 -2 -2 -3 -3
H -2  0  1 -1 -3  0  0 -2  8 -3 -3 -1 -2 -1 -2 -1 -2 -2  2 -3
I -1 -3 -3 -3 -1 -3 -3 -4 -3  4  2 -3  1  0 -3 -2 -1 -3 -1  3
L -1 -2 -3 -4 -1 -2 -3 -4 -3  2  4 -2  2  0 -3 -2 -1 -2 -1  1
K -1  2  0 -1 -3  1  1 -2 -1 -3 -2  5 -1 -3 -1  0 -1 -3 -2 -2
M -1 -1 -2 -3 -1  0 -2 -3 -2  1  2 -1  5  0 -2 -1 -1 -1 -1  1
F -2 -3 -3 -3 -2 -3 -3 -3 -1  0  0 -3  0  6 -4 -2 -2  1  3 -1
P -1 -2 -2 -1 -3 -1 -1 -2 -2 -3 -3 -1 -2 -4  7 -1 -1 -4 -3 -2
S  1 -1  1  0 -1  0  0  0 -1 -2 -2  0 -1 -2 -1  4  1 -3 -2 -2
T  0 -1  0 -1 -1 -1 -1 -2 -2 -1 -1 -1 -1 -2 -1  1  5 -2 -2  0
W -3 -3 -4 -4 -2 -2 -3 -2 -2 -3 -2 -3 -1  1 -4 -3 -2 11  2 -3
Y -2 -2 -2 -3 -2 -1 -2 -3  2 -1 -1 -2 -1  3 -3 -2 -2  2  7 -1
V  0 -3 -3 -3 -1 -2 -2 -3 -3  3  1 -2  1 -1 -2 -2  0 -3 -1  4
";

/// Simple +5/-4 nucleotide matrix, the default for DNA/RNA alphabets.
const NUC_TEXT: &str = "\
# default nucleotide matrix
   A  C  G  T  U
A  5 -4 -4 -4 -4
C -4  5 -4 -4 -4
G -4 -4  5 -4 -4
T -4 -4 -4  5  5
U -4 -4 -4  5  5
";

/// A substitution score matrix restricted to an alphabet's canonical
/// residues, in digitization order.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    pub alphabet: Alphabet,
    /// `scores[a][b]`, K x K.
    pub scores: Vec<Vec<i32>>,
}

impl ScoreMatrix {
    /// Parse a plain-text matrix and restrict it to the alphabet's
    /// canonical residues.
    pub fn parse(text: &str, alphabet: &Alphabet) -> Result<ScoreMatrix> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        let header = lines
            .next()
            .ok_or_else(|| BuildError::Format("empty score matrix".into()))?;
        let col_syms: Vec<u8> = header
            .split_whitespace()
            .map(|tok| tok.as_bytes()[0].to_ascii_uppercase())
            .collect();

        let k = alphabet.k();
        let mut scores = vec![vec![i32::MIN; k]; k];
        for line in lines {
            let mut toks = line.split_whitespace();
            let label = toks
                .next()
                .ok_or_else(|| BuildError::Format("score matrix row missing label".into()))?;
            let row_sym = label.as_bytes()[0].to_ascii_uppercase();
            let a = match alphabet.symbols().iter().position(|&s| s == row_sym) {
                Some(a) => a,
                None => continue, // degenerate row, ignore
            };
            for (&col_sym, tok) in col_syms.iter().zip(toks) {
                let b = match alphabet.symbols().iter().position(|&s| s == col_sym) {
                    Some(b) => b,
                    None => continue,
                };
                let v = tok.parse::<i32>().map_err(|_| {
                    BuildError::Format(format!("bad score value {:?} in matrix", tok))
                })?;
                scores[a][b] = v;
            }
        }
        for (a, row) in scores.iter().enumerate() {
            for (b, &v) in row.iter().enumerate() {
                if v == i32::MIN {
                    return Err(BuildError::Format(format!(
                        "score matrix is missing an entry for {}/{}",
                        alphabet.decode(a as u8),
                        alphabet.decode(b as u8)
                    )));
                }
            }
        }
        Ok(ScoreMatrix { alphabet: alphabet.clone(), scores })
    }

    /// The built-in default for an alphabet: BLOSUM62 for amino, +5/-4 for
    /// nucleic. Custom alphabets have no default.
    pub fn builtin_default(alphabet: &Alphabet) -> Result<ScoreMatrix> {
        match alphabet {
            Alphabet::Amino => ScoreMatrix::parse(BLOSUM62_TEXT, alphabet),
            Alphabet::Dna | Alphabet::Rna => ScoreMatrix::parse(NUC_TEXT, alphabet),
            Alphabet::Custom(_) => Err(BuildError::InvalidConfig(
                "no built-in score matrix for a custom alphabet".into(),
            )),
        }
    }

    /// Load a matrix: `None` for the built-in default, `-` for stdin, or a
    /// path resolved against the working directory and then the
    /// colon-delimited directory list in `env`.
    pub fn load(mxfile: Option<&Path>, env: Option<&str>, alphabet: &Alphabet) -> Result<ScoreMatrix> {
        let path = match mxfile {
            None => return ScoreMatrix::builtin_default(alphabet),
            Some(p) => p,
        };
        if path.as_os_str() == "-" {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            return ScoreMatrix::parse(&text, alphabet);
        }
        let resolved = resolve_path(path, env).ok_or_else(|| {
            BuildError::NotFound(format!(
                "failed to find or open matrix file {}",
                path.display()
            ))
        })?;
        let text = std::fs::read_to_string(&resolved)?;
        ScoreMatrix::parse(&text, alphabet)
    }

    pub fn get(&self, a: usize, b: usize) -> i32 {
        self.scores[a][b]
    }

    pub fn is_symmetric(&self) -> bool {
        let k = self.scores.len();
        for a in 0..k {
            for b in (a + 1)..k {
                if self.scores[a][b] != self.scores[b][a] {
                    return false;
                }
            }
        }
        true
    }
}

fn resolve_path(path: &Path, env: Option<&str>) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }
    let var = env?;
    let dirs = std::env::var(var).ok()?;
    for dir in dirs.split(':').filter(|d| !d.is_empty()) {
        let candidate = Path::new(dir).join(path);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
