//! The model under construction.
//!
//! An [`Hmm`] starts life holding relative-weighted observed counts (from
//! the architecture stage), is rescaled to the effective sequence number,
//! and becomes a normalized probability model after parameterization. The
//! same struct carries the annotation and calibration results stamped by
//! the later stages.

use std::io::Write;

use crate::alphabet::Alphabet;
use crate::error::Result;
use crate::hmm::background::Bg;

/// Transition index: M(k) -> M(k+1). At node M this is the M -> E exit.
pub const T_MM: usize = 0;
/// M(k) -> I(k).
pub const T_MI: usize = 1;
/// M(k) -> D(k+1).
pub const T_MD: usize = 2;
/// I(k) -> M(k+1). At node M this is the I -> E exit.
pub const T_IM: usize = 3;
/// I(k) -> I(k).
pub const T_II: usize = 4;
/// D(k) -> M(k+1). At node M this is the D -> E exit.
pub const T_DM: usize = 5;
/// D(k) -> D(k+1).
pub const T_DD: usize = 6;

/// E-value parameters fitted by calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalueParams {
    /// Gumbel slope shared by both score distributions.
    pub lambda: f64,
    /// Gumbel location for Viterbi scores.
    pub vit_mu: f64,
    /// Exponential-tail location for Forward scores.
    pub fwd_tau: f64,
    /// Tail mass the Forward fit was anchored at.
    pub tail_mass: f64,
}

#[derive(Debug, Clone)]
pub struct Hmm {
    pub alphabet: Alphabet,
    /// Number of nodes (consensus positions).
    pub m: usize,
    /// Match emissions, `mat[k][a]` for nodes `1..=m`; row 0 unused.
    pub mat: Vec<Vec<f64>>,
    /// Insert emissions, `ins[k][a]` for nodes `0..=m`.
    pub ins: Vec<Vec<f64>>,
    /// Transitions `t[k][T_*]` for nodes `0..=m`; node 0 holds the begin
    /// transitions, node `m` holds the exits.
    pub t: Vec<[f64; 7]>,
    /// Nominal number of sequences the counts came from.
    pub nseq: usize,
    /// Effective sequence number; equals `nseq` until the effective-number
    /// stage runs.
    pub eff_nseq: f64,
    pub name: Option<String>,
    pub acc: Option<String>,
    pub desc: Option<String>,
    /// Construction timestamp.
    pub ctime: Option<String>,
    /// Checksum of the source alignment.
    pub checksum: Option<u32>,
    /// Model residue composition.
    pub compo: Option<Vec<f64>>,
    /// Gathering / trusted / noise cutoff pairs copied from the alignment.
    pub cutoffs: [Option<(f64, f64)>; 3],
    pub evparams: Option<EvalueParams>,
}

impl Hmm {
    /// A zeroed model with `m` nodes, ready to collect counts.
    pub fn new(alphabet: Alphabet, m: usize) -> Hmm {
        let k = alphabet.k();
        Hmm {
            alphabet,
            m,
            mat: vec![vec![0.0; k]; m + 1],
            ins: vec![vec![0.0; k]; m + 1],
            t: vec![[0.0; 7]; m + 1],
            nseq: 0,
            eff_nseq: 0.0,
            name: None,
            acc: None,
            desc: None,
            ctime: None,
            checksum: None,
            compo: None,
            cutoffs: [None; 3],
            evparams: None,
        }
    }

    /// Scale every count in the model by `ratio`. Used to rescale observed
    /// counts to the effective sequence number.
    pub fn scale(&mut self, ratio: f64) {
        for row in self.mat.iter_mut().chain(self.ins.iter_mut()) {
            for v in row.iter_mut() {
                *v *= ratio;
            }
        }
        for row in self.t.iter_mut() {
            for v in row.iter_mut() {
                *v *= ratio;
            }
        }
    }

    /// Average match-emission distribution over all nodes. Only meaningful
    /// once the model holds probabilities.
    pub fn set_composition(&mut self) {
        let k = self.alphabet.k();
        let mut compo = vec![0.0; k];
        for node in self.mat.iter().skip(1) {
            for (a, &p) in node.iter().enumerate() {
                compo[a] += p;
            }
        }
        if self.m > 0 {
            for v in compo.iter_mut() {
                *v /= self.m as f64;
            }
        }
        self.compo = Some(compo);
    }

    /// Mean relative entropy (bits per match position) of the match
    /// emissions versus the background. Only meaningful once the model
    /// holds probabilities.
    pub fn mean_relative_entropy(&self, bg: &Bg) -> f64 {
        if self.m == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        for node in self.mat.iter().skip(1) {
            for (a, &p) in node.iter().enumerate() {
                if p > 0.0 && bg.f[a] > 0.0 {
                    total += p * (p / bg.f[a]).log2();
                }
            }
        }
        total / self.m as f64
    }

    /// Plain-text dump of the finished model.
    pub fn write_summary<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "NAME  {}", self.name.as_deref().unwrap_or("-"))?;
        if let Some(acc) = &self.acc {
            writeln!(w, "ACC   {}", acc)?;
        }
        if let Some(desc) = &self.desc {
            writeln!(w, "DESC  {}", desc)?;
        }
        writeln!(w, "LENG  {}", self.m)?;
        writeln!(w, "NSEQ  {}", self.nseq)?;
        writeln!(w, "EFFN  {:.6}", self.eff_nseq)?;
        if let Some(ctime) = &self.ctime {
            writeln!(w, "DATE  {}", ctime)?;
        }
        if let Some(sum) = self.checksum {
            writeln!(w, "CKSUM {}", sum)?;
        }
        if let Some(ev) = &self.evparams {
            writeln!(w, "STATS LAMBDA {:.6}", ev.lambda)?;
            writeln!(w, "STATS VITMU  {:.6}", ev.vit_mu)?;
            writeln!(w, "STATS FWDTAU {:.6}", ev.fwd_tau)?;
        }
        let symbols = self.alphabet.symbols().to_vec();
        write!(w, "      ")?;
        for &c in &symbols {
            write!(w, "{:>9}", c as char)?;
        }
        writeln!(w)?;
        for k in 1..=self.m {
            write!(w, "{:>5} ", k)?;
            for &p in &self.mat[k] {
                write!(w, " {:.6}", p)?;
            }
            writeln!(w)?;
        }
        writeln!(w, "//")?;
        Ok(())
    }
}
