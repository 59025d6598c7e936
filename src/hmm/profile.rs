//! Search profiles derived from a finished model.
//!
//! A [`Profile`] holds log-odds scores in nats, configured for unilocal
//! alignment with uniform entry over the nodes. The compact Viterbi and
//! Forward scorers here exist to drive calibration; the full search
//! engines live elsewhere. An [`OptimizedProfile`] is an f32-flattened
//! copy for callers that want a cache-friendly layout.

use crate::hmm::background::Bg;
use crate::hmm::model::{Hmm, T_DD, T_DM, T_II, T_IM, T_MD, T_MI, T_MM};

const LN2: f64 = std::f64::consts::LN_2;

#[derive(Debug, Clone)]
pub struct Profile {
    pub m: usize,
    /// Match emission log-odds, `msc[k][a]` for nodes `1..=m`.
    pub msc: Vec<Vec<f64>>,
    /// Insert emission log-odds.
    pub isc: Vec<Vec<f64>>,
    /// Log transition scores, `tsc[k][T_*]`.
    pub tsc: Vec<[f64; 7]>,
    /// Log entry score B -> M_k.
    pub entry: Vec<f64>,
    pub name: Option<String>,
}

fn ln_or_neg_inf(p: f64) -> f64 {
    if p > 0.0 {
        p.ln()
    } else {
        f64::NEG_INFINITY
    }
}

fn logsum(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f64::NEG_INFINITY {
        hi
    } else {
        hi + (lo - hi).exp().ln_1p()
    }
}

impl Profile {
    /// Configure a unilocal search profile from a probability-form model
    /// and its background.
    pub fn configure(hmm: &Hmm, bg: &Bg) -> Profile {
        let k = hmm.alphabet.k();
        let m = hmm.m;
        let mut msc = vec![vec![f64::NEG_INFINITY; k]; m + 1];
        let mut isc = vec![vec![f64::NEG_INFINITY; k]; m + 1];
        for node in 1..=m {
            for a in 0..k {
                msc[node][a] = ln_or_neg_inf(hmm.mat[node][a] / bg.f[a]);
            }
        }
        for node in 0..=m {
            for a in 0..k {
                isc[node][a] = ln_or_neg_inf(hmm.ins[node][a] / bg.f[a]);
            }
        }
        let tsc: Vec<[f64; 7]> = hmm
            .t
            .iter()
            .map(|row| {
                let mut out = [f64::NEG_INFINITY; 7];
                for (i, &p) in row.iter().enumerate() {
                    out[i] = ln_or_neg_inf(p);
                }
                out
            })
            .collect();
        // uniform entry over nodes; total entry mass 2/(M+1)
        let entry_p = if m > 0 { 2.0 / ((m * (m + 1)) as f64) } else { 0.0 };
        let entry = vec![ln_or_neg_inf(entry_p); m + 1];
        Profile { m, msc, isc, tsc, entry, name: hmm.name.clone() }
    }

    /// Unilocal Viterbi score of a digitized sequence, in bits.
    pub fn viterbi_score(&self, dsq: &[u8]) -> f64 {
        let m = self.m;
        let neg = f64::NEG_INFINITY;
        let mut vm_prev = vec![neg; m + 1];
        let mut vi_prev = vec![neg; m + 1];
        let mut vd_prev = vec![neg; m + 1];
        let mut best = neg;

        for &code in dsq {
            let a = code as usize;
            let mut vm_cur = vec![neg; m + 1];
            let mut vi_cur = vec![neg; m + 1];
            let mut vd_cur = vec![neg; m + 1];
            for k in 1..=m {
                let es = if a < self.msc[k].len() { self.msc[k][a] } else { 0.0 };
                let from_m = vm_prev[k - 1] + self.tsc[k - 1][T_MM];
                let from_i = vi_prev[k - 1] + self.tsc[k - 1][T_IM];
                let from_d = vd_prev[k - 1] + self.tsc[k - 1][T_DM];
                let into_m = self.entry[k].max(from_m).max(from_i).max(from_d);
                vm_cur[k] = es + into_m;

                let ies = if a < self.isc[k].len() { self.isc[k][a] } else { 0.0 };
                vi_cur[k] = ies
                    + (vm_prev[k] + self.tsc[k][T_MI]).max(vi_prev[k] + self.tsc[k][T_II]);

                vd_cur[k] = (vm_cur[k - 1] + self.tsc[k - 1][T_MD])
                    .max(vd_cur[k - 1] + self.tsc[k - 1][T_DD]);

                if vm_cur[k] > best {
                    best = vm_cur[k];
                }
            }
            vm_prev = vm_cur;
            vi_prev = vi_cur;
            vd_prev = vd_cur;
        }
        best / LN2
    }

    /// Unilocal Forward score of a digitized sequence, in bits.
    pub fn forward_score(&self, dsq: &[u8]) -> f64 {
        let m = self.m;
        let neg = f64::NEG_INFINITY;
        let mut fm_prev = vec![neg; m + 1];
        let mut fi_prev = vec![neg; m + 1];
        let mut fd_prev = vec![neg; m + 1];
        let mut total = neg;

        for &code in dsq {
            let a = code as usize;
            let mut fm_cur = vec![neg; m + 1];
            let mut fi_cur = vec![neg; m + 1];
            let mut fd_cur = vec![neg; m + 1];
            for k in 1..=m {
                let es = if a < self.msc[k].len() { self.msc[k][a] } else { 0.0 };
                let mut into_m = self.entry[k];
                into_m = logsum(into_m, fm_prev[k - 1] + self.tsc[k - 1][T_MM]);
                into_m = logsum(into_m, fi_prev[k - 1] + self.tsc[k - 1][T_IM]);
                into_m = logsum(into_m, fd_prev[k - 1] + self.tsc[k - 1][T_DM]);
                fm_cur[k] = es + into_m;

                let ies = if a < self.isc[k].len() { self.isc[k][a] } else { 0.0 };
                fi_cur[k] = ies
                    + logsum(
                        fm_prev[k] + self.tsc[k][T_MI],
                        fi_prev[k] + self.tsc[k][T_II],
                    );

                fd_cur[k] = logsum(
                    fm_cur[k - 1] + self.tsc[k - 1][T_MD],
                    fd_cur[k - 1] + self.tsc[k - 1][T_DD],
                );

                total = logsum(total, fm_cur[k]);
            }
            fm_prev = fm_cur;
            fi_prev = fi_cur;
            fd_prev = fd_cur;
        }
        total / LN2
    }
}

/// Flattened single-precision copy of a [`Profile`].
#[derive(Debug, Clone)]
pub struct OptimizedProfile {
    pub m: usize,
    pub k: usize,
    pub msc: Vec<f32>,
    pub isc: Vec<f32>,
    pub tsc: Vec<f32>,
    pub entry: Vec<f32>,
    pub name: Option<String>,
}

impl OptimizedProfile {
    pub fn from_profile(gm: &Profile) -> OptimizedProfile {
        let k = gm.msc.first().map_or(0, |row| row.len());
        OptimizedProfile {
            m: gm.m,
            k,
            msc: gm.msc.iter().flatten().map(|&v| v as f32).collect(),
            isc: gm.isc.iter().flatten().map(|&v| v as f32).collect(),
            tsc: gm.tsc.iter().flatten().map(|&v| v as f32).collect(),
            entry: gm.entry.iter().map(|&v| v as f32).collect(),
            name: gm.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::hmm::prior::{parameter_estimation, Prior};

    fn toy_profile() -> (Profile, Bg) {
        let bg = Bg::new(&Alphabet::Dna);
        let mut hmm = Hmm::new(Alphabet::Dna, 3);
        // counts strongly favoring the sequence ACG
        for (k, a) in [(1usize, 0usize), (2, 1), (3, 2)] {
            hmm.mat[k][a] = 10.0;
            hmm.t[k][T_MM] = 10.0;
        }
        hmm.t[0][T_MM] = 10.0;
        parameter_estimation(&mut hmm, &Prior::nucleic()).unwrap();
        (Profile::configure(&hmm, &bg), bg)
    }

    #[test]
    fn test_consensus_outscores_background() {
        let (gm, _) = toy_profile();
        let hit = gm.viterbi_score(&[0, 1, 2]); // ACG
        let miss = gm.viterbi_score(&[3, 3, 3]); // TTT
        assert!(hit > miss);
        assert!(hit > 0.0);
    }

    #[test]
    fn test_forward_upper_bounds_viterbi() {
        let (gm, _) = toy_profile();
        let dsq = [0u8, 1, 2, 3, 0, 1, 2];
        assert!(gm.forward_score(&dsq) >= gm.viterbi_score(&dsq) - 1e-9);
    }

    #[test]
    fn test_optimized_profile_mirrors_profile() {
        let (gm, _) = toy_profile();
        let om = OptimizedProfile::from_profile(&gm);
        assert_eq!(om.m, gm.m);
        assert_eq!(om.k, 4);
        assert_eq!(om.msc.len(), (gm.m + 1) * 4);
    }
}
