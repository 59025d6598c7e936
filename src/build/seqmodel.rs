//! Probability model from a single digitized sequence.
//!
//! One node per residue. Match emissions come from the scoring system's
//! conditional substitution probabilities; transitions come from the gap
//! open and extend probabilities. The result is already in probability
//! form and skips the count-based pipeline stages entirely.

use crate::error::{BuildError, Result};
use crate::hmm::background::Bg;
use crate::hmm::model::{Hmm, T_DD, T_DM, T_II, T_IM, T_MD, T_MI, T_MM};
use crate::score::ScoreSystem;

/// Build an L-node probability model from one sequence.
///
/// Degenerate residues emit the background distribution at their node. Gap
/// codes are not legal in an unaligned sequence.
pub fn seqmodel(
    dsq: &[u8],
    name: Option<&str>,
    scoresys: &ScoreSystem,
    bg: &Bg,
) -> Result<Hmm> {
    if dsq.is_empty() {
        return Err(BuildError::InvalidConfig(
            "cannot build a model from an empty sequence".into(),
        ));
    }
    if dsq.iter().any(|&c| c == crate::alphabet::GAP) {
        return Err(BuildError::InvalidConfig(
            "unaligned sequence contains gap characters".into(),
        ));
    }

    let abc = scoresys.matrix.alphabet.clone();
    let k = abc.k();
    let m = dsq.len();
    let mut hmm = Hmm::new(abc, m);
    hmm.nseq = 1;
    hmm.eff_nseq = 1.0;
    hmm.name = name.map(str::to_owned);

    for (pos, &code) in dsq.iter().enumerate() {
        let node = pos + 1;
        hmm.mat[node] = if (code as usize) < k {
            scoresys.q[code as usize].clone()
        } else {
            bg.f.clone()
        };
    }
    for node in 0..=m {
        hmm.ins[node] = bg.f.clone();
    }

    let popen = scoresys.popen;
    let pextend = scoresys.pextend;
    for node in 0..=m {
        let t = &mut hmm.t[node];
        if node < m {
            t[T_MM] = 1.0 - 2.0 * popen;
            t[T_MI] = popen;
            t[T_MD] = popen;
            t[T_DM] = 1.0 - pextend;
            t[T_DD] = pextend;
        } else {
            // node M: all mass exits to E
            t[T_MM] = 1.0 - popen;
            t[T_MI] = popen;
            t[T_MD] = 0.0;
            t[T_DM] = 1.0;
            t[T_DD] = 0.0;
        }
        t[T_IM] = 1.0 - pextend;
        t[T_II] = pextend;
    }

    Ok(hmm)
}
