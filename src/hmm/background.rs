//! Background (null) residue frequency model.
//!
//! Amino acid frequencies are the Robinson & Robinson probabilities used
//! throughout sequence-search statistics; nucleic and custom alphabets use
//! a uniform background. The background also provides deterministic
//! i.i.d. sequence sampling for the calibration simulations.

use rand_xoshiro::rand_core::RngCore;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::alphabet::Alphabet;

/// Robinson & Robinson amino acid frequencies, in `ACDEFGHIKLMNPQRSTVWY`
/// digitization order.
const ROBINSON_FREQS: [f64; 20] = [
    0.07805, // A
    0.01925, // C
    0.05364, // D
    0.06295, // E
    0.03856, // F
    0.07377, // G
    0.02199, // H
    0.05142, // I
    0.05744, // K
    0.09019, // L
    0.02243, // M
    0.04487, // N
    0.05203, // P
    0.04264, // Q
    0.05129, // R
    0.07120, // S
    0.05841, // T
    0.06441, // V
    0.01330, // W
    0.03216, // Y
];

#[derive(Debug, Clone)]
pub struct Bg {
    /// Background frequency per canonical residue.
    pub f: Vec<f64>,
}

impl Bg {
    pub fn new(alphabet: &Alphabet) -> Bg {
        let f = match alphabet {
            Alphabet::Amino => ROBINSON_FREQS.to_vec(),
            other => {
                let k = other.k();
                vec![1.0 / k as f64; k]
            }
        };
        Bg { f }
    }

    /// Sample one i.i.d. background sequence of digitized residues.
    /// Consumes the RNG serially so repeated runs from the same seed
    /// reproduce bit-for-bit.
    pub fn sample_sequence(&self, rng: &mut Xoshiro256PlusPlus, len: usize) -> Vec<u8> {
        let mut seq = Vec::with_capacity(len);
        for _ in 0..len {
            // 53-bit uniform in [0, 1)
            let u = (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64);
            let mut acc = 0.0;
            let mut code = (self.f.len() - 1) as u8;
            for (a, &p) in self.f.iter().enumerate() {
                acc += p;
                if u < acc {
                    code = a as u8;
                    break;
                }
            }
            seq.push(code);
        }
        seq
    }
}
