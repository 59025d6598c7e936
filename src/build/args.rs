//! The standard build option surface.
//!
//! Big users of the build pipeline flatten [`BuildArgs`] into their own
//! CLI. Every option has a documented default; the [`crate::build::Builder`]
//! consults all of them when constructed from an option set, and applies
//! the same defaults when none is supplied.

use clap::Args;

/// Model architecture choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchStrategy {
    /// Assign consensus columns by the symbol-fraction rule.
    Fast,
    /// Trust pre-existing reference annotation markup.
    Hand,
}

/// Relative sequence weighting choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightStrategy {
    /// Uniform weight 1 per sequence.
    None,
    /// Trust weights already present on the alignment.
    Given,
    /// Henikoff position-based weights.
    PositionBased,
    /// Gerstein/Sonnhammer/Chothia tree weights.
    Gsc,
    /// BLOSUM cluster weights at an identity threshold.
    Blosum,
}

/// Effective sequence number choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffnStrategy {
    /// Effective number equals the nominal sequence count.
    None,
    /// A fixed caller-supplied value.
    Set(f64),
    /// Number of single-linkage clusters at an identity threshold.
    Cluster,
    /// Solve for the count hitting a target relative entropy.
    Entropy,
}

/// The ~24 standard build options.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Assign match columns by symbol fraction (default architecture)
    #[arg(long, default_value_t = false, conflicts_with = "hand")]
    pub fast: bool,
    /// Trust reference annotation markup for match columns
    #[arg(long, default_value_t = false)]
    pub hand: bool,
    /// Residue fraction above which a column becomes a match column
    #[arg(long, default_value_t = 0.5)]
    pub symfrac: f64,

    /// Gerstein/Sonnhammer/Chothia tree weights (default weighting)
    #[arg(long, default_value_t = false)]
    pub wgsc: bool,
    /// BLOSUM cluster weights
    #[arg(long, default_value_t = false)]
    pub wblosum: bool,
    /// Henikoff position-based weights
    #[arg(long, default_value_t = false)]
    pub wpb: bool,
    /// Uniform weight 1 per sequence
    #[arg(long, default_value_t = false)]
    pub wnone: bool,
    /// Trust weights already present on the alignment
    #[arg(long, default_value_t = false)]
    pub wgiven: bool,
    /// Sequence count at which weighting switches to the position-based
    /// algorithm regardless of choice (0 disables the override)
    #[arg(long, default_value_t = 1000)]
    pub pbswitch: usize,
    /// Identity threshold for BLOSUM weighting
    #[arg(long, default_value_t = 0.62)]
    pub wid: f64,

    /// Entropy-targeted effective sequence number (default)
    #[arg(long, default_value_t = false)]
    pub eent: bool,
    /// Effective number from single-linkage cluster count
    #[arg(long, default_value_t = false)]
    pub eclust: bool,
    /// Effective number equals the nominal sequence count
    #[arg(long, default_value_t = false)]
    pub enone: bool,
    /// Fixed effective sequence number
    #[arg(long)]
    pub eset: Option<f64>,
    /// Target mean relative entropy in bits per position (default: computed
    /// from model length)
    #[arg(long)]
    pub ere: Option<f64>,
    /// Offset in the length-dependent relative entropy target
    #[arg(long, default_value_t = 6.0)]
    pub esigma: f64,
    /// Identity threshold for effective-number clustering
    #[arg(long, default_value_t = 0.62)]
    pub eid: f64,

    /// Length of simulated sequences for Viterbi calibration
    #[arg(long = "EvL", default_value_t = 100)]
    pub ev_l: usize,
    /// Number of simulated sequences for Viterbi calibration
    #[arg(long = "EvN", default_value_t = 200)]
    pub ev_n: usize,
    /// Length of simulated sequences for Forward calibration
    #[arg(long = "EfL", default_value_t = 100)]
    pub ef_l: usize,
    /// Number of simulated sequences for Forward calibration
    #[arg(long = "EfN", default_value_t = 200)]
    pub ef_n: usize,
    /// Tail mass the Forward exponential fit is anchored at
    #[arg(long = "Eft", default_value_t = 0.04)]
    pub eft: f64,

    /// Random seed; 0 chooses an arbitrary seed and allows run-to-run
    /// variation
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

impl Default for BuildArgs {
    fn default() -> Self {
        BuildArgs {
            fast: false,
            hand: false,
            symfrac: 0.5,
            wgsc: false,
            wblosum: false,
            wpb: false,
            wnone: false,
            wgiven: false,
            pbswitch: 1000,
            wid: 0.62,
            eent: false,
            eclust: false,
            enone: false,
            eset: None,
            ere: None,
            esigma: 6.0,
            eid: 0.62,
            ev_l: 100,
            ev_n: 200,
            ef_l: 100,
            ef_n: 200,
            eft: 0.04,
            seed: 0,
        }
    }
}

impl BuildArgs {
    pub fn arch_strategy(&self) -> ArchStrategy {
        if self.hand {
            ArchStrategy::Hand
        } else {
            ArchStrategy::Fast
        }
    }

    pub fn weight_strategy(&self) -> WeightStrategy {
        if self.wgsc {
            WeightStrategy::Gsc
        } else if self.wblosum {
            WeightStrategy::Blosum
        } else if self.wpb {
            WeightStrategy::PositionBased
        } else if self.wnone {
            WeightStrategy::None
        } else if self.wgiven {
            WeightStrategy::Given
        } else {
            WeightStrategy::Gsc
        }
    }

    pub fn effn_strategy(&self) -> EffnStrategy {
        if self.eent {
            EffnStrategy::Entropy
        } else if self.eclust {
            EffnStrategy::Cluster
        } else if self.enone {
            EffnStrategy::None
        } else if let Some(v) = self.eset {
            EffnStrategy::Set(v)
        } else {
            EffnStrategy::Entropy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let args = BuildArgs::default();
        assert_eq!(args.arch_strategy(), ArchStrategy::Fast);
        assert_eq!(args.weight_strategy(), WeightStrategy::Gsc);
        assert_eq!(args.effn_strategy(), EffnStrategy::Entropy);
        assert_eq!(args.seed, 0);
        assert!((args.symfrac - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_eset_selects_fixed_strategy() {
        let args = BuildArgs { eset: Some(5.0), ..Default::default() };
        assert_eq!(args.effn_strategy(), EffnStrategy::Set(5.0));
    }
}
