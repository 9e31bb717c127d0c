// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Flag bits shared between the data loader, the solver and interval
//! bookkeeping.
//!
//! Flags are stored as plain integer words. The meaning of the individual bits
//! is owned by whoever produces the sample-level flags; interval bookkeeping
//! only needs to know which bits mean "missing", "prior" and "ill-conditioned",
//! and that is described by a [`FlagLayout`].


use itertools::Itertools;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::intervals::InvalidConfiguration;

/// The storage type of a flag word.
pub type FlagWord = u16;

/// The standard calibration flag bits. The discriminant is the bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum FlagBit {
    /// Flagged before calibration started.
    Prior,
    /// Data is not present.
    Missing,
    /// Data is invalid (e.g. NaN or infinite).
    Invalid,
    /// The gain solution is ill-conditioned.
    IllCond,
    /// The gain solution did not converge.
    NoConv,
    /// Excessive chi-squared.
    Chisq,
    /// Gain went out of bounds.
    Goob,
    /// Gain blew up.
    Boom,
    /// Gain is null.
    Gnull,
    /// Too little signal-to-noise.
    LowSnr,
    /// Gain variance is too large.
    Gvar,
    /// Model is invalid.
    InvModel,
    /// Weight is invalid.
    InvWght,
    /// Weight is null.
    NullWght,
    /// Median-absolute-deviation outlier.
    Mad,
    /// The solution was deliberately skipped.
    SkipSol,
}

impl FlagBit {
    /// The value of this bit in a [`FlagWord`].
    pub const fn bit(self) -> FlagWord {
        1 << (self as FlagWord)
    }

    /// The standard bits set in `word`.
    pub fn names_of(word: FlagWord) -> Vec<FlagBit> {
        FlagBit::iter().filter(|b| word & b.bit() != 0).collect()
    }

    /// A human-readable rendering of `word`, e.g. "PRIOR|MISSING". An empty
    /// word renders as "-".
    pub fn describe(word: FlagWord) -> String {
        if word == 0 {
            return "-".to_string();
        }
        FlagBit::iter()
            .filter(|b| word & b.bit() != 0)
            .join("|")
    }
}

/// The bits that interval bookkeeping needs to test and set. Layouts are
/// versioned so that a consumer can tell which enumeration produced a flag
/// array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagLayout {
    version: u16,
    prior: FlagWord,
    missing: FlagWord,
    ill_cond: FlagWord,
}

impl FlagLayout {
    /// The layout of [`FlagBit`].
    pub const STANDARD: FlagLayout = FlagLayout {
        version: 1,
        prior: FlagBit::Prior.bit(),
        missing: FlagBit::Missing.bit(),
        ill_cond: FlagBit::IllCond.bit(),
    };

    /// Describe a custom layout. Each of the bits must be a single, distinct
    /// set bit.
    pub fn new(
        version: u16,
        prior: FlagWord,
        missing: FlagWord,
        ill_cond: FlagWord,
    ) -> Result<FlagLayout, InvalidConfiguration> {
        for (name, bit) in [("prior", prior), ("missing", missing), ("ill_cond", ill_cond)] {
            if bit.count_ones() != 1 {
                return Err(InvalidConfiguration::FlagLayout(format!(
                    "the '{name}' bit ({bit:#06x}) must have exactly one bit set"
                )));
            }
        }
        if prior == missing || prior == ill_cond || missing == ill_cond {
            return Err(InvalidConfiguration::FlagLayout(format!(
                "bits must be distinct (prior: {prior:#06x}, missing: {missing:#06x}, ill_cond: {ill_cond:#06x})"
            )));
        }

        Ok(FlagLayout {
            version,
            prior,
            missing,
            ill_cond,
        })
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn prior(&self) -> FlagWord {
        self.prior
    }

    pub fn missing(&self) -> FlagWord {
        self.missing
    }

    pub fn ill_cond(&self) -> FlagWord {
        self.ill_cond
    }

    /// A sample matching any of these bits contributes nothing to a gain
    /// solution.
    pub fn missing_or_prior(&self) -> FlagWord {
        self.missing | self.prior
    }
}

impl Default for FlagLayout {
    fn default() -> Self {
        FlagLayout::STANDARD
    }
}
