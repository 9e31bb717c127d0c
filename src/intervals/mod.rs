// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Solution-interval geometry and per-interval statistics.
//!
//! Gains are solved for blocks of `t_int` timesteps by `f_int` channels. The
//! number of samples along each axis need not be a multiple of the interval
//! width, so the final interval along an axis may be short. Everything that
//! moves between sample resolution and interval resolution goes through the
//! [`IntervalBins`] of [`IntervalGeometry`].

mod bins;
mod error;

pub use bins::IntervalBins;
pub use error::{IntervalError, InvalidConfiguration};

use log::{debug, trace, warn};
use ndarray::{prelude::*, RemoveAxis, Zip};
use num_traits::Zero;
use rayon::prelude::*;

use crate::{
    constants::MISSING_GAIN_WARN_FRACTION,
    flagging::{FlagBit, FlagLayout, FlagWord},
    params::IntervalOptions,
};

/// The extents of a model-visibility array. Gains are `n_cor` by `n_cor` per
/// antenna.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    pub n_dir: usize,
    pub n_mod: usize,
    pub n_tim: usize,
    pub n_fre: usize,
    pub n_ant: usize,
    pub n_cor: usize,
}

impl ModelShape {
    /// Interpret the dimensions of a model array shaped `[n_dir, n_mod, n_tim,
    /// n_fre, n_ant, n_ant, n_cor, n_cor]`.
    pub fn from_model_dims(dims: &[usize]) -> Result<ModelShape, InvalidConfiguration> {
        let &[n_dir, n_mod, n_tim, n_fre, n_ant, n_ant2, n_cor, n_cor2] = dims else {
            return Err(InvalidConfiguration::ModelRank(dims.len()));
        };
        if n_ant != n_ant2 {
            return Err(InvalidConfiguration::ModelDims {
                dim: "antenna",
                first: n_ant,
                second: n_ant2,
            });
        }
        if n_cor != n_cor2 {
            return Err(InvalidConfiguration::ModelDims {
                dim: "correlation",
                first: n_cor,
                second: n_cor2,
            });
        }

        Ok(ModelShape {
            n_dir,
            n_mod,
            n_tim,
            n_fre,
            n_ant,
            n_cor,
        })
    }

    fn validate(&self) -> Result<(), InvalidConfiguration> {
        for (dim, extent) in [
            ("direction", self.n_dir),
            ("model", self.n_mod),
            ("time", self.n_tim),
            ("frequency", self.n_fre),
            ("antenna", self.n_ant),
            ("correlation", self.n_cor),
        ] {
            if extent == 0 {
                return Err(InvalidConfiguration::ZeroExtent { dim });
            }
        }
        Ok(())
    }
}

/// Everything about solution intervals that follows from the model shape and
/// the interval widths. This never changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalGeometry {
    pub n_dir: usize,
    pub n_mod: usize,
    pub n_tim: usize,
    pub n_fre: usize,
    pub n_ant: usize,
    pub n_cor: usize,

    /// The requested number of timesteps per interval.
    pub t_int: usize,
    /// The requested number of channels per interval.
    pub f_int: usize,

    /// The number of time intervals, i.e. ceil(n_tim / t_int).
    pub n_timint: usize,
    /// The number of frequency intervals, i.e. ceil(n_fre / f_int).
    pub n_freint: usize,
    pub n_tf_ints: usize,

    /// The total number of independent solutions. This is kept as a float as
    /// it's used to normalise other floats.
    pub n_sols: f64,

    pub t_bins: IntervalBins,
    pub f_bins: IntervalBins,
}

impl IntervalGeometry {
    fn new(shape: &ModelShape, options: &IntervalOptions) -> IntervalGeometry {
        let t_bins = IntervalBins::new(shape.n_tim, options.time_int);
        let f_bins = IntervalBins::new(shape.n_fre, options.freq_int);
        let n_timint = t_bins.len();
        let n_freint = f_bins.len();
        let n_tf_ints = n_timint * n_freint;

        IntervalGeometry {
            n_dir: shape.n_dir,
            n_mod: shape.n_mod,
            n_tim: shape.n_tim,
            n_fre: shape.n_fre,
            n_ant: shape.n_ant,
            n_cor: shape.n_cor,
            t_int: options.time_int.get(),
            f_int: options.freq_int.get(),
            n_timint,
            n_freint,
            n_tf_ints,
            n_sols: (shape.n_dir * n_tf_ints) as f64,
            t_bins,
            f_bins,
        }
    }

    /// The shape of the gains: `[n_dir, n_timint, n_freint, n_ant, n_cor,
    /// n_cor]`.
    pub fn gain_shape(&self) -> [usize; 6] {
        [
            self.n_dir,
            self.n_timint,
            self.n_freint,
            self.n_ant,
            self.n_cor,
            self.n_cor,
        ]
    }

    /// The shape of the gain flags: `[n_dir, n_timint, n_freint, n_ant]`.
    pub fn flag_shape(&self) -> [usize; 4] {
        [self.n_dir, self.n_timint, self.n_freint, self.n_ant]
    }
}

/// Interval geometry, gain flags and the per-interval statistics that gate a
/// gain solver.
///
/// One of these belongs to each calibration machine. The solver calls
/// [`IntervalGainState::compute_stats`] each cycle (or whenever the data flags
/// change) and reads back the refreshed statistics.
#[derive(Debug, Clone)]
pub struct IntervalGainState {
    geometry: IntervalGeometry,

    /// The timestamp of each sample.
    times: Vec<f64>,

    /// The frequency of each sample \[Hz\].
    freqs: Vec<f64>,

    layout: FlagLayout,

    /// The bit raised on gains that this machine could not solve.
    flagbit: FlagWord,

    eps: f64,

    /// The number of solutions that have converged. Owned by the solver.
    n_cnvgd: usize,

    /// `[n_dir, n_timint, n_freint, n_ant]`
    gflags: Array4<FlagWord>,

    /// `[n_timint, n_freint]`
    eqs_per_interval: Array2<u64>,

    /// `[n_timint, n_freint]`
    valid_intervals: Array2<bool>,

    num_valid_intervals: usize,

    missing_gain_fraction: f64,
}

impl IntervalGainState {
    pub fn new(
        shape: ModelShape,
        times: &[f64],
        freqs: &[f64],
        options: &IntervalOptions,
        layout: FlagLayout,
    ) -> Result<IntervalGainState, IntervalError> {
        shape.validate()?;
        if times.len() != shape.n_tim {
            return Err(InvalidConfiguration::AxisLength {
                axis: "time",
                expected: shape.n_tim,
                found: times.len(),
            }
            .into());
        }
        if freqs.len() != shape.n_fre {
            return Err(InvalidConfiguration::AxisLength {
                axis: "frequency",
                expected: shape.n_fre,
                found: freqs.len(),
            }
            .into());
        }

        let geometry = IntervalGeometry::new(&shape, options);
        debug!(
            "Solution intervals: {} x {} (time x freq) from {} timesteps and {} channels ({} timesteps, {} channels per interval)",
            geometry.n_timint,
            geometry.n_freint,
            geometry.n_tim,
            geometry.n_fre,
            geometry.t_int,
            geometry.f_int,
        );
        debug!("Gain shape: {:?}", geometry.gain_shape());
        trace!("Time interval starts: {:?}", geometry.t_bins.starts());
        trace!("Freq interval starts: {:?}", geometry.f_bins.starts());

        let interval_dim = (geometry.n_timint, geometry.n_freint);
        Ok(IntervalGainState {
            times: times.to_vec(),
            freqs: freqs.to_vec(),
            layout,
            flagbit: layout.ill_cond(),
            eps: options.eps,
            n_cnvgd: 0,
            gflags: Array4::zeros(geometry.flag_shape()),
            eqs_per_interval: Array2::zeros(interval_dim),
            valid_intervals: Array2::from_elem(interval_dim, false),
            num_valid_intervals: 0,
            missing_gain_fraction: 0.0,
            geometry,
        })
    }

    pub fn geometry(&self) -> &IntervalGeometry {
        &self.geometry
    }

    pub fn layout(&self) -> FlagLayout {
        self.layout
    }

    /// The gain flags, `[n_dir, n_timint, n_freint, n_ant]`.
    pub fn gflags(&self) -> ArrayView4<FlagWord> {
        self.gflags.view()
    }

    /// The number of unflagged equations in each interval, `[n_timint,
    /// n_freint]`.
    pub fn eqs_per_interval(&self) -> ArrayView2<u64> {
        self.eqs_per_interval.view()
    }

    /// Which intervals have at least one equation, `[n_timint, n_freint]`.
    pub fn valid_intervals(&self) -> ArrayView2<bool> {
        self.valid_intervals.view()
    }

    pub fn num_valid_intervals(&self) -> usize {
        self.num_valid_intervals
    }

    /// The fraction of (direction, interval, antenna) gains without any data.
    pub fn missing_gain_fraction(&self) -> f64 {
        self.missing_gain_fraction
    }

    pub fn num_converged(&self) -> usize {
        self.n_cnvgd
    }

    pub fn set_num_converged(&mut self, n_cnvgd: usize) {
        self.n_cnvgd = n_cnvgd;
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn flagbit(&self) -> FlagWord {
        self.flagbit
    }

    /// Sum `arr` over each solution interval. Axes `tdim` and `tdim + 1` must
    /// be the time and frequency axes; in the output they have `n_timint` and
    /// `n_freint` elements.
    pub fn interval_sum<A, D>(
        &self,
        arr: ArrayView<A, D>,
        tdim: usize,
    ) -> Result<Array<A, D>, IntervalError>
    where
        A: Clone + Zero,
        D: RemoveAxis,
    {
        let g = &self.geometry;
        check_tf_axes("summed", arr.shape(), tdim, g.n_tim, g.n_fre)?;
        let t_summed = bins::sum_axis(arr, Axis(tdim), &g.t_bins);
        Ok(bins::sum_axis(t_summed.view(), Axis(tdim + 1), &g.f_bins))
    }

    /// Like [`IntervalGainState::interval_sum`], but an interval is true only
    /// if every sample in it is true.
    pub fn interval_and<D>(
        &self,
        arr: ArrayView<bool, D>,
        tdim: usize,
    ) -> Result<Array<bool, D>, IntervalError>
    where
        D: RemoveAxis,
    {
        let g = &self.geometry;
        check_tf_axes("reduced", arr.shape(), tdim, g.n_tim, g.n_fre)?;
        let t_reduced = bins::and_axis(arr, Axis(tdim), &g.t_bins);
        Ok(bins::and_axis(t_reduced.view(), Axis(tdim + 1), &g.f_bins))
    }

    /// The inverse of the interval reductions: repeat each interval's value
    /// over its samples. Axes `tdim` and `tdim + 1` must have `n_timint` and
    /// `n_freint` elements; in the output they have `n_tim` and `n_fre`.
    pub fn unpack_intervals<A, D>(
        &self,
        arr: ArrayView<A, D>,
        tdim: usize,
    ) -> Result<Array<A, D>, IntervalError>
    where
        A: Clone,
        D: RemoveAxis,
    {
        let g = &self.geometry;
        check_tf_axes("unpacked", arr.shape(), tdim, g.n_timint, g.n_freint)?;
        let t_unpacked = bins::unpack_axis(arr, Axis(tdim), &g.t_bins);
        Ok(bins::unpack_axis(
            t_unpacked.view(),
            Axis(tdim + 1),
            &g.f_bins,
        ))
    }

    /// The mean timestamp of each time interval.
    pub fn interval_times(&self) -> Vec<f64> {
        interval_means(&self.times, &self.geometry.t_bins)
    }

    /// The mean frequency of each frequency interval \[Hz\].
    pub fn interval_freqs(&self) -> Vec<f64> {
        interval_means(&self.freqs, &self.geometry.f_bins)
    }

    /// Refresh the per-interval statistics and the "missing" gain flags from
    /// this cycle's sample-level data.
    ///
    /// * `flags` has shape `[n_tim, n_fre, n_ant, ...]`; a sample counts as
    ///   having no data only if every element of its trailing axes has a
    ///   "missing" or "prior" bit set.
    /// * `eqs` has shape `[n_tim, n_fre]` or `[n_tim, n_fre, n_ant, ...]`; all
    ///   trailing axes are added into the per-interval totals.
    ///
    /// The "missing" bit of every gain flag is recomputed from scratch. No
    /// other flag bits are touched. If either array has the wrong shape,
    /// nothing is changed.
    pub fn compute_stats(
        &mut self,
        flags: ArrayViewD<FlagWord>,
        eqs: ArrayViewD<u64>,
    ) -> Result<(), IntervalError> {
        let g = &self.geometry;
        let (n_tim, n_fre, n_ant) = (g.n_tim, g.n_fre, g.n_ant);
        if flags.ndim() < 3 || flags.shape()[..3] != [n_tim, n_fre, n_ant] {
            return Err(IntervalError::ShapeMismatch {
                array: "flags",
                expected: format!("[{n_tim}, {n_fre}, {n_ant}, ...]"),
                found: flags.shape().to_vec(),
            });
        }
        if eqs.ndim() < 2
            || eqs.shape()[..2] != [n_tim, n_fre]
            || (eqs.ndim() > 2 && eqs.shape()[2] != n_ant)
        {
            return Err(IntervalError::ShapeMismatch {
                array: "equation-count",
                expected: format!("[{n_tim}, {n_fre}] or [{n_tim}, {n_fre}, {n_ant}, ...]"),
                found: eqs.shape().to_vec(),
            });
        }

        // Everything is computed before anything is assigned, so that an error
        // leaves the state as it was.
        let eqs_per_interval = {
            let binned = self.interval_sum(eqs, 0)?;
            let rest: usize = binned.shape()[2..].iter().product();
            binned
                .to_shape((g.n_timint, g.n_freint, rest))?
                .sum_axis(Axis(2))
        };
        let valid_intervals = eqs_per_interval.mapv(|n| n > 0);
        let num_valid_intervals = valid_intervals.iter().filter(|&&v| v).count();

        let no_data_mask = self.layout.missing_or_prior();
        let rest: usize = flags.shape()[3..].iter().product();
        let flags_tfa = flags.to_shape((n_tim, n_fre, n_ant, rest))?;
        let mut no_data = Array3::from_elem((n_tim, n_fre, n_ant), false);
        Zip::from(&mut no_data)
            .and(flags_tfa.lanes(Axis(3)))
            .par_for_each(|sample_no_data, sample_flags| {
                *sample_no_data = sample_flags.iter().all(|&f| f & no_data_mask != 0);
            });
        // `[n_timint, n_freint, n_ant]`
        let missing_gains = self.interval_and(no_data.view(), 0)?;
        let num_missing = missing_gains.par_iter().filter(|&&m| m).count();
        let missing_gain_fraction = num_missing as f64 / missing_gains.len() as f64;

        let missing = self.layout.missing();
        self.gflags.mapv_inplace(|f| f & !missing);
        self.or_where(missing_gains.view(), missing);
        self.eqs_per_interval = eqs_per_interval;
        self.valid_intervals = valid_intervals;
        self.num_valid_intervals = num_valid_intervals;
        self.missing_gain_fraction = missing_gain_fraction;

        debug!(
            "{}/{} solution intervals have data; {num_missing}/{} interval antenna gains are {}",
            self.num_valid_intervals,
            self.geometry.n_tf_ints,
            missing_gains.len(),
            FlagBit::describe(missing),
        );
        if missing_gain_fraction > MISSING_GAIN_WARN_FRACTION {
            warn!(
                "{:.1}% of gains have no unflagged data",
                missing_gain_fraction * 100.0
            );
        }

        Ok(())
    }

    /// Raise `bit` on the gain flags of every direction wherever `mask`
    /// (`[n_timint, n_freint, n_ant]`) is true. Bits that are already set stay
    /// set.
    pub fn set_bit_where(
        &mut self,
        mask: ArrayView3<bool>,
        bit: FlagWord,
    ) -> Result<(), IntervalError> {
        let g = &self.geometry;
        let expected = [g.n_timint, g.n_freint, g.n_ant];
        if mask.shape() != expected {
            return Err(IntervalError::ShapeMismatch {
                array: "gain mask",
                expected: format!("{expected:?}"),
                found: mask.shape().to_vec(),
            });
        }
        self.or_where(mask, bit);
        Ok(())
    }

    /// Raise `bit` on individual gain flags wherever `mask` (`[n_dir,
    /// n_timint, n_freint, n_ant]`) is true. This is how a solver marks gains
    /// it could not solve, usually with [`IntervalGainState::flagbit`].
    pub fn flag_gains(
        &mut self,
        mask: ArrayView4<bool>,
        bit: FlagWord,
    ) -> Result<(), IntervalError> {
        let expected = self.geometry.flag_shape();
        if mask.shape() != expected {
            return Err(IntervalError::ShapeMismatch {
                array: "gain mask",
                expected: format!("{expected:?}"),
                found: mask.shape().to_vec(),
            });
        }
        Zip::from(&mut self.gflags)
            .and(&mask)
            .for_each(|f, &m| {
                if m {
                    *f |= bit;
                }
            });
        Ok(())
    }

    fn or_where(&mut self, mask: ArrayView3<bool>, bit: FlagWord) {
        for mut dir_gflags in self.gflags.outer_iter_mut() {
            Zip::from(&mut dir_gflags).and(&mask).for_each(|f, &m| {
                if m {
                    *f |= bit;
                }
            });
        }
    }
}

fn check_tf_axes(
    array: &'static str,
    shape: &[usize],
    tdim: usize,
    n_t: usize,
    n_f: usize,
) -> Result<(), IntervalError> {
    if shape.len() < tdim + 2 || shape[tdim] != n_t || shape[tdim + 1] != n_f {
        return Err(IntervalError::ShapeMismatch {
            array,
            expected: format!("{n_t} x {n_f} on axes {tdim} and {}", tdim + 1),
            found: shape.to_vec(),
        });
    }
    Ok(())
}

fn interval_means(values: &[f64], bins: &IntervalBins) -> Vec<f64> {
    bins.ranges()
        .map(|r| {
            let n = r.len() as f64;
            values[r].iter().sum::<f64>() / n
        })
        .collect()
}
