// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Drive the interval state the way a solver does: options from a file, a
//! model shape, then a few cycles of flags changing between calls.

use approx::assert_abs_diff_eq;
use indoc::indoc;
use ndarray::prelude::*;

use gain_intervals::{
    FlagBit, FlagLayout, FlagWord, IntervalArgs, IntervalError, IntervalGainState, ModelShape,
};

use super::make_arg_file;

const MISSING: FlagWord = FlagBit::Missing.bit();
const PRIOR: FlagWord = FlagBit::Prior.bit();

fn get_state() -> IntervalGainState {
    let f = make_arg_file(
        ".toml",
        indoc! {r#"
            time-int = 4
            freq-int = 3
        "#},
    );
    let options = IntervalArgs::from_file(f.path())
        .unwrap()
        .parse()
        .unwrap();

    // Model array: [n_dir, n_mod, n_tim, n_fre, n_ant, n_ant, n_cor, n_cor]
    let shape = ModelShape::from_model_dims(&[2, 1, 9, 7, 5, 5, 2, 2]).unwrap();
    let times: Vec<f64> = (0..9).map(|i| 1090008640.0 + 8.0 * i as f64).collect();
    let freqs: Vec<f64> = (0..7).map(|i| 167.68e6 + 1.28e6 * i as f64).collect();
    IntervalGainState::new(shape, &times, &freqs, &options, FlagLayout::STANDARD).unwrap()
}

#[test]
fn test_solver_cycles() {
    let mut state = get_state();
    let g = state.geometry().clone();
    assert_eq!((g.n_timint, g.n_freint), (3, 3));
    assert_eq!(g.t_bins.sizes(), vec![4, 4, 1]);
    assert_eq!(g.f_bins.sizes(), vec![3, 3, 1]);
    assert_abs_diff_eq!(g.n_sols, 18.0);

    // Cycle 1: antenna 4 was flagged before calibration; its equations are
    // gone.
    let mut flags = ArrayD::<FlagWord>::zeros(IxDyn(&[9, 7, 5, 5]));
    flags.slice_mut(s![.., .., 4, ..]).fill(PRIOR);
    let mut eqs = ArrayD::<u64>::from_elem(IxDyn(&[9, 7, 5, 5]), 1);
    eqs.slice_mut(s![.., .., 4, ..]).fill(0);
    eqs.slice_mut(s![.., .., .., 4]).fill(0);
    state.compute_stats(flags.view(), eqs.view()).unwrap();

    assert_eq!(state.num_valid_intervals(), 9);
    // 4x4 baselines-worth of equations per sample.
    assert_eq!(state.eqs_per_interval()[(0, 0)], 4 * 3 * 16);
    assert_eq!(state.eqs_per_interval()[(2, 2)], 16);
    for ((_, _, _, a), &f) in state.gflags().indexed_iter() {
        assert_eq!(f, if a == 4 { MISSING } else { 0 });
    }
    assert_abs_diff_eq!(state.missing_gain_fraction(), 0.2);

    // The solver gives up on antenna 0 in the last time interval.
    let mut failed = Array4::from_elem(g.flag_shape(), false);
    failed.slice_mut(s![.., 2, .., 0]).fill(true);
    let flagbit = state.flagbit();
    state.flag_gains(failed.view(), flagbit).unwrap();

    // Cycle 2: the final timestep is entirely lost.
    flags.slice_mut(s![8, .., .., ..]).fill(MISSING);
    eqs.slice_mut(s![8, .., .., ..]).fill(0);
    state.compute_stats(flags.view(), eqs.view()).unwrap();

    assert_eq!(state.num_valid_intervals(), 6);
    assert!(state.valid_intervals().slice(s![2, ..]).iter().all(|&v| !v));
    let illcond = FlagBit::IllCond.bit();
    for d in 0..2 {
        for f in 0..3 {
            assert_eq!(state.gflags()[[d, 2, f, 0]], illcond | MISSING);
            assert_eq!(state.gflags()[[d, 2, f, 1]], MISSING);
            assert_eq!(state.gflags()[[d, 0, f, 0]], 0);
        }
    }
    // Antenna 4 everywhere, plus the other 4 antennas in the 3 last-time
    // intervals.
    assert_abs_diff_eq!(state.missing_gain_fraction(), (9.0 + 12.0) / 45.0);

    // A bad call leaves the last cycle's results alone.
    let before = state.clone();
    let result = state.compute_stats(
        ArrayD::<FlagWord>::zeros(IxDyn(&[9, 7, 4, 5])).view(),
        eqs.view(),
    );
    assert!(matches!(result, Err(IntervalError::ShapeMismatch { .. })));
    assert_eq!(state.gflags(), before.gflags());
    assert_eq!(state.num_valid_intervals(), before.num_valid_intervals());
}
