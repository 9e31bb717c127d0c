// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.
 */

use std::num::NonZeroUsize;

/// The number of timesteps in a solution interval if the user didn't specify
/// one; i.e. a gain per timestep.
pub const DEFAULT_TIME_INT: NonZeroUsize = NonZeroUsize::MIN;

/// The number of channels in a solution interval if the user didn't specify
/// one.
pub const DEFAULT_FREQ_INT: NonZeroUsize = NonZeroUsize::MIN;

/// The tolerance handed to the gain solver.
pub const DEFAULT_EPS: f64 = 1e-6;

/// When more than this fraction of gain slots has no data, a message is
/// emitted, as calibration is unlikely to be meaningful.
pub const MISSING_GAIN_WARN_FRACTION: f64 = 0.5;
