// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Solution-interval options.
//!
//! [`IntervalArgs`] is unparsed, user-facing input; every field is optional so
//! that arguments can come from multiple places (e.g. a file and code) and be
//! merged. [`IntervalOptions`] has been parsed and is ready to be used
//! directly.

mod error;

pub use error::ParamsError;

use std::{fs::File, io::Read, num::NonZeroUsize, path::Path, str::FromStr};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::{DEFAULT_EPS, DEFAULT_FREQ_INT, DEFAULT_TIME_INT},
    intervals::InvalidConfiguration,
};

#[derive(Debug, Display, EnumIter, EnumString)]
enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

fn arg_file_types_comma_separated() -> String {
    ArgFileTypes::iter().join(", ")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IntervalArgs {
    /// The number of timesteps per solution interval. Default: 1
    pub time_int: Option<i64>,

    /// The number of channels per solution interval. Default: 1
    pub freq_int: Option<i64>,

    /// The tolerance given to the gain solver. Default: 1e-6
    pub eps: Option<f64>,
}

impl IntervalArgs {
    /// Read arguments from a toml or json file. The type is determined by the
    /// file extension.
    pub fn from_file<P: AsRef<Path>>(arg_file: P) -> Result<IntervalArgs, ParamsError> {
        let arg_file = arg_file.as_ref();
        debug!("Attempting to parse argument file {}", arg_file.display());

        let arg_file_type = arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());
        let Some(arg_file_type) = arg_file_type else {
            return Err(ParamsError::UnrecognisedExtension {
                file: arg_file.display().to_string(),
                valid: arg_file_types_comma_separated(),
            });
        };

        let mut contents = String::new();
        let mut fh = File::open(arg_file)?;
        fh.read_to_string(&mut contents)?;
        match arg_file_type {
            ArgFileTypes::Toml => {
                debug!("Parsing toml file...");
                toml::from_str(&contents).map_err(|err| ParamsError::Toml {
                    file: arg_file.display().to_string(),
                    err,
                })
            }
            ArgFileTypes::Json => {
                debug!("Parsing json file...");
                serde_json::from_str(&contents).map_err(|err| ParamsError::Json {
                    file: arg_file.display().to_string(),
                    err,
                })
            }
        }
    }

    /// Render these arguments as toml, e.g. to save the arguments of a run so
    /// that it can be reproduced.
    pub fn to_toml(&self) -> Result<String, ParamsError> {
        Ok(toml::to_string(self)?)
    }

    /// Consolidate two sets of arguments, preferring those in `self`.
    pub fn merge(self, other: IntervalArgs) -> IntervalArgs {
        IntervalArgs {
            time_int: self.time_int.or(other.time_int),
            freq_int: self.freq_int.or(other.freq_int),
            eps: self.eps.or(other.eps),
        }
    }

    pub fn parse(self) -> Result<IntervalOptions, InvalidConfiguration> {
        let IntervalArgs {
            time_int,
            freq_int,
            eps,
        } = self;

        let time_int = match time_int {
            Some(v) => parse_interval("time-int", v)?,
            None => DEFAULT_TIME_INT,
        };
        let freq_int = match freq_int {
            Some(v) => parse_interval("freq-int", v)?,
            None => DEFAULT_FREQ_INT,
        };
        let eps = eps.unwrap_or(DEFAULT_EPS);
        if !eps.is_finite() || eps <= 0.0 {
            return Err(InvalidConfiguration::NonPositiveEps {
                option: "eps",
                value: eps,
            });
        }

        Ok(IntervalOptions {
            time_int,
            freq_int,
            eps,
        })
    }
}

fn parse_interval(option: &'static str, value: i64) -> Result<NonZeroUsize, InvalidConfiguration> {
    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(InvalidConfiguration::NonPositiveInterval { option, value })
}

/// Parsed solution-interval options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalOptions {
    /// Timesteps per solution interval.
    pub time_int: NonZeroUsize,

    /// Channels per solution interval.
    pub freq_int: NonZeroUsize,

    pub eps: f64,
}

impl IntervalOptions {
    /// Options with the given interval widths and the default tolerance.
    pub fn new(time_int: NonZeroUsize, freq_int: NonZeroUsize) -> IntervalOptions {
        IntervalOptions {
            time_int,
            freq_int,
            eps: DEFAULT_EPS,
        }
    }
}

impl Default for IntervalOptions {
    fn default() -> Self {
        IntervalOptions::new(DEFAULT_TIME_INT, DEFAULT_FREQ_INT)
    }
}
