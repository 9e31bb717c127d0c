// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::intervals::InvalidConfiguration;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Argument file '{file}' doesn't have a recognised file extension! Valid extensions are: {valid}")]
    UnrecognisedExtension { file: String, valid: String },

    #[error("Couldn't decode toml structure from {file}:\n{err}")]
    Toml { file: String, err: toml::de::Error },

    #[error("Couldn't decode json structure from {file}:\n{err}")]
    Json {
        file: String,
        err: serde_json::Error,
    },

    #[error("toml serialisation error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    InvalidConfiguration(#[from] InvalidConfiguration),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
