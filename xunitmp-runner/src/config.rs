// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for xunitmp.

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

/// Resolved report configuration.
///
/// Built once per process and handed to whatever needs it; nothing reads configuration from
/// global state.
///
/// Configuration is resolved in layers, later layers taking priority:
///
/// 1. the defaults in [`Self::DEFAULT_CONFIG`];
/// 2. `.config/xunitmp.toml` in the workspace root, or the file passed in explicitly;
/// 3. overrides from the command line or the environment, applied with the `with_` methods.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XunitConfig {
    path: Utf8PathBuf,
    report_name: String,
    store_success_output: bool,
}

impl XunitConfig {
    /// The default location of the config within the workspace: `.config/xunitmp.toml`.
    pub const CONFIG_PATH: &'static str = ".config/xunitmp.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file`, or if not specified from `.config/xunitmp.toml` in
    /// the workspace root.
    ///
    /// If no config file is specified and the workspace has no `.config/xunitmp.toml`, the
    /// defaults are used. A relative report path is resolved against the workspace root.
    pub fn from_sources(
        workspace_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner: XunitConfigImpl = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(config_file, err))?;

        let XunitSection {
            path,
            report_name,
            store_success_output,
        } = inner.xunit;

        Ok(Self {
            path: workspace_root.join(path),
            report_name,
            store_success_output,
        })
    }

    /// Replaces the report path, typically from `--xunit-file` or `XUNITMP_FILE`.
    pub fn with_path_override(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Replaces the report name.
    pub fn with_report_name_override(mut self, report_name: impl Into<String>) -> Self {
        self.report_name = report_name.into();
        self
    }

    /// Enables or disables storing a body for passing tests.
    pub fn with_store_success_output(mut self, store_success_output: bool) -> Self {
        self.store_success_output = store_success_output;
        self
    }

    /// The path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The name attribute of the root element.
    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    /// Whether passing tests get a `<system-out>` body.
    pub fn store_success_output(&self) -> bool {
        self.store_success_output
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }
}

impl Default for XunitConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("xunit.xml"),
            report_name: "xunitmp".to_owned(),
            store_success_output: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct XunitConfigImpl {
    xunit: XunitSection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct XunitSection {
    path: Utf8PathBuf,
    report_name: String,
    store_success_output: bool,
}
