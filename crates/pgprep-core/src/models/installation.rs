use std::path::PathBuf;

use serde::Serialize;

/// The package variant selected by the installation prober.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedInstallation {
    pub variant: String,
    pub version: Option<String>,
    pub prefix: PathBuf,
    pub bin_dir: PathBuf,
}

impl ResolvedInstallation {
    pub fn new(variant: impl Into<String>, version: Option<String>, prefix: PathBuf) -> Self {
        let bin_dir = prefix.join("bin");
        Self {
            variant: variant.into(),
            version,
            prefix,
            bin_dir,
        }
    }

    pub fn tool(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }
}
