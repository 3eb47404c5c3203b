use crate::models::{CoreError, CoreErrorKind, ResolvedInstallation, StageAction};
use crate::sources::HomebrewSource;

pub struct InstallationProber<'a, H: HomebrewSource> {
    homebrew: &'a H,
}

impl<'a, H: HomebrewSource> InstallationProber<'a, H> {
    pub fn new(homebrew: &'a H) -> Self {
        Self { homebrew }
    }

    /// Returns the first installed variant of `variants` (ordered newest first).
    /// Variants after the first match are never probed.
    pub async fn probe(&self, variants: &[String]) -> Result<ResolvedInstallation, CoreError> {
        let Some(preferred) = variants.first() else {
            return Err(CoreError::for_action(
                StageAction::ProbeInstalled,
                CoreErrorKind::InvalidInput,
                "no package variants to probe",
            ));
        };

        for variant in variants {
            let Some(versions) = self.homebrew.installed_versions(variant).await? else {
                tracing::debug!(variant = %variant, "variant not installed");
                continue;
            };

            let prefix = self.homebrew.formula_prefix(variant).await?;
            let installation =
                ResolvedInstallation::new(variant.as_str(), parse_version(&versions), prefix);
            tracing::info!(
                variant = %installation.variant,
                bin_dir = %installation.bin_dir.display(),
                "found installed PostgreSQL"
            );
            return Ok(installation);
        }

        Err(CoreError::for_action(
            StageAction::ProbeInstalled,
            CoreErrorKind::NotInstalled,
            format!("none of {} is installed", variants.join(", ")),
        )
        .with_hint(format!("brew install {preferred}")))
    }
}

/// `brew list --versions` prints `name v1 [v2 ...]`; the last token is the active version.
fn parse_version(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    tokens.next()?;
    tokens.last().map(str::to_owned)
}
