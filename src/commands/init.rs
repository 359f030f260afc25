use anyhow::{Result, bail};
use log::info;

use crate::{runtime::Runtime, settings::InstallerSettings};

use super::config::{Config, ProjectOptions};

/// Write a starter settings document.
#[tracing::instrument(skip(runtime, options))]
pub fn init<R: Runtime>(runtime: R, options: ProjectOptions, force: bool) -> Result<()> {
    let config = Config::new(runtime, options)?;
    if config.runtime.exists(&config.settings_path) && !force {
        bail!(
            "Settings already exist at {:?} (use --force to overwrite)",
            config.settings_path
        );
    }

    InstallerSettings::starter().save(&config.runtime, &config.settings_path)?;
    info!("Wrote {:?}", config.settings_path);
    println!("Created {}", config.settings_path.display());
    Ok(())
}

/// Persist whether the installer should be shown when the project opens.
#[tracing::instrument(skip(runtime, options))]
pub fn set_startup<R: Runtime>(runtime: R, options: ProjectOptions, enabled: bool) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let mut settings = config.settings()?;
    if settings.always_show_on_startup == enabled {
        println!("Always show on startup is already {}.", if enabled { "on" } else { "off" });
        return Ok(());
    }

    settings.always_show_on_startup = enabled;
    settings.save(&config.runtime, &config.settings_path)?;
    println!("Always show on startup: {}", if enabled { "on" } else { "off" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::settings::FRAMEWORK_URL;
    use mockall::predicate::eq;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_starter_settings_once() {
        let dir = tempdir().unwrap();
        let options = ProjectOptions::new(Some(dir.path().to_path_buf()), None);

        init(RealRuntime, options.clone(), false).unwrap();
        let settings =
            InstallerSettings::load(&RealRuntime, &dir.path().join("Installer/settings.json")).unwrap();
        assert_eq!(settings.framework_entry().install_spec(), format!("CodeSketch@{}", FRAMEWORK_URL));

        assert!(init(RealRuntime, options.clone(), false).is_err());
        assert!(init(RealRuntime, options, true).is_ok());
    }

    #[test]
    fn test_init_refuses_existing_file_without_writing() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/project/Installer/settings.json");
        runtime.expect_is_dir().returning(|_| true);
        runtime.expect_exists().with(eq(path)).returning(|_| true);
        runtime.expect_write().never();

        let options = ProjectOptions::new(Some(PathBuf::from("/project")), None);
        let err = init(runtime, options, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn test_set_startup() {
        let dir = tempdir().unwrap();
        let options = ProjectOptions::new(Some(dir.path().to_path_buf()), None);
        let path = dir.path().join("Installer/settings.json");

        // already on by default, nothing written
        set_startup(RealRuntime, options.clone(), true).unwrap();
        assert!(!path.exists());

        set_startup(RealRuntime, options, false).unwrap();
        let settings = InstallerSettings::load(&RealRuntime, &path).unwrap();
        assert!(!settings.always_show_on_startup);
    }
}
