//! Global context for Berth operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::recipe::{find_recipe, RECIPE_FILE};
use crate::util::config::{self, Config, CONFIG_DIR};
use crate::util::diagnostic::suggestions;

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Berth data (~/.berth/)
    home: PathBuf,

    /// Recipe given explicitly with `--recipe`
    recipe_path: Option<PathBuf>,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = config::global_config_dir().unwrap_or_else(|| PathBuf::from(CONFIG_DIR));

        Ok(GlobalContext {
            cwd,
            home,
            recipe_path: None,
            verbose: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Use this recipe instead of searching for one.
    pub fn set_recipe_path(&mut self, path: PathBuf) {
        self.recipe_path = Some(path);
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Berth home directory (~/.berth/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Locate the recipe: the `--recipe` path if given, else `Berth.toml`
    /// in the working directory or the nearest parent holding one.
    pub fn find_recipe(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.recipe_path {
            let path = self.cwd.join(path);
            if !path.is_file() {
                bail!("recipe not found: {}", path.display());
            }
            return Ok(path);
        }

        match find_recipe(&self.cwd) {
            Some(path) => Ok(path),
            None => bail!(
                "could not find `{}` in `{}` or any parent directory\nhelp: {}",
                RECIPE_FILE,
                self.cwd.display(),
                suggestions::NO_RECIPE
            ),
        }
    }

    /// The directory project configuration is read from: the recipe's
    /// directory when there is one, else the working directory.
    pub fn project_root(&self) -> PathBuf {
        self.find_recipe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.cwd.clone())
    }

    /// Load the merged global and project configuration.
    pub fn load_config(&self) -> Config {
        let project = config::project_config_path(&self.project_root());
        config::load_config(&self.config_path(), &project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECIPE: &str = "[package]\nname = \"test\"\n";

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(ctx.home().ends_with(CONFIG_DIR));
        assert!(ctx.config_path().ends_with(".berth/config.toml"));
    }

    #[test]
    fn test_find_recipe_upward() {
        let tmp = TempDir::new().unwrap();
        let recipe = tmp.path().join(RECIPE_FILE);
        std::fs::write(&recipe, RECIPE).unwrap();
        let nested = tmp.path().join("src/gui");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested).unwrap();
        assert_eq!(ctx.find_recipe().unwrap(), recipe);
        assert_eq!(ctx.project_root(), tmp.path());
    }

    #[test]
    fn test_explicit_recipe_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("recipes/oup")).unwrap();
        std::fs::write(tmp.path().join("recipes/oup/Berth.toml"), RECIPE).unwrap();

        let mut ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        ctx.set_recipe_path(PathBuf::from("recipes/oup/Berth.toml"));
        assert_eq!(
            ctx.find_recipe().unwrap(),
            tmp.path().join("recipes/oup/Berth.toml")
        );

        ctx.set_recipe_path(PathBuf::from("missing.toml"));
        assert!(ctx.find_recipe().is_err());
    }

    #[test]
    fn test_project_config_is_loaded() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(RECIPE_FILE), RECIPE).unwrap();
        std::fs::create_dir_all(tmp.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_DIR).join("config.toml"),
            "[platform]\nos = \"Emscripten\"\n",
        )
        .unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let config = ctx.load_config();
        assert_eq!(config.platform.os.as_deref(), Some("Emscripten"));
    }
}
