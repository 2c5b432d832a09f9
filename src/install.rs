use std::{env, fs, path::PathBuf};

pub const ENV_VAR: &str = "FANCYLINE_STARTUP";
pub const STARTUP_FILE: &str = "fancyline_startup.fl";

const DEFAULT_STARTUP: &str = "\
# executed line by line when the REPL starts
import math
import string
";

/// Writes the startup script and reports the environment variable to export.
pub struct Installer {
    pub dir: PathBuf,
    pub force: bool,
}

impl Installer {
    pub fn new(dir: PathBuf, force: bool) -> Self {
        Installer { dir, force }
    }

    pub fn startup_path(&self) -> PathBuf {
        self.dir.join(STARTUP_FILE)
    }

    /// A reason not to install, or `None` if the way is clear.
    pub fn check(&self) -> Option<String> {
        self.check_with(env::var(ENV_VAR).ok().as_deref())
    }

    fn check_with(&self, env_startup: Option<&str>) -> Option<String> {
        let path = self.startup_path();
        if path.exists() {
            return Some(format!("{} already exists", path.display()));
        }
        match env_startup {
            Some(current) if !current.is_empty() => {
                Some(format!("{} already defined: {}", ENV_VAR, current))
            }
            _ => None,
        }
    }

    pub fn install(&self) -> bool {
        if !self.force {
            if let Some(reason) = self.check() {
                eprintln!("not installing: {}", reason);
                return false;
            }
        }
        let path = self.startup_path();
        if let Err(err) = fs::write(&path, DEFAULT_STARTUP) {
            eprintln!("could not write {}: {}", path.display(), err);
            return false;
        }
        self.set_env_var();
        true
    }

    fn set_env_var(&self) {
        println!("export {}={}", ENV_VAR, self.startup_path().display());
    }
}
