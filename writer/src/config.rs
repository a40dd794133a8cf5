use crate::cli::Args;
use agent::llm::{GEMINI_API_BASE, GEMINI_MODEL};
use agent::{Error, Result};
use std::path::Path;

pub const SERPER_API_KEY: &str = "SERPER_API_KEY";
pub const GOOGLE_AI_API: &str = "GOOGLE_AI_API";
pub const LLM_MODEL: &str = "LLM_MODEL";
pub const LLM_API_BASE: &str = "LLM_API_BASE";

pub struct Settings {
    pub serper_api_key: String,
    pub google_api_key: String,
    pub model: String,
    pub api_base: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn from_env(args: &Args) -> Result<Self> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    /// Command line flags win over the environment, which wins over the defaults.
    pub fn from_lookup(args: &Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(Error::ConfigError(format!("{} is not set", key)))
        };

        Ok(Self {
            serper_api_key: required(SERPER_API_KEY)?,
            google_api_key: required(GOOGLE_AI_API)?,
            model: args
                .model
                .clone()
                .or_else(|| lookup(LLM_MODEL))
                .unwrap_or(GEMINI_MODEL.to_string()),
            api_base: args
                .api_base
                .clone()
                .or_else(|| lookup(LLM_API_BASE))
                .unwrap_or(GEMINI_API_BASE.to_string()),
        })
    }
}

/// Loads `path`, or `./.env` when no path is given and the file exists.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => dotenvy::from_path(path).map_err(|e| {
            Error::ConfigError(format!("cannot load {}: {}", path.display(), e))
        }),
        None => match dotenvy::dotenv() {
            Ok(_) => Ok(()),
            Err(e) if e.not_found() => Ok(()),
            Err(e) => Err(Error::ConfigError(format!("cannot load .env: {}", e))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_settings_from_lookup() -> Result<()> {
        let vars = env(&[(SERPER_API_KEY, "serper"), (GOOGLE_AI_API, "google")]);
        let args = Args::parse_from(["writer"]);

        let settings = Settings::from_lookup(&args, |k| vars.get(k).cloned())?;

        assert_eq!(settings.serper_api_key, "serper");
        assert_eq!(settings.google_api_key, "google");
        assert_eq!(settings.model, GEMINI_MODEL);
        assert_eq!(settings.api_base, GEMINI_API_BASE);
        Ok(())
    }

    #[test]
    fn test_flags_override_environment() -> Result<()> {
        let vars = env(&[
            (SERPER_API_KEY, "serper"),
            (GOOGLE_AI_API, "google"),
            (LLM_MODEL, "env-model"),
            (LLM_API_BASE, "http://localhost:8080/v1"),
        ]);
        let args = Args::parse_from(["writer", "--model", "flag-model"]);

        let settings = Settings::from_lookup(&args, |k| vars.get(k).cloned())?;

        assert_eq!(settings.model, "flag-model");
        assert_eq!(settings.api_base, "http://localhost:8080/v1");
        Ok(())
    }

    #[test]
    fn test_missing_keys() {
        let args = Args::parse_from(["writer"]);

        let vars = env(&[(GOOGLE_AI_API, "google")]);
        let err = Settings::from_lookup(&args, |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains(SERPER_API_KEY)));

        let vars = env(&[(SERPER_API_KEY, "serper"), (GOOGLE_AI_API, "  ")]);
        let err = Settings::from_lookup(&args, |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains(GOOGLE_AI_API)));
    }

    #[test]
    fn test_settings_debug_hides_keys() -> Result<()> {
        let vars = env(&[(SERPER_API_KEY, "serper-secret"), (GOOGLE_AI_API, "google-secret")]);
        let settings = Settings::from_lookup(&Args::parse_from(["writer"]), |k| vars.get(k).cloned())?;
        assert!(!format!("{:?}", settings).contains("secret"));
        Ok(())
    }

    #[test]
    fn test_load_missing_env_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(matches!(
            load_env_file(Some(&dir.path().join("missing.env"))),
            Err(Error::ConfigError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_load_env_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test.env");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "WRITER_TEST_ENV_FILE_KEY=loaded")?;
        drop(file);

        load_env_file(Some(&path))?;

        assert_eq!(
            std::env::var("WRITER_TEST_ENV_FILE_KEY").ok().as_deref(),
            Some("loaded")
        );
        Ok(())
    }
}
