//! Secret references in `config.toml`.
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`
//! - anything else: the literal value

/// A configured value that may point outside the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Plain(&'a str),
    Pass(&'a str),
    Env(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// True for `pass::` and `env::` values.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    pub fn resolve(&self) -> Result<String, String> {
        match self {
            Self::Plain(value) => Ok((*value).to_string()),
            Self::Pass(path) => resolve_pass(path),
            Self::Env(var) => std::env::var(var)
                .map_err(|_| format!("environment variable `{}` is not set", var)),
        }
    }

    /// The value as it may be shown: references as written, literals masked.
    pub fn redacted(&self) -> String {
        match self {
            Self::Plain(value) if value.is_empty() => String::new(),
            Self::Plain(_) => "********".to_string(),
            Self::Pass(path) => format!("pass::{}", path),
            Self::Env(var) => format!("env::{}", var),
        }
    }
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

fn resolve_pass(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixes() {
        assert_eq!(SecretRef::parse("pass::google/lifedash"), SecretRef::Pass("google/lifedash"));
        assert_eq!(SecretRef::parse("env::GOOGLE_SECRET"), SecretRef::Env("GOOGLE_SECRET"));
        assert_eq!(SecretRef::parse("GOCSPX-abc"), SecretRef::Plain("GOCSPX-abc"));
        assert!(!SecretRef::parse("x.apps.googleusercontent.com").is_reference());
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve("x.apps.googleusercontent.com").unwrap(), "x.apps.googleusercontent.com");
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_LIFEDASH_SECRET_TEST", "from-env");
        }
        assert_eq!(resolve("env::_LIFEDASH_SECRET_TEST").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_LIFEDASH_SECRET_TEST");
        }

        let err = resolve("env::_LIFEDASH_SECRET_UNSET_4711").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn pass_reference_failure_is_reported() {
        assert!(resolve("pass::lifedash/does/not/exist/4711").is_err());
    }

    #[test]
    fn redaction_masks_literals_only() {
        assert_eq!(SecretRef::parse("GOCSPX-abc").redacted(), "********");
        assert_eq!(SecretRef::parse("env::SECRET").redacted(), "env::SECRET");
        assert_eq!(SecretRef::parse("pass::a/b").redacted(), "pass::a/b");
    }
}
