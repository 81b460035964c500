//! Scan modules and their fixed variant enumerations.

use super::{ParseScanModuleError, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Module a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanModule {
    /// Static analysis and secret detection over a git repository.
    Scanning,
    /// Browser-driven automated test suites.
    Autotest,
    /// Code-line counting, optionally comparing two revisions.
    Cloc,
    /// Dynamic scanning of a running target URL.
    Dast,
}

impl ScanModule {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Autotest => "autotest",
            Self::Cloc => "cloc",
            Self::Dast => "dast",
        }
    }

    /// Returns the module type tag carried in dispatch payloads.
    #[must_use]
    pub const fn type_tag(self) -> &'static str {
        match self {
            Self::Scanning => "SAST",
            Self::Autotest => "SELENIUM",
            Self::Cloc => "CLOC",
            Self::Dast => "DAST",
        }
    }

    /// Returns `true` when tasks of this module fan out into subtasks.
    #[must_use]
    pub const fn fans_out(self) -> bool {
        matches!(self, Self::Scanning | Self::Autotest)
    }

    /// Returns the request field naming this module's variant selector.
    #[must_use]
    pub const fn variant_field(self) -> &'static str {
        match self {
            Self::Autotest => "browser",
            Self::Scanning | Self::Cloc | Self::Dast => "language",
        }
    }
}

impl fmt::Display for ScanModule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ScanModule {
    type Error = ParseScanModuleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "scanning" => Ok(Self::Scanning),
            "autotest" => Ok(Self::Autotest),
            "cloc" => Ok(Self::Cloc),
            "dast" => Ok(Self::Dast),
            _ => Err(ParseScanModuleError(value.to_owned())),
        }
    }
}

/// Browser an autotest subtask runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Browser {
    /// Mozilla Firefox.
    #[serde(rename = "firefox")]
    Firefox,
    /// Google Chrome.
    #[serde(rename = "chrome")]
    Chrome,
    /// `PhantomJS` headless browser.
    #[serde(rename = "phantomjs")]
    PhantomJs,
    /// Chromium-based Edge.
    #[serde(rename = "edge chromiun")]
    EdgeChromium,
    /// Opera.
    #[serde(rename = "opera")]
    Opera,
}

impl Browser {
    const ALL: [Self; 5] = [
        Self::Firefox,
        Self::Chrome,
        Self::PhantomJs,
        Self::EdgeChromium,
        Self::Opera,
    ];

    /// Returns the token understood by the autotest worker image.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
            Self::PhantomJs => "phantomjs",
            // Spelling matches the worker image's browser table.
            Self::EdgeChromium => "edge chromiun",
            Self::Opera => "opera",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|browser| browser.as_str() == token)
    }
}

/// Analyser a scanning subtask runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// PHP analyser.
    #[serde(rename = "php")]
    Php,
    /// Java analyser.
    #[serde(rename = "java")]
    Java,
    /// .NET analyser.
    #[serde(rename = ".net")]
    DotNet,
    /// Python analyser.
    #[serde(rename = "python")]
    Python,
    /// `ESLint` rules.
    #[serde(rename = "eslint")]
    Eslint,
    /// Semgrep rules.
    #[serde(rename = "semgrep")]
    Semgrep,
}

impl Language {
    const ALL: [Self; 6] = [
        Self::Php,
        Self::Java,
        Self::DotNet,
        Self::Python,
        Self::Eslint,
        Self::Semgrep,
    ];

    /// Returns the token understood by the scanning worker.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Php => "php",
            Self::Java => "java",
            Self::DotNet => ".net",
            Self::Python => "python",
            Self::Eslint => "eslint",
            Self::Semgrep => "semgrep",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|language| language.as_str() == token)
    }
}

/// Variant discriminator of a subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Variant {
    /// Autotest browser run.
    Browser(Browser),
    /// Scanning analyser run.
    Language(Language),
    /// Secret detection run added to every scanning task.
    SecretScan,
}

impl Variant {
    /// Token of the secret detection variant.
    pub const SECRET_SCAN_TOKEN: &'static str = "secret";

    /// Returns the worker token for this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser(browser) => browser.as_str(),
            Self::Language(language) => language.as_str(),
            Self::SecretScan => Self::SECRET_SCAN_TOKEN,
        }
    }

    /// Parses a single stored token for the given module.
    ///
    /// Accepts the secret-scan token for the scanning module.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidVariants`] when the token is not in
    /// the module's enumeration, or [`TaskDomainError::NotFanOut`] for
    /// modules without subtasks.
    pub fn from_token(module: ScanModule, token: &str) -> Result<Self, TaskDomainError> {
        if module == ScanModule::Scanning && token == Self::SECRET_SCAN_TOKEN {
            return Ok(Self::SecretScan);
        }
        Self::from_user_token(module, token)?.ok_or_else(|| TaskDomainError::InvalidVariants {
            module,
            kind: module.variant_field(),
            tokens: vec![token.to_owned()],
        })
    }

    /// Parses a comma-separated selector into variants.
    ///
    /// Tokens are trimmed and empty tokens are skipped. Matching is
    /// case-sensitive, and the secret-scan token is not user-selectable.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidVariants`] listing every rejected
    /// token, [`TaskDomainError::MissingField`] when no token remains, or
    /// [`TaskDomainError::NotFanOut`] for modules without subtasks.
    ///
    /// # Examples
    ///
    /// ```
    /// use citool::task::domain::{Browser, ScanModule, Variant};
    ///
    /// let parsed = Variant::parse_selector(ScanModule::Autotest, "firefox,chrome").unwrap();
    /// assert_eq!(parsed, vec![Variant::Browser(Browser::Firefox), Variant::Browser(Browser::Chrome)]);
    /// ```
    pub fn parse_selector(module: ScanModule, raw: &str) -> Result<Vec<Self>, TaskDomainError> {
        let mut variants = Vec::new();
        let mut invalid = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
            match Self::from_user_token(module, token)? {
                Some(variant) => variants.push(variant),
                None => invalid.push(token.to_owned()),
            }
        }

        if !invalid.is_empty() {
            return Err(TaskDomainError::InvalidVariants {
                module,
                kind: module.variant_field(),
                tokens: invalid,
            });
        }
        if variants.is_empty() {
            return Err(TaskDomainError::MissingField(module.variant_field()));
        }
        Ok(variants)
    }

    fn from_user_token(module: ScanModule, token: &str) -> Result<Option<Self>, TaskDomainError> {
        match module {
            ScanModule::Autotest => Ok(Browser::from_token(token).map(Self::Browser)),
            ScanModule::Scanning => Ok(Language::from_token(token).map(Self::Language)),
            ScanModule::Cloc | ScanModule::Dast => Err(TaskDomainError::NotFanOut(module)),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
