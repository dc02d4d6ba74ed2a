//! Typed command line options.
//!
//! Options are declared with camelCase keys and read from the command line
//! under their kebab-case name:
//!
//! ```
//! use boilerplate_tasks::args::{get_options, ArgvProvider, ConfigDefinition, OptionDefinition, ParsedOptions};
//!
//! let definition = ConfigDefinition::new()
//!     .option("outputDir", OptionDefinition::string().with_default("dist"))
//!     .option("minify", OptionDefinition::boolean().with_default(false));
//! let argv = ArgvProvider::parse(["--output-dir=build", "--minify"]);
//!
//! let ParsedOptions::Values(options) = get_options(&argv, &definition).unwrap() else {
//!     unreachable!();
//! };
//! assert_eq!(options.string("outputDir"), Some("build"));
//! assert_eq!(options.boolean("minify"), Some(true));
//! ```

use crate::naming::camel_to_kebab;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Type of an option value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptType {
    /// Any text
    #[default]
    String,
    /// Floating point number
    Number,
    /// Flag
    Boolean,
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptValue {
    /// Text
    String(String),
    /// Number
    Number(f64),
    /// Flag
    Boolean(bool),
}

impl fmt::Display for OptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for OptValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for OptValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for OptValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Value of an option as found on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOptValue {
    /// `--name` or `--no-name`
    Flag(bool),
    /// `--name=value`
    Value(String),
    /// `--name value`; for a boolean option, `value` is a positional
    /// argument unless it is `true` or `false`
    Separate(String),
}

/// Declaration of one option.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionDefinition {
    /// Value type
    pub kind: OptType,
    /// Value used when the option is absent; the option is mandatory
    /// without one
    pub default: Option<OptValue>,
    /// Help text, possibly on several lines
    pub description: Option<String>,
}

impl OptionDefinition {
    /// String option
    #[must_use]
    pub fn string() -> Self {
        Self::of(OptType::String)
    }

    /// Number option
    #[must_use]
    pub fn number() -> Self {
        Self::of(OptType::Number)
    }

    /// Boolean option
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(OptType::Boolean)
    }

    /// Option of type `kind`
    #[must_use]
    pub fn of(kind: OptType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Make the option optional.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<OptValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the help text.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn type_hint(&self, kebab_name: &str) -> String {
        match self.kind {
            OptType::String => "=<string value>".to_string(),
            OptType::Number => "=<numeric value>".to_string(),
            OptType::Boolean => format!(" (use --no-{kebab_name} to disable)"),
        }
    }

    fn help(&self, key: &str) -> Vec<String> {
        let kebab_name = camel_to_kebab(key);
        let default = self
            .default
            .as_ref()
            .map(|d| format!(" (optional, default value:{d})"))
            .unwrap_or_default();
        let mut lines = vec![format!(" --{kebab_name}{}{default}", self.type_hint(&kebab_name))];
        if let Some(description) = &self.description {
            lines.extend(description.split('\n').map(|line| format!("    {line}")));
        }
        lines
    }

    fn resolve(&self, raw: Option<RawOptValue>) -> Result<OptValue, ArgReason> {
        let Some(raw) = raw else {
            return self.default.clone().ok_or(ArgReason::MissingOption);
        };
        match (self.kind, raw) {
            (OptType::String, RawOptValue::Value(value) | RawOptValue::Separate(value)) => {
                Ok(OptValue::String(value))
            }
            (OptType::String, RawOptValue::Flag(_)) => Err(ArgReason::MissingString),
            (OptType::Number, RawOptValue::Value(value) | RawOptValue::Separate(value)) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| !n.is_nan())
                .map(OptValue::Number)
                .ok_or(ArgReason::NotANumber),
            (OptType::Number, RawOptValue::Flag(_)) => Err(ArgReason::MissingNumber),
            (OptType::Boolean, RawOptValue::Flag(flag)) => Ok(OptValue::Boolean(flag)),
            (OptType::Boolean, RawOptValue::Value(value)) => match value.as_str() {
                "true" => Ok(OptValue::Boolean(true)),
                "false" => Ok(OptValue::Boolean(false)),
                _ => Err(ArgReason::MissingBoolean),
            },
            (OptType::Boolean, RawOptValue::Separate(value)) => {
                Ok(OptValue::Boolean(value != "false"))
            }
        }
    }
}

/// Declared options, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDefinition {
    options: Vec<(String, OptionDefinition)>,
}

impl ConfigDefinition {
    /// No options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare option `key`, replacing a previous declaration.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, definition: OptionDefinition) -> Self {
        let key = key.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = definition,
            None => self.options.push((key, definition)),
        }
        self
    }

    /// Declared options
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionDefinition)> {
        self.options.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Help text listing every option.
    #[must_use]
    pub fn help(&self) -> String {
        std::iter::once("Accepted command line arguments:".to_string())
            .chain(self.iter().flat_map(|(key, def)| def.help(key)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Source of raw option values.
pub trait OptionsProvider {
    /// Raw value of the option named `kebab_name`, if given.
    fn option(&self, kebab_name: &str) -> Option<RawOptValue>;
}

/// Options parsed from command line arguments.
///
/// Accepted forms are `--name=value`, `--name value`, `--name` and
/// `--no-name`. A `--name` followed by an argument not starting with `--`
/// takes that argument as its value, except for boolean options where only
/// `true` and `false` are read. Other arguments are ignored; when an option
/// is repeated the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgvProvider {
    values: HashMap<String, RawOptValue>,
}

impl ArgvProvider {
    /// Parse `args`, without the program name.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = HashMap::new();
        let mut args = args.into_iter().map(Into::into).peekable();
        while let Some(arg) = args.next() {
            let Some(option) = arg.strip_prefix("--") else {
                continue;
            };
            if let Some((name, value)) = option.split_once('=') {
                values.insert(name.to_string(), RawOptValue::Value(value.to_string()));
            } else if let Some(name) = option.strip_prefix("no-") {
                values.insert(name.to_string(), RawOptValue::Flag(false));
            } else if let Some(value) = args.next_if(|next| !next.starts_with("--")) {
                values.insert(option.to_string(), RawOptValue::Separate(value));
            } else {
                values.insert(option.to_string(), RawOptValue::Flag(true));
            }
        }
        Self { values }
    }

    /// Parse the arguments of the current process.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::args().skip(1))
    }
}

impl OptionsProvider for ArgvProvider {
    fn option(&self, kebab_name: &str) -> Option<RawOptValue> {
        self.values.get(kebab_name).cloned()
    }
}

/// Resolved option values by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(BTreeMap<String, OptValue>);

impl Options {
    /// Value of `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptValue> {
        self.0.get(key)
    }

    /// String value of `key`
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            OptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number value of `key`
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            OptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean value of `key`
    #[must_use]
    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            OptValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of [`get_options`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOptions {
    /// `--help` was given; holds the text to show
    Help(String),
    /// Every declared option, resolved
    Values(Options),
}

/// Why an option was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgReason {
    /// Mandatory option absent
    #[error("Missing option")]
    MissingOption,
    /// String option given as a flag
    #[error("Missing string argument")]
    MissingString,
    /// Number option given as a flag
    #[error("Missing number argument")]
    MissingNumber,
    /// Number option with an unparsable value
    #[error("Not a number")]
    NotANumber,
    /// Boolean option with a value other than `true` or `false`
    #[error("Missing boolean argument")]
    MissingBoolean,
}

/// A rejected command line option.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("CLI Argument \"{name}\": {reason}")]
pub struct ArgsError {
    /// Kebab-case name of the option
    pub name: String,
    /// What was wrong
    pub reason: ArgReason,
}

/// Read every option of `definition` from `provider`.
///
/// # Errors
///
/// Returns [`ArgsError`] for the first option that is missing or has a value
/// of the wrong type.
pub fn get_options<P: OptionsProvider + ?Sized>(
    provider: &P,
    definition: &ConfigDefinition,
) -> Result<ParsedOptions, ArgsError> {
    let help = OptionDefinition::boolean().resolve(provider.option("help"));
    if matches!(help, Ok(OptValue::Boolean(true))) {
        return Ok(ParsedOptions::Help(definition.help()));
    }
    let mut values = BTreeMap::new();
    for (key, def) in definition.iter() {
        let name = camel_to_kebab(key);
        let value = def
            .resolve(provider.option(&name))
            .map_err(|reason| ArgsError { name, reason })?;
        values.insert(key.to_string(), value);
    }
    Ok(ParsedOptions::Values(Options(values)))
}
