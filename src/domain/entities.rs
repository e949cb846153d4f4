//! Domain entities: command metadata and argument specifications

use std::collections::BTreeMap;

/// Subcommand construction options attached to a command function.
///
/// Successive attachments merge into one value:
/// - Scalar options: overlay wins if Some, otherwise keep base
/// - Aliases: appended, duplicates dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// One-line help shown in the subcommand list
    pub about: Option<String>,
    /// Long help shown by `<command> --help`
    pub long_about: Option<String>,
    /// Alternative names accepted on the command line
    pub aliases: Vec<String>,
    /// Hide the subcommand from help output
    pub hide: Option<bool>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn long_about(mut self, long_about: impl Into<String>) -> Self {
        self.long_about = Some(long_about.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn hide(mut self, hide: bool) -> Self {
        self.hide = Some(hide);
        self
    }

    /// Merge overlay options onto self.
    pub fn merge(&mut self, overlay: CommandOptions) {
        if overlay.about.is_some() {
            self.about = overlay.about;
        }
        if overlay.long_about.is_some() {
            self.long_about = overlay.long_about;
        }
        if overlay.hide.is_some() {
            self.hide = overlay.hide;
        }
        for alias in overlay.aliases {
            if !self.aliases.contains(&alias) {
                self.aliases.push(alias);
            }
        }
    }
}

/// What the parser does with an argument occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArgAction {
    /// Store the (last) value
    #[default]
    Set,
    /// Boolean switch, false when absent
    SetTrue,
    /// Collect every occurrence into a list
    Append,
}

/// Type the parser validates values against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueKind {
    #[default]
    Str,
    Int,
    Path,
}

/// How many values an argument consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Nargs {
    #[default]
    One,
    /// Zero or one value; positional becomes optional
    Optional,
    ZeroOrMore,
    OneOrMore,
    /// Everything after `--`, passed through verbatim (positional only)
    Remainder,
}

impl Nargs {
    pub fn is_many(&self) -> bool {
        matches!(self, Nargs::ZeroOrMore | Nargs::OneOrMore | Nargs::Remainder)
    }
}

/// Keyword half of an argument declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgOptions {
    pub help: Option<String>,
    pub action: ArgAction,
    pub kind: ValueKind,
    pub nargs: Nargs,
    pub default: Option<String>,
    pub required: Option<bool>,
    /// Key under which the parsed value lands in the invocation
    pub dest: Option<String>,
    pub value_name: Option<String>,
    /// Restrict values to this set (empty = unrestricted)
    pub choices: Vec<String>,
}

/// One CLI argument declaration: (names, options).
///
/// Names starting with `--` are long flags, `-x` short flags, anything
/// else is a positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub names: Vec<String>,
    pub options: ArgOptions,
}

impl ArgSpec {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            options: ArgOptions::default(),
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.options.help = Some(help.into());
        self
    }

    /// Boolean switch (`store_true`).
    pub fn flag(mut self) -> Self {
        self.options.action = ArgAction::SetTrue;
        self
    }

    pub fn append(mut self) -> Self {
        self.options.action = ArgAction::Append;
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.options.kind = kind;
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.options.nargs = nargs;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.options.default = Some(value.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.options.required = Some(required);
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.options.dest = Some(dest.into());
        self
    }

    pub fn value_name(mut self, name: impl Into<String>) -> Self {
        self.options.value_name = Some(name.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_positional(&self) -> bool {
        self.names.iter().all(|n| !n.starts_with('-'))
    }

    /// Invocation key for this argument.
    ///
    /// Explicit `dest` wins; otherwise the first long flag, then the first
    /// short flag, then the positional name. Dashes become underscores.
    pub fn dest_key(&self) -> String {
        if let Some(dest) = &self.options.dest {
            return dest.clone();
        }
        let chosen = self
            .names
            .iter()
            .find_map(|n| n.strip_prefix("--"))
            .or_else(|| self.names.iter().find_map(|n| n.strip_prefix('-')))
            .or_else(|| self.names.first().map(String::as_str))
            .unwrap_or_default();
        chosen.replace('-', "_")
    }
}

/// Out-of-band metadata store for one command function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Present iff the function is registered as a subcommand
    pub command: Option<CommandOptions>,
    /// Argument declarations in attachment order (reverse of source order)
    pub args: Vec<ArgSpec>,
    /// Arbitrary keyed metadata
    pub attrs: BTreeMap<String, String>,
}

impl Metadata {
    pub fn is_command(&self) -> bool {
        self.command.is_some()
    }

    /// Argument declarations in source (declaration) order.
    pub fn args_in_declaration_order(&self) -> impl Iterator<Item = &ArgSpec> {
        self.args.iter().rev()
    }
}
