//! Command registry: out-of-band metadata keyed by command name
//!
//! Functions are never mutated. Each definition is a name, a handler and a
//! stack of decorators; the decorators transform the binding's [`Metadata`].
//!
//! Decorators are listed top-to-bottom as they read in source and applied
//! bottom-up, the way stacked annotations apply. `arg` decorators therefore
//! store their specs in reverse source order; the CLI builder re-reverses
//! them ([`Metadata::args_in_declaration_order`]) before handing them to the
//! parser.

use tracing::{debug, warn};

use crate::domain::{ArgSpec, CommandOptions, DomainError, DomainResult, Metadata};

type Effect = Box<dyn FnOnce(&mut Metadata)>;

/// A metadata transform waiting to be applied to a command function.
pub struct Decorator(Effect);

impl Decorator {
    /// Run the transform against `store` and hand the function back untouched.
    pub fn apply<H>(self, handler: H, store: &mut Metadata) -> H {
        (self.0)(store);
        handler
    }
}

impl std::fmt::Debug for Decorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Decorator")
    }
}

/// Wrap an arbitrary metadata transform as a decorator.
pub fn effect(transform: impl FnOnce(&mut Metadata) + 'static) -> Decorator {
    Decorator(Box::new(transform))
}

/// Mark a function as a subcommand, merging `options` into its metadata.
pub fn cmd(options: CommandOptions) -> Decorator {
    effect(move |meta| {
        meta.command
            .get_or_insert_with(CommandOptions::default)
            .merge(options)
    })
}

/// Append one argument declaration to a function's metadata.
pub fn arg(spec: ArgSpec) -> Decorator {
    effect(move |meta| meta.args.push(spec))
}

/// A registered function and its metadata.
#[derive(Debug, Clone)]
pub struct Binding<H> {
    pub name: String,
    pub handler: H,
    pub metadata: Metadata,
}

/// Process-wide function table, built once at startup.
#[derive(Debug, Clone)]
pub struct Registry<H> {
    bindings: Vec<Binding<H>>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<H: Copy> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` under `name` and apply `decorators` bottom-up.
    ///
    /// Defining an existing name again keeps its metadata and stacks the
    /// new decorators on top.
    pub fn define<I>(&mut self, name: impl Into<String>, handler: H, decorators: I) -> &mut Self
    where
        I: IntoIterator<Item = Decorator>,
    {
        let name = name.into();
        let idx = match self.bindings.iter().position(|b| b.name == name) {
            Some(idx) => idx,
            None => {
                self.bindings.push(Binding {
                    name: name.clone(),
                    handler,
                    metadata: Metadata::default(),
                });
                self.bindings.len() - 1
            }
        };

        let binding = &mut self.bindings[idx];
        let decorators: Vec<Decorator> = decorators.into_iter().collect();
        let mut current = handler;
        for decorator in decorators.into_iter().rev() {
            current = decorator.apply(current, &mut binding.metadata);
        }
        binding.handler = current;
        debug!(
            "define: name={}, command={}, args={}",
            binding.name,
            binding.metadata.is_command(),
            binding.metadata.args.len()
        );
        self
    }

    pub fn bindings(&self) -> &[Binding<H>] {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&Binding<H>> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Metadata for a bound function; empty metadata is still metadata.
    pub fn metadata(&self, name: &str) -> Option<&Metadata> {
        self.get(name).map(|b| &b.metadata)
    }

    pub fn handler(&self, name: &str) -> DomainResult<H> {
        self.get(name)
            .map(|b| b.handler)
            .ok_or_else(|| DomainError::UnknownCommand(name.to_string()))
    }

    /// Bindings carrying command metadata, sorted by name.
    ///
    /// Functions that only declare arguments are skipped: without command
    /// metadata there is no subcommand to hang them on.
    pub fn discover(&self) -> Vec<&Binding<H>> {
        let mut found: Vec<&Binding<H>> = Vec::new();
        for binding in &self.bindings {
            if binding.metadata.is_command() {
                found.push(binding);
            } else if !binding.metadata.args.is_empty() {
                warn!(
                    "'{}' declares {} argument(s) but is not a command; skipped",
                    binding.name,
                    binding.metadata.args.len()
                );
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}
