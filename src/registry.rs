use crate::builtin::*;
use crate::command::{CommandFactory, ExitCode};
use crate::env::Environment;
use log::debug;
use std::collections::HashMap;
use std::io::{Read, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, see [`BuiltinCommand`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Builtins by name.
///
/// A name is bound to at most one builtin; registering the same name twice
/// keeps the later one.
pub struct BuiltinRegistry {
    builtins: HashMap<&'static str, Box<dyn CommandFactory>>,
}

impl BuiltinRegistry {
    /// An empty registry. See [`Default`] for the stock set of builtins.
    pub fn new() -> Self {
        Self {
            builtins: HashMap::new(),
        }
    }

    pub(crate) fn register<T: BuiltinCommand + 'static>(&mut self) {
        self.builtins
            .insert(T::name(), Box::new(Factory::<T>::default()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.builtins.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run `argv` as a builtin.
    ///
    /// Returns `None` when `argv[0]` does not name a builtin, so the caller can
    /// fall back to launching a program.
    pub fn dispatch(
        &self,
        argv: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Option<anyhow::Result<ExitCode>> {
        let (name, rest) = argv.split_first()?;
        let factory = self.builtins.get(name.as_str())?;
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        let cmd = factory.try_create(env, name, &args)?;
        debug!("dispatching builtin {name} {args:?}");
        Some(cmd.execute(stdin, stdout, env))
    }
}

impl Default for BuiltinRegistry {
    /// A registry with every builtin except `cd`, which the interpreter
    /// handles before alias expansion.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register::<AddPath>();
        registry.register::<Alias>();
        registry.register::<Echo>();
        registry.register::<Env>();
        registry.register::<Exit>();
        registry.register::<Fg>();
        registry.register::<Help>();
        registry.register::<History>();
        registry.register::<Jobs>();
        registry.register::<Kill>();
        registry.register::<ShowPath>();
        registry.register::<Pwd>();
        registry.register::<Resume>();
        registry.register::<Stop>();
        registry.register::<Touch>();
        registry.register::<Uptime>();
        registry.register::<Whoami>();
        registry
    }
}
