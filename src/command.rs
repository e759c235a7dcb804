//! Parser configuration: argument registration and sub-command composition.
//!
//! A [`Command`] is the immutable tree built once per schema class: one node
//! per class, each holding its registered arguments and, when the class has
//! a union field, one child node per union member. All schema validation
//! happens here, while the tree is built.

use std::any::TypeId;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::schema::{classify, ClassSpec, DefaultFn, FieldSpec, Member, Shape, ValueShape};
use crate::values::Values;
use crate::{Error, Schema, SchemaError};

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(SchemaError::new(format!($($tt)*)))
    };
}

/// One node of the parser configuration tree.
#[derive(Debug)]
pub struct Command {
    pub(crate) name: String,
    pub(crate) prog: Option<String>,
    pub(crate) doc: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) args: Vec<ArgSpec>,
    pub(crate) positionals: Vec<ArgSpec>,
    pub(crate) group: Option<Group>,
}

/// The sub-command dispatch of one node: which destination records the
/// chosen branch, and the child node for each union member.
#[derive(Debug)]
pub(crate) struct Group {
    pub(crate) dest: &'static str,
    pub(crate) required: bool,
    pub(crate) commands: Vec<Command>,
}

impl Group {
    pub(crate) fn find(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|it| it.name == name || it.aliases.iter().any(|a| a == name))
    }
}

/// One registered argument.
pub struct ArgSpec {
    pub(crate) dest: &'static str,
    pub(crate) tokens: Vec<String>,
    pub(crate) metavar: String,
    pub(crate) help: Option<String>,
    pub(crate) kind: ArgKind,
    pub(crate) required: bool,
    pub(crate) default: Option<DefaultFn>,
}

#[derive(Debug)]
pub(crate) enum ArgKind {
    Toggle { stores: bool },
    Value(ValueShape),
    Repeated(ValueShape),
}

impl ArgSpec {
    /// The name used when reporting on this argument: the primary flag
    /// token, or the bare field name for positionals.
    pub(crate) fn display(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or(self.dest)
    }

    pub(crate) fn is_help(&self) -> bool {
        self.dest == "help"
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgSpec")
            .field("dest", &self.dest)
            .field("tokens", &self.tokens)
            .field("metavar", &self.metavar)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default.map(|_| "..."))
            .finish()
    }
}

fn help_flag() -> ArgSpec {
    ArgSpec {
        dest: "help",
        tokens: vec!["--help".to_string(), "-h".to_string()],
        metavar: String::new(),
        help: Some("Prints help information.".to_string()),
        kind: ArgKind::Toggle { stores: true },
        required: false,
        default: None,
    }
}

fn default_false() -> Box<dyn std::any::Any> {
    Box::new(false)
}

impl Command {
    /// Builds the parser configuration for `T`.
    pub fn of<T: Schema>() -> Result<Command, SchemaError> {
        Command::from_spec(&T::class_spec())
    }

    /// Builds a parser configuration node from explicit field descriptors.
    pub fn from_spec(spec: &ClassSpec) -> Result<Command, SchemaError> {
        let mut cmd = Command {
            name: spec.dispatch_name(),
            prog: spec.prog.clone(),
            doc: spec.doc.clone(),
            aliases: spec.aliases.clone(),
            args: Vec::new(),
            positionals: Vec::new(),
            group: None,
        };
        cmd.extend_from(spec)?;
        cmd.args.push(help_flag());
        Ok(cmd)
    }

    /// Registers `T`'s arguments onto this pre-existing node.
    pub fn augment<T: Schema>(mut self) -> Result<Command, SchemaError> {
        self.extend_from(&T::class_spec())?;
        Ok(self)
    }

    /// Returns the cached configuration for `T`, building it on first use.
    /// Safe to share: configurations are immutable once built.
    pub fn cached<T: Schema>() -> Result<Arc<Command>, SchemaError> {
        static CACHE: OnceLock<Mutex<HashMap<TypeId, Arc<Command>>>> = OnceLock::new();
        let mut cache = CACHE.get_or_init(Default::default).lock().unwrap();
        if let Some(cmd) = cache.get(&TypeId::of::<T>()) {
            return Ok(Arc::clone(cmd));
        }
        let cmd = Arc::new(Command::of::<T>()?);
        cache.insert(TypeId::of::<T>(), Arc::clone(&cmd));
        Ok(cmd)
    }

    /// Parses an argument sequence against this configuration.
    pub fn run(&self, args: Vec<OsString>) -> Result<Values, Error> {
        crate::rt::run(self, args)
    }

    /// The rendered help text for this node and its sub-commands.
    pub fn help_text(&self) -> String {
        crate::help::render(self)
    }

    fn extend_from(&mut self, spec: &ClassSpec) -> Result<(), SchemaError> {
        for field in &spec.fields {
            self.register(spec, field)?;
        }
        Ok(())
    }

    /// Registers exactly one argument for `field`, or delegates to
    /// [`Command::compose`] for sub-command unions.
    fn register(&mut self, class: &ClassSpec, field: &FieldSpec) -> Result<(), SchemaError> {
        if self.dests().any(|dest| dest == field.name) {
            bail!("{}.{}: duplicate destination name", class.name, field.name);
        }
        match classify(class.name, field.name, &field.ty)? {
            Shape::Commands(members) => self.compose(class, field, &members, true),
            Shape::Optional(inner) if matches!(*inner, Shape::Commands(_)) => {
                let Shape::Commands(members) = *inner else { unreachable!() };
                self.compose(class, field, &members, false)
            }
            shape => self.add_arg(class, field, shape),
        }
    }

    fn add_arg(
        &mut self,
        class: &ClassSpec,
        field: &FieldSpec,
        shape: Shape,
    ) -> Result<(), SchemaError> {
        let (kind, required, default) = match shape {
            Shape::Toggle => {
                if field.positional {
                    bail!("{}.{}: boolean fields cannot be positional", class.name, field.name);
                }
                if field.required {
                    bail!("{}.{}: boolean flags cannot be required", class.name, field.name);
                }
                let (stores, default) = match field.default {
                    None => (true, default_false as DefaultFn),
                    Some(default) => match default().downcast_ref::<bool>() {
                        Some(&value) => (!value, default),
                        None => {
                            bail!("{}.{}: default value is not a `bool`", class.name, field.name)
                        }
                    },
                };
                (ArgKind::Toggle { stores }, false, Some(default))
            }
            Shape::Optional(inner) => {
                if field.required {
                    bail!("{}.{}: an Option field cannot be required", class.name, field.name);
                }
                let Shape::Value(value) = *inner else { unreachable!() };
                (ArgKind::Value(value), false, field.default)
            }
            Shape::Value(value) => {
                if field.required && field.default.is_some() {
                    bail!(
                        "{}.{}: both `required` and a default are set",
                        class.name,
                        field.name
                    );
                }
                let required = field.required || field.default.is_none();
                (ArgKind::Value(value), required, field.default)
            }
            Shape::Repeated(value) => {
                if field.required && field.default.is_some() {
                    bail!(
                        "{}.{}: both `required` and a default are set",
                        class.name,
                        field.name
                    );
                }
                if field.positional && self.group.is_some() {
                    bail!(
                        "{}: a repeated positional cannot be combined with sub-commands",
                        class.name
                    );
                }
                (ArgKind::Repeated(value), field.required, field.default)
            }
            Shape::Commands(_) => unreachable!(),
        };

        let tokens = if field.positional {
            if !field.aliases.is_empty() {
                bail!("{}.{}: positional arguments cannot have aliases", class.name, field.name);
            }
            Vec::new()
        } else {
            let primary = format!("--{}", field.name.replace('_', "-"));
            let mut tokens = if field.aliases_override && !field.aliases.is_empty() {
                Vec::new()
            } else {
                vec![primary]
            };
            tokens.extend(field.aliases.iter().cloned());
            for token in &tokens {
                if !token.starts_with('-') {
                    bail!(
                        "{}.{}: alias `{token}` must begin with `-`",
                        class.name,
                        field.name
                    );
                }
                if token == "--help" || token == "-h" {
                    bail!(
                        "{}.{}: `{token}` collides with the generated help flag",
                        class.name,
                        field.name
                    );
                }
                if self.args.iter().any(|arg| arg.tokens.iter().any(|t| t == token)) {
                    bail!("{}.{}: flag `{token}` is already registered", class.name, field.name);
                }
            }
            tokens
        };

        let metavar = field.metavar.clone().unwrap_or_else(|| match &kind {
            ArgKind::Value(value) | ArgKind::Repeated(value) => match &value.choices {
                Some(names) => format!("{{{}}}", names.join(",")),
                None if field.positional => field.name.to_string(),
                None => field.name.replace('_', "-"),
            },
            ArgKind::Toggle { .. } => String::new(),
        });

        let arg = ArgSpec {
            dest: field.name,
            tokens,
            metavar,
            help: field.help.clone(),
            kind,
            required,
            default,
        };
        if field.positional {
            self.positionals.push(arg);
        } else {
            self.args.push(arg);
        }
        Ok(())
    }

    /// Creates one named child node per union member and wires the dispatch
    /// destination that will record the chosen branch.
    fn compose(
        &mut self,
        class: &ClassSpec,
        field: &FieldSpec,
        members: &[Member],
        required: bool,
    ) -> Result<(), SchemaError> {
        if self.group.is_some() {
            bail!("{}: at most one sub-command field per class", class.name);
        }
        if field.positional {
            bail!("{}.{}: a sub-command field cannot be positional", class.name, field.name);
        }
        if field.default.is_some() {
            bail!("{}.{}: a sub-command field cannot take a default", class.name, field.name);
        }
        if !field.aliases.is_empty() {
            bail!("{}.{}: a sub-command field does not take aliases", class.name, field.name);
        }
        if !required && field.required {
            bail!(
                "{}.{}: an optional sub-command union cannot be required",
                class.name,
                field.name
            );
        }
        if self.positionals.iter().any(|p| matches!(p.kind, ArgKind::Repeated(_))) {
            bail!("{}: a repeated positional cannot be combined with sub-commands", class.name);
        }

        let mut commands: Vec<Command> = Vec::new();
        for member in members {
            let spec = (member.spec)();
            let child = Command::from_spec(&spec)?;
            for name in std::iter::once(&child.name).chain(child.aliases.iter()) {
                if commands.iter().any(|c| &c.name == name || c.aliases.contains(name)) {
                    bail!(
                        "{}.{}: duplicate sub-command name `{name}`",
                        class.name,
                        field.name
                    );
                }
            }
            commands.push(child);
        }
        self.group = Some(Group { dest: field.name, required, commands });
        Ok(())
    }

    fn dests(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .chain(self.positionals.iter())
            .map(|arg| arg.dest)
            .chain(self.group.iter().map(|g| g.dest))
    }
}
