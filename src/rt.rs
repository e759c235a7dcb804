//! Command line tokenizer and the parse driver.
//!
//! The driver walks the token stream against a [`Command`] tree: flags
//! resolve against the currently selected node, bare tokens fill that
//! node's positionals and then select sub-commands. Values are coerced by
//! the registered converter as they are consumed, so the instance builder
//! only moves them into place afterwards.

use std::ffi::OsString;

use crate::command::{ArgKind, Command};
use crate::schema::Converter;
use crate::values::Values;
use crate::{Error, Result};

macro_rules! format_err {
    ($($tt:tt)*) => {
        Error::new(format!($($tt)*))
    };
}

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(format_err!($($tt)*))
    };
}

pub(crate) struct Parser {
    after_double_dash: bool,
    pending_value: Option<String>,
    rargs: Vec<OsString>,
}

impl Parser {
    pub(crate) fn new(mut args: Vec<OsString>) -> Self {
        args.reverse();
        Self { after_double_dash: false, pending_value: None, rargs: args }
    }

    pub(crate) fn pop_flag(&mut self) -> Option<Result<String, OsString>> {
        if self.after_double_dash {
            self.next().map(Err)
        } else {
            let arg = self.next()?;
            let arg_str = arg.to_str().unwrap_or_default();
            if arg_str.starts_with('-') {
                if arg_str == "--" {
                    self.after_double_dash = true;
                    return self.next().map(Err);
                }
                if arg_str.starts_with("--") {
                    if let Some((flag, value)) = arg_str.split_once('=') {
                        self.pending_value = Some(value.to_string());
                        return Some(Ok(flag.to_string()));
                    }
                }
                Some(arg.into_string())
            } else {
                Some(Err(arg))
            }
        }
    }

    fn next(&mut self) -> Option<OsString> {
        self.rargs.pop()
    }

    pub(crate) fn next_value(&mut self, flag: &str) -> Result<OsString> {
        if let Some(value) = self.pending_value.take() {
            return Ok(value.into());
        }
        self.next().ok_or_else(|| format_err!("expected a value for `{flag}`"))
    }

    pub(crate) fn no_value(&mut self, flag: &str) -> Result<()> {
        if self.pending_value.take().is_some() {
            bail!("Flag `{flag}` does not take a value")
        }
        Ok(())
    }

    pub(crate) fn unexpected_flag(&self, flag: &str) -> Error {
        format_err!("Unknown flag: `{flag}`. Use `--help` for more information")
    }

    pub(crate) fn unexpected_arg(&self, arg: OsString) -> Error {
        // `to_string_lossy()` seems appropriate here but OsString's debug implementation actually
        // escapes codes that are not valid utf-8, rather than replace them with `FFFD`
        let dbg = format!("{arg:?}");
        let arg = dbg.trim_matches('"');

        format_err!("Unknown command: `{arg}`. Use `--help` for more information")
    }
}

fn convert(display: &str, converter: &Converter, raw: OsString) -> Result<Box<dyn std::any::Any>> {
    match raw.into_string() {
        Ok(raw) => {
            converter.apply(&raw).map_err(|err| format_err!("Can't parse `{display}`, {err}"))
        }
        Err(raw) => bail!("Can't parse `{display}`, invalid utf8: {raw:?}"),
    }
}

pub(crate) fn run(root: &Command, args: Vec<OsString>) -> Result<Values> {
    let mut p = Parser::new(args);
    let mut values = Values::new();
    let mut path = vec![root];
    let mut prefixes = vec![String::new()];
    let mut pos_idx = 0;

    while let Some(arg) = p.pop_flag() {
        let node = *path.last().unwrap();
        let prefix = prefixes.last().unwrap();
        match arg {
            Ok(flag) => {
                let Some(spec) = node.args.iter().find(|a| a.tokens.iter().any(|t| t == &flag))
                else {
                    return Err(p.unexpected_flag(&flag));
                };
                if spec.is_help() {
                    p.no_value(&flag)?;
                    return Err(Error::help_requested(crate::help::render(root)));
                }
                let key = format!("{prefix}{}", spec.dest);
                match &spec.kind {
                    ArgKind::Toggle { stores } => {
                        p.no_value(&flag)?;
                        if !values.store_one(key, Box::new(*stores)) {
                            bail!("Flag specified more than once: `{}`", spec.display());
                        }
                    }
                    ArgKind::Value(value) => {
                        let raw = p.next_value(&flag)?;
                        let converted = convert(&flag, &value.convert, raw)?;
                        if !values.store_one(key, converted) {
                            bail!("Flag specified more than once: `{}`", spec.display());
                        }
                    }
                    ArgKind::Repeated(value) => {
                        let raw = p.next_value(&flag)?;
                        let converted = convert(&flag, &value.convert, raw)?;
                        values.append(key, converted);
                    }
                }
            }
            Err(arg) => {
                // An unfilled required positional takes the token; after that a
                // bare token selects a sub-command, and only then do optional
                // positionals fill up.
                let required_next =
                    node.positionals.get(pos_idx).map_or(false, |spec| spec.required);
                let chosen = if required_next {
                    None
                } else {
                    let name = arg.to_str().unwrap_or("");
                    node.group.as_ref().and_then(|group| {
                        group.find(name).map(|child| (group.dest, child))
                    })
                };
                if let Some((dest, child)) = chosen {
                    values.pick(format!("{prefix}{dest}"), child.name.clone());
                    let child_prefix = format!("{prefix}{}.", child.name);
                    path.push(child);
                    prefixes.push(child_prefix);
                    pos_idx = 0;
                } else if let Some(spec) = node.positionals.get(pos_idx) {
                    let key = format!("{prefix}{}", spec.dest);
                    match &spec.kind {
                        ArgKind::Value(value) => {
                            let converted = convert(spec.display(), &value.convert, arg)?;
                            values.store_one(key, converted);
                            pos_idx += 1;
                        }
                        ArgKind::Repeated(value) => {
                            let converted = convert(spec.display(), &value.convert, arg)?;
                            values.append(key, converted);
                        }
                        ArgKind::Toggle { .. } => unreachable!(),
                    }
                } else {
                    return Err(p.unexpected_arg(arg));
                }
            }
        }
    }

    for (node, prefix) in path.iter().zip(prefixes.iter()) {
        finalize(node, prefix, &mut values)?;
    }
    Ok(values)
}

/// Applies defaults and enforces required-ness for one selected node.
fn finalize(node: &Command, prefix: &str, values: &mut Values) -> Result<()> {
    for spec in node.args.iter().filter(|a| !a.is_help()).chain(node.positionals.iter()) {
        let key = format!("{prefix}{}", spec.dest);
        if values.contains(&key) {
            continue;
        }
        if spec.required {
            bail!("Flag is required: `{}`. Use `--help` for more information", spec.display());
        }
        if let Some(default) = spec.default {
            values.store_one(key, default());
        }
    }
    if let Some(group) = &node.group {
        let key = format!("{prefix}{}", group.dest);
        if !values.contains(&key) && group.required {
            bail!("A sub-command is required. Use `--help` for more information");
        }
    }
    Ok(())
}
