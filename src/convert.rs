//! Renders a parser configuration back into schema declaration source.
//!
//! The reverse of parser building, for migrating hand-assembled
//! configurations to declarative schemas. Best-effort by nature: scalar
//! types are named after their converters, enumerations come back as
//! literal choices, and a field that is merely defaulted is rendered as
//! optional because the default expression is not recoverable from the
//! built configuration.

use std::fmt::Write;

use crate::command::{ArgKind, ArgSpec, Command};

macro_rules! w {
    ($($tt:tt)*) => {
        drop(write!($($tt)*))
    };
}

/// Renders `cmd` as the equivalent `dflags!` invocation.
pub fn to_schema_source(cmd: &Command) -> String {
    let mut buf = String::new();
    w!(buf, "dflags! {{\n");
    emit_struct(&mut buf, cmd);
    w!(buf, "}}\n");
    buf
}

fn emit_struct(buf: &mut String, cmd: &Command) {
    if let Some(doc) = &cmd.doc {
        for line in doc.split('\n') {
            w!(buf, "    /// {line}\n");
        }
    }
    if let Some(prog) = &cmd.prog {
        w!(buf, "    #[prog = {prog:?}]\n");
    }
    for alias in &cmd.aliases {
        w!(buf, "    #[alias = {alias:?}]\n");
    }
    w!(buf, "    struct {} {{\n", camel(&cmd.name));

    for spec in cmd.positionals.iter().chain(cmd.args.iter().filter(|it| !it.is_help())) {
        emit_field(buf, spec);
    }
    if let Some(group) = &cmd.group {
        let members =
            group.commands.iter().map(|it| camel(&it.name)).collect::<Vec<_>>().join(" | ");
        if group.required {
            w!(buf, "        {}: {members},\n", group.dest);
        } else {
            w!(buf, "        {}: Option<{members}>,\n", group.dest);
        }
    }
    w!(buf, "    }}\n");

    if let Some(group) = &cmd.group {
        for sub in &group.commands {
            w!(buf, "\n");
            emit_struct(buf, sub);
        }
    }
}

fn emit_field(buf: &mut String, spec: &ArgSpec) {
    if let Some(help) = &spec.help {
        for line in help.split('\n') {
            w!(buf, "        /// {line}\n");
        }
    }
    if spec.tokens.is_empty() {
        w!(buf, "        #[positional]\n");
    } else {
        let derived = format!("--{}", spec.dest.replace('_', "-"));
        let (aliases, overridden) = match spec.tokens.first() {
            Some(first) if *first == derived => (&spec.tokens[1..], false),
            _ => (&spec.tokens[..], true),
        };
        if overridden {
            w!(buf, "        #[aliases_override]\n");
        }
        for alias in aliases {
            w!(buf, "        #[alias = {alias:?}]\n");
        }
    }
    let derived_metavar = if spec.tokens.is_empty() {
        spec.dest.to_string()
    } else {
        spec.dest.replace('_', "-")
    };
    if !spec.metavar.is_empty() && !spec.metavar.starts_with('{') && spec.metavar != derived_metavar
    {
        w!(buf, "        #[metavar = {:?}]\n", spec.metavar);
    }
    if spec.required && matches!(spec.kind, ArgKind::Repeated(_)) {
        w!(buf, "        #[required]\n");
    }
    w!(buf, "        {}: {},\n", spec.dest, field_type(spec));
}

fn field_type(spec: &ArgSpec) -> String {
    match &spec.kind {
        ArgKind::Toggle { .. } => "bool".to_string(),
        ArgKind::Value(value) | ArgKind::Repeated(value) => {
            let inner = match &value.choices {
                Some(names) if names.iter().all(|it| it.parse::<i64>().is_ok()) => {
                    names.join(" | ")
                }
                Some(names) => {
                    names.iter().map(|it| format!("{it:?}")).collect::<Vec<_>>().join(" | ")
                }
                None => value.convert.type_name.clone(),
            };
            match &spec.kind {
                ArgKind::Repeated(_) => format!("Vec<{inner}>"),
                _ if !spec.required => format!("Option<{inner}>"),
                _ => inner,
            }
        }
    }
}

/// `analysis-stats` back to `AnalysisStats`.
fn camel(name: &str) -> String {
    name.split('-')
        .map(|chunk| {
            let mut chars = chunk.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
