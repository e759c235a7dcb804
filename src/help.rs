//! Renders the help text for a parser configuration tree.

use std::fmt::Write;

use crate::command::{ArgKind, ArgSpec, Command};

macro_rules! w {
    ($($tt:tt)*) => {
        drop(write!($($tt)*))
    };
}

pub(crate) fn render(cmd: &Command) -> String {
    let mut buf = String::new();
    help_rec(&mut buf, "", cmd);
    buf
}

fn help_rec(buf: &mut String, prefix: &str, cmd: &Command) {
    let name = if prefix.is_empty() {
        cmd.prog.as_deref().unwrap_or(cmd.name.as_str())
    } else {
        cmd.name.as_str()
    };
    w!(buf, "{prefix}{name}\n");
    if let Some(doc) = &cmd.doc {
        write_lines_indented(buf, doc, 2);
    }
    let indent = if prefix.is_empty() { "" } else { "  " };

    if !cmd.positionals.is_empty() {
        blank_line(buf);
        w!(buf, "{indent}ARGS:\n");

        let mut blank = "";
        for spec in &cmd.positionals {
            w!(buf, "{blank}");
            blank = "\n";

            w!(buf, "    {}\n", positional_usage(spec));
            if let Some(doc) = &spec.help {
                write_lines_indented(buf, doc, 6);
            }
        }
    }

    blank_line(buf);
    w!(buf, "{indent}OPTIONS:\n");

    let mut blank = "";
    for spec in &cmd.args {
        w!(buf, "{blank}");
        blank = "\n";

        w!(buf, "    {}{}\n", flag_tokens(spec), value_usage(spec));
        if let Some(doc) = &spec.help {
            write_lines_indented(buf, doc, 6);
        }
    }

    if let Some(group) = &cmd.group {
        if prefix.is_empty() {
            blank_line(buf);
            w!(buf, "SUBCOMMANDS:");
        }

        let prefix = format!("{prefix}{name} ");
        for sub in &group.commands {
            blank_line(buf);
            blank_line(buf);
            help_rec(buf, &prefix, sub);
        }
    }
}

fn positional_usage(spec: &ArgSpec) -> String {
    let repeated = matches!(spec.kind, ArgKind::Repeated(_));
    if spec.metavar.starts_with('{') {
        let ellipsis = if repeated { "..." } else { "" };
        return format!("{}{ellipsis}", spec.metavar);
    }
    match (repeated, spec.required) {
        (true, _) => format!("<{}>...", spec.metavar),
        (false, true) => format!("<{}>", spec.metavar),
        (false, false) => format!("[{}]", spec.metavar),
    }
}

fn flag_tokens(spec: &ArgSpec) -> String {
    let mut tokens = spec.tokens.iter().map(String::as_str).collect::<Vec<_>>();
    tokens.sort_by_key(|it| it.starts_with("--"));
    tokens.join(", ")
}

fn value_usage(spec: &ArgSpec) -> String {
    match &spec.kind {
        ArgKind::Toggle { .. } => String::new(),
        ArgKind::Value(_) | ArgKind::Repeated(_) => {
            if spec.metavar.starts_with('{') {
                format!(" {}", spec.metavar)
            } else {
                format!(" <{}>", spec.metavar)
            }
        }
    }
}

fn write_lines_indented(buf: &mut String, multiline_str: &str, indent: usize) {
    for line in multiline_str.split('\n').map(str::trim_end) {
        if line.is_empty() {
            w!(buf, "\n")
        } else {
            w!(buf, "{blank:indent$}{line}\n", blank = "");
        }
    }
}

fn blank_line(buf: &mut String) {
    w!(buf, "\n");
}
