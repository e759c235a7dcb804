use std::{fmt, mem};

#[cfg(not(test))]
use proc_macro::{Delimiter, TokenStream, TokenTree};
#[cfg(test)]
use proc_macro2::{Delimiter, TokenStream, TokenTree};

use crate::ast;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub(crate) struct Error {
    msg: String,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.msg, f)
    }
}

macro_rules! format_err {
    ($($tt:tt)*) => {
        Error { msg: format!($($tt)*) }
    };
}

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(format_err!($($tt)*))
    };
}

pub(crate) fn schema(ts: TokenStream) -> Result<ast::Schema> {
    let p = &mut Parser::new(ts);
    let mut items = Vec::new();
    while !p.end() {
        let attrs = opt_attrs(p)?;
        if p.at_keyword("struct") {
            items.push(ast::Item::Struct(struct_item(p, attrs)?));
        } else if p.at_keyword("enum") {
            items.push(ast::Item::Enum(enum_item(p, attrs)?));
        } else {
            bail!("expected `struct` or `enum`")
        }
    }
    let res = ast::Schema { items };
    validate(&res)?;
    Ok(res)
}

fn opt_attrs(p: &mut Parser) -> Result<ast::Attrs> {
    let mut res = ast::Attrs::default();
    while p.eat_punct('#') {
        p.enter_delim(Delimiter::Bracket)?;
        let key = p.expect_ident()?;
        match key.as_str() {
            "doc" => {
                p.expect_punct('=')?;
                let mut line = p.expect_string()?;
                if let Some(suf) = line.strip_prefix(' ') {
                    line = suf.to_string();
                }
                res.doc.push(line);
            }
            "name" => {
                p.expect_punct('=')?;
                res.name = Some(p.expect_string()?);
            }
            "prog" => {
                p.expect_punct('=')?;
                res.prog = Some(p.expect_string()?);
            }
            "metavar" => {
                p.expect_punct('=')?;
                res.metavar = Some(p.expect_string()?);
            }
            "alias" => {
                p.expect_punct('=')?;
                res.aliases.push(p.expect_string()?);
            }
            "positional" => res.positional = true,
            "required" => res.required = true,
            "aliases_override" => res.aliases_override = true,
            _ => bail!("unknown attribute `{key}`"),
        }
        p.exit_delim()?;
    }
    Ok(res)
}

fn struct_item(p: &mut Parser, attrs: ast::Attrs) -> Result<ast::StructItem> {
    p.expect_keyword("struct")?;
    let name = p.expect_ident()?;
    if attrs.has_field_attrs() {
        bail!("field attributes are not allowed on `struct {name}`")
    }

    let mut fields = Vec::new();
    p.enter_delim(Delimiter::Brace)?;
    while !p.end() {
        fields.push(field(p)?);
    }
    p.exit_delim()?;

    Ok(ast::StructItem {
        name,
        doc: attrs.doc_text(),
        command_name: attrs.name,
        prog: attrs.prog,
        aliases: attrs.aliases,
        fields,
    })
}

fn field(p: &mut Parser) -> Result<ast::Field> {
    let attrs = opt_attrs(p)?;
    let name = p.expect_ident()?;
    if attrs.name.is_some() || attrs.prog.is_some() {
        bail!("`name` and `prog` are not allowed on field `{name}`")
    }
    p.expect_punct(':')?;
    let ty = ty(p)?;
    let default = if p.eat_punct('=') { Some(default_tokens(p)?) } else { None };
    p.eat_punct(',');
    Ok(ast::Field {
        name,
        doc: attrs.doc_text(),
        ty,
        default,
        aliases: attrs.aliases,
        aliases_override: attrs.aliases_override,
        metavar: attrs.metavar,
        positional: attrs.positional,
        required: attrs.required,
    })
}

fn ty(p: &mut Parser) -> Result<ast::TypeRef> {
    if p.at_literal() {
        return literal_alternation(p);
    }
    let name = p.expect_ident()?;
    match name.as_str() {
        "bool" => return Ok(ast::TypeRef::Bool),
        "Option" | "Vec" if p.eat_punct('<') => {
            let inner = Box::new(ty(p)?);
            p.expect_punct('>')?;
            let res = if name == "Option" {
                ast::TypeRef::Option(inner)
            } else {
                ast::TypeRef::Vec(inner)
            };
            return Ok(res);
        }
        _ => (),
    }
    if p.at_punct('|') {
        let mut members = vec![name];
        while p.eat_punct('|') {
            members.push(p.expect_ident()?);
        }
        return Ok(ast::TypeRef::Union(members));
    }
    Ok(ast::TypeRef::Name(name))
}

fn literal_alternation(p: &mut Parser) -> Result<ast::TypeRef> {
    let mut strs = Vec::new();
    let mut ints = Vec::new();
    loop {
        let lit = p.expect_literal()?;
        if lit.starts_with('"') {
            strs.push(str_lit_value(lit));
        } else {
            match lit.parse::<i64>() {
                Ok(value) => ints.push(value),
                Err(_) => bail!("unsupported literal `{lit}`"),
            }
        }
        if !p.eat_punct('|') {
            break;
        }
        if !p.at_literal() {
            bail!("literal choices cannot mix with other types")
        }
    }
    if !strs.is_empty() && !ints.is_empty() {
        bail!("literal choices must all have the same type")
    }
    if strs.is_empty() {
        Ok(ast::TypeRef::IntLits(ints))
    } else {
        Ok(ast::TypeRef::StrLits(strs))
    }
}

fn default_tokens(p: &mut Parser) -> Result<String> {
    let mut trees = Vec::new();
    while !p.end() && !p.at_punct(',') {
        trees.push(p.bump().unwrap());
    }
    if trees.is_empty() {
        bail!("expected a default value")
    }
    Ok(trees.into_iter().collect::<TokenStream>().to_string())
}

fn enum_item(p: &mut Parser, attrs: ast::Attrs) -> Result<ast::EnumItem> {
    p.expect_keyword("enum")?;
    let name = p.expect_ident()?;
    if attrs.has_field_attrs() || attrs.name.is_some() || attrs.prog.is_some() || !attrs.aliases.is_empty() {
        bail!("only doc comments are allowed on `enum {name}`")
    }

    let mut variants = Vec::new();
    p.enter_delim(Delimiter::Brace)?;
    while !p.end() {
        let vattrs = opt_attrs(p)?;
        if vattrs.has_field_attrs()
            || vattrs.name.is_some()
            || vattrs.prog.is_some()
            || !vattrs.aliases.is_empty()
        {
            bail!("only doc comments are allowed on variants of `enum {name}`")
        }
        let vname = p.expect_ident()?;
        p.eat_punct(',');
        variants.push(ast::Variant { name: vname, doc: vattrs.doc_text() });
    }
    p.exit_delim()?;

    Ok(ast::EnumItem { name, doc: attrs.doc_text(), variants })
}

fn validate(schema: &ast::Schema) -> Result<()> {
    let mut names: Vec<&str> = Vec::new();
    for item in &schema.items {
        let name = match item {
            ast::Item::Struct(it) => it.name.as_str(),
            ast::Item::Enum(it) => it.name.as_str(),
        };
        if names.contains(&name) {
            bail!("duplicate item `{name}`")
        }
        names.push(name);
    }

    for item in &schema.items {
        match item {
            ast::Item::Struct(it) => {
                for field in &it.fields {
                    check_type(schema, it, field, &field.ty, true)?;
                }
                check_union_cycle(schema, &it.name, &mut Vec::new())?;
            }
            ast::Item::Enum(it) => {
                if it.variants.is_empty() {
                    bail!("enum `{}` needs at least one variant", it.name)
                }
                let mut seen: Vec<&str> = Vec::new();
                for variant in &it.variants {
                    if seen.contains(&variant.name.as_str()) {
                        bail!("duplicate variant `{}` in enum `{}`", variant.name, it.name)
                    }
                    seen.push(&variant.name);
                }
            }
        }
    }
    Ok(())
}

fn check_type(
    schema: &ast::Schema,
    item: &ast::StructItem,
    field: &ast::Field,
    ty: &ast::TypeRef,
    union_ok: bool,
) -> Result<()> {
    match ty {
        ast::TypeRef::Name(name) => {
            if schema.struct_item(name).is_some() {
                bail!(
                    "{}.{}: nest schema structs through a sub-command union, e.g. `{name} | ...`",
                    item.name,
                    field.name
                )
            }
        }
        ast::TypeRef::Union(members) => {
            if !union_ok {
                bail!("{}.{}: a sub-command union cannot be nested in `Vec`", item.name, field.name)
            }
            for member in members {
                if schema.struct_item(member).is_none() {
                    bail!(
                        "{}.{}: union member `{member}` is not a schema struct in this block",
                        item.name,
                        field.name
                    )
                }
            }
        }
        ast::TypeRef::Option(inner) => check_type(schema, item, field, inner, union_ok)?,
        ast::TypeRef::Vec(inner) => check_type(schema, item, field, inner, false)?,
        _ => (),
    }
    Ok(())
}

fn check_union_cycle<'a>(
    schema: &'a ast::Schema,
    name: &'a str,
    trail: &mut Vec<&'a str>,
) -> Result<()> {
    if trail.contains(&name) {
        bail!("recursive sub-command union involving `{name}`")
    }
    let Some(item) = schema.struct_item(name) else { return Ok(()) };
    trail.push(name);
    for field in &item.fields {
        for member in union_members(&field.ty) {
            check_union_cycle(schema, member, trail)?;
        }
    }
    trail.pop();
    Ok(())
}

fn union_members(ty: &ast::TypeRef) -> &[String] {
    match ty {
        ast::TypeRef::Union(members) => members,
        ast::TypeRef::Option(inner) => union_members(inner),
        _ => &[],
    }
}

struct Parser {
    stack: Vec<Vec<TokenTree>>,
    ts: Vec<TokenTree>,
}

impl Parser {
    fn new(ts: TokenStream) -> Self {
        let mut ts = ts.into_iter().collect::<Vec<_>>();
        ts.reverse();
        Self { stack: Vec::new(), ts }
    }

    fn enter_delim(&mut self, delimiter: Delimiter) -> Result<()> {
        match self.ts.pop() {
            Some(TokenTree::Group(g)) if g.delimiter() == delimiter => {
                let mut ts = g.stream().into_iter().collect::<Vec<_>>();
                ts.reverse();
                let ts = mem::replace(&mut self.ts, ts);
                self.stack.push(ts);
            }
            _ => bail!("expected `{{`"),
        }
        Ok(())
    }
    fn exit_delim(&mut self) -> Result<()> {
        if !self.end() {
            bail!("expected `}}`")
        }
        self.ts = self.stack.pop().unwrap();
        Ok(())
    }
    fn end(&mut self) -> bool {
        self.ts.last().is_none()
    }
    fn bump(&mut self) -> Option<TokenTree> {
        self.ts.pop()
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if !self.eat_keyword(kw) {
            bail!("expected `{kw}`")
        }
        Ok(())
    }
    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.ts.pop().unwrap();
            true
        } else {
            false
        }
    }
    fn at_keyword(&mut self, kw: &str) -> bool {
        match self.ts.last() {
            Some(TokenTree::Ident(ident)) => &ident.to_string() == kw,
            _ => false,
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.ts.pop() {
            Some(TokenTree::Ident(ident)) => Ok(ident.to_string()),
            next => {
                let next = next.map(|it| it.to_string()).unwrap_or_default();
                bail!("expected a name, got: `{next}`")
            }
        }
    }

    fn expect_punct(&mut self, punct: char) -> Result<()> {
        if !self.eat_punct(punct) {
            bail!("expected `{punct}`")
        }
        Ok(())
    }
    fn eat_punct(&mut self, punct: char) -> bool {
        if self.at_punct(punct) {
            self.ts.pop();
            true
        } else {
            false
        }
    }
    fn at_punct(&mut self, punct: char) -> bool {
        match self.ts.last() {
            Some(TokenTree::Punct(p)) => p.as_char() == punct,
            _ => false,
        }
    }

    fn at_literal(&mut self) -> bool {
        matches!(self.ts.last(), Some(TokenTree::Literal(_)))
    }
    fn expect_literal(&mut self) -> Result<String> {
        match self.ts.pop() {
            Some(TokenTree::Literal(lit)) => Ok(lit.to_string()),
            _ => bail!("expected a literal"),
        }
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.ts.pop() {
            Some(TokenTree::Literal(lit)) if lit.to_string().starts_with('"') => {
                let res = str_lit_value(lit.to_string());
                Ok(res)
            }
            _ => bail!("expected a string"),
        }
    }
}

/// "Parses" a string literal into the corresponding value.
///
/// Really needs support in the proc_macro library:
/// <https://internals.rust-lang.org/t/getting-value-out-of-proc-macro-literal/14140>
fn str_lit_value(lit: String) -> String {
    lit.trim_matches('"').replace("\\'", "'")
}
