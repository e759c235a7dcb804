use std::fmt::Write;

use crate::ast;

macro_rules! w {
    ($($tt:tt)*) => {
        drop(write!($($tt)*))
    };
}

pub(crate) fn emit(schema: &ast::Schema) -> String {
    let mut buf = String::new();
    for item in &schema.items {
        match item {
            ast::Item::Struct(it) => emit_struct(&mut buf, schema, it),
            ast::Item::Enum(it) => emit_enum(&mut buf, it),
        }
        blank_line(&mut buf);
    }
    buf
}

fn emit_struct(buf: &mut String, schema: &ast::Schema, item: &ast::StructItem) {
    emit_doc(buf, "", &item.doc);
    w!(buf, "#[derive(Debug)]\n");
    if item.fields.is_empty() {
        w!(buf, "pub struct {};\n", item.name);
    } else {
        w!(buf, "pub struct {} {{\n", item.name);
        for field in &item.fields {
            emit_doc(buf, "    ", &field.doc);
            w!(buf, "    pub {}: {},\n", field.name, rust_ty(item, field, &field.ty));
        }
        w!(buf, "}}\n");
    }

    for field in &item.fields {
        if let Some(members) = top_union(&field.ty) {
            blank_line(buf);
            w!(buf, "#[derive(Debug)]\n");
            w!(buf, "pub enum {} {{\n", union_ident(item, field));
            for member in members {
                w!(buf, "    {member}({member}),\n");
            }
            w!(buf, "}}\n");
        }
    }

    blank_line(buf);
    w!(buf, "impl dflags::Schema for {} {{\n", item.name);
    emit_class_spec(buf, schema, item);
    blank_line(buf);
    emit_from_values(buf, schema, item);
    w!(buf, "}}\n");
}

fn emit_class_spec(buf: &mut String, schema: &ast::Schema, item: &ast::StructItem) {
    w!(buf, "    fn class_spec() -> dflags::ClassSpec {{\n");
    w!(buf, "        dflags::ClassSpec::new(\"{}\")\n", item.name);
    if let Some(doc) = &item.doc {
        w!(buf, "            .doc({doc:?})\n");
    }
    if let Some(name) = &item.command_name {
        w!(buf, "            .command_name({name:?})\n");
    }
    if let Some(prog) = &item.prog {
        w!(buf, "            .prog({prog:?})\n");
    }
    for alias in &item.aliases {
        w!(buf, "            .alias({alias:?})\n");
    }
    for field in &item.fields {
        w!(
            buf,
            "            .field(dflags::FieldSpec::new(\"{}\", {})\n",
            field.name,
            type_expr(schema, &field.ty)
        );
        if let Some(doc) = &field.doc {
            w!(buf, "                .help({doc:?})\n");
        }
        for alias in &field.aliases {
            w!(buf, "                .alias({alias:?})\n");
        }
        if field.aliases_override {
            w!(buf, "                .aliases_override()\n");
        }
        if let Some(metavar) = &field.metavar {
            w!(buf, "                .metavar({metavar:?})\n");
        }
        if field.positional {
            w!(buf, "                .positional()\n");
        }
        if field.required {
            w!(buf, "                .required()\n");
        }
        if let Some(default) = &field.default {
            w!(buf, "                .default(|| Box::new({}))\n", default_expr(item, field, default));
        }
        w!(buf, "            )\n");
    }
    w!(buf, "    }}\n");
}

fn emit_from_values(buf: &mut String, schema: &ast::Schema, item: &ast::StructItem) {
    let param = if item.fields.is_empty() { "_values_" } else { "values_" };
    w!(
        buf,
        "    fn from_values({param}: &mut dflags::Values) -> dflags::Result<{}> {{\n",
        item.name
    );
    if item.fields.is_empty() {
        w!(buf, "        Ok({})\n", item.name);
    } else {
        w!(buf, "        Ok({} {{\n", item.name);
        for field in &item.fields {
            w!(buf, "            {}: {},\n", field.name, take_expr(schema, item, field));
        }
        w!(buf, "        }})\n");
    }
    w!(buf, "    }}\n");
}

fn take_expr(schema: &ast::Schema, item: &ast::StructItem, field: &ast::Field) -> String {
    match &field.ty {
        ast::TypeRef::Union(members) => union_take(schema, item, field, members, false),
        ast::TypeRef::Option(inner) => match &**inner {
            ast::TypeRef::Union(members) => union_take(schema, item, field, members, true),
            _ => format!("values_.take_opt(\"{}\")?", field.name),
        },
        ast::TypeRef::Vec(_) => format!("values_.take_list(\"{}\")?", field.name),
        _ => format!("values_.take(\"{}\")?", field.name),
    }
}

fn union_take(
    schema: &ast::Schema,
    item: &ast::StructItem,
    field: &ast::Field,
    members: &[String],
    optional: bool,
) -> String {
    let mut arms = String::new();
    for member in members {
        let dispatch = schema.struct_item(member).unwrap().dispatch_name();
        w!(
            arms,
            "{:?} => {{ values_.enter({:?}); let value_ = {}::{member}(<{member} as dflags::Schema>::from_values(values_)?); values_.leave(); value_ }}\n",
            dispatch,
            dispatch,
            union_ident(item, field)
        );
    }
    w!(
        arms,
        "unknown_ => return Err(values_.bad_command(\"{}\", unknown_)),\n",
        field.name
    );

    if optional {
        format!(
            "match values_.command_opt(\"{}\")? {{\n\
             None => None,\n\
             Some(name_) => Some(match name_.as_str() {{\n{arms}}}),\n\
             }}",
            field.name
        )
    } else {
        format!(
            "{{\n\
             let name_ = values_.command(\"{}\")?;\n\
             match name_.as_str() {{\n{arms}}}\n\
             }}",
            field.name
        )
    }
}

fn emit_enum(buf: &mut String, item: &ast::EnumItem) {
    emit_doc(buf, "", &item.doc);
    w!(buf, "#[derive(Debug, Clone, Copy, PartialEq, Eq)]\n");
    w!(buf, "pub enum {} {{\n", item.name);
    for variant in &item.variants {
        emit_doc(buf, "    ", &variant.doc);
        w!(buf, "    {},\n", variant.name);
    }
    w!(buf, "}}\n");
    blank_line(buf);

    let names =
        item.variants.iter().map(|it| format!("{:?}", kebab(&it.name))).collect::<Vec<_>>();
    w!(buf, "impl dflags::Choices for {} {{\n", item.name);
    w!(buf, "    const NAMES: &'static [&'static str] = &[{}];\n", names.join(", "));
    w!(buf, "    fn by_name(name_: &str) -> Option<{}> {{\n", item.name);
    w!(buf, "        match name_ {{\n");
    for variant in &item.variants {
        w!(buf, "            {:?} => Some({}::{}),\n", kebab(&variant.name), item.name, variant.name);
    }
    w!(buf, "            _ => None,\n");
    w!(buf, "        }}\n");
    w!(buf, "    }}\n");
    w!(buf, "}}\n");
}

fn type_expr(schema: &ast::Schema, ty: &ast::TypeRef) -> String {
    match ty {
        ast::TypeRef::Bool => "dflags::TypeExpr::Bool".to_string(),
        ast::TypeRef::Name(name) if schema.is_enum(name) => {
            format!("dflags::TypeExpr::choice::<{name}>()")
        }
        ast::TypeRef::Name(name) => format!("dflags::TypeExpr::scalar::<{name}>(\"{name}\")"),
        ast::TypeRef::Option(inner) => {
            format!("dflags::TypeExpr::option({})", type_expr(schema, inner))
        }
        ast::TypeRef::Vec(inner) => {
            format!("dflags::TypeExpr::repeated({})", type_expr(schema, inner))
        }
        ast::TypeRef::StrLits(values) => {
            let values = values.iter().map(|it| format!("{it:?}")).collect::<Vec<_>>();
            format!("dflags::TypeExpr::literal_strs(&[{}])", values.join(", "))
        }
        ast::TypeRef::IntLits(values) => {
            let values = values.iter().map(|it| format!("{it}i64")).collect::<Vec<_>>();
            format!("dflags::TypeExpr::literal_ints(&[{}])", values.join(", "))
        }
        ast::TypeRef::Union(members) => {
            let members = members
                .iter()
                .map(|it| format!("dflags::Member::of::<{it}>()"))
                .collect::<Vec<_>>();
            format!("dflags::TypeExpr::union(vec![{}])", members.join(", "))
        }
    }
}

fn rust_ty(item: &ast::StructItem, field: &ast::Field, ty: &ast::TypeRef) -> String {
    match ty {
        ast::TypeRef::Bool => "bool".to_string(),
        ast::TypeRef::Name(name) => name.clone(),
        ast::TypeRef::StrLits(_) => "String".to_string(),
        ast::TypeRef::IntLits(_) => "i64".to_string(),
        ast::TypeRef::Option(inner) => format!("Option<{}>", rust_ty(item, field, inner)),
        ast::TypeRef::Vec(inner) => format!("Vec<{}>", rust_ty(item, field, inner)),
        ast::TypeRef::Union(_) => union_ident(item, field),
    }
}

fn default_expr(item: &ast::StructItem, field: &ast::Field, raw: &str) -> String {
    let ann = default_ann(item, field, &field.ty);
    let raw = raw.trim();
    let expr = if raw.starts_with('"') { format!("{ann}::from({raw})") } else { raw.to_string() };
    format!("{{ let value_: {ann} = {expr}; value_ }}")
}

fn default_ann(item: &ast::StructItem, field: &ast::Field, ty: &ast::TypeRef) -> String {
    match ty {
        ast::TypeRef::Option(inner) => default_ann(item, field, inner),
        _ => rust_ty(item, field, ty),
    }
}

fn top_union(ty: &ast::TypeRef) -> Option<&[String]> {
    match ty {
        ast::TypeRef::Union(members) => Some(members),
        ast::TypeRef::Option(inner) => top_union(inner),
        _ => None,
    }
}

fn union_ident(item: &ast::StructItem, field: &ast::Field) -> String {
    format!("{}{}", item.name, camel(&field.name))
}

fn emit_doc(buf: &mut String, indent: &str, doc: &Option<String>) {
    if let Some(doc) = doc {
        for line in doc.split('\n') {
            w!(buf, "{indent}#[doc = {line:?}]\n");
        }
    }
}

fn blank_line(buf: &mut String) {
    w!(buf, "\n");
}

pub(crate) fn kebab(name: &str) -> String {
    let mut res = String::new();
    let chars = name.chars().collect::<Vec<_>>();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            res.push('-');
            continue;
        }
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|it| it.is_ascii_lowercase());
            if !res.is_empty() && !res.ends_with('-') && (prev_lower || next_lower) {
                res.push('-');
            }
        }
        res.push(c.to_ascii_lowercase());
    }
    res
}

fn camel(name: &str) -> String {
    name.split(['-', '_']).map(first_upper).collect()
}

fn first_upper(s: &str) -> String {
    s.chars()
        .next()
        .map(|it| it.to_ascii_uppercase())
        .into_iter()
        .chain(s.chars().skip(1))
        .collect()
}
