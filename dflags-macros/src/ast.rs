#[derive(Debug)]
pub(crate) struct Schema {
    pub(crate) items: Vec<Item>,
}

impl Schema {
    pub(crate) fn struct_item(&self, name: &str) -> Option<&StructItem> {
        self.items.iter().find_map(|item| match item {
            Item::Struct(it) if it.name == name => Some(it),
            _ => None,
        })
    }

    pub(crate) fn is_enum(&self, name: &str) -> bool {
        self.items.iter().any(|item| matches!(item, Item::Enum(it) if it.name == name))
    }
}

#[derive(Debug)]
pub(crate) enum Item {
    Struct(StructItem),
    Enum(EnumItem),
}

#[derive(Debug)]
pub(crate) struct StructItem {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
    pub(crate) command_name: Option<String>,
    pub(crate) prog: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) fields: Vec<Field>,
}

impl StructItem {
    pub(crate) fn dispatch_name(&self) -> String {
        self.command_name.clone().unwrap_or_else(|| crate::emit::kebab(&self.name))
    }
}

#[derive(Debug)]
pub(crate) struct Field {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
    pub(crate) ty: TypeRef,
    pub(crate) default: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) aliases_override: bool,
    pub(crate) metavar: Option<String>,
    pub(crate) positional: bool,
    pub(crate) required: bool,
}

#[derive(Debug)]
pub(crate) enum TypeRef {
    Bool,
    Name(String),
    Option(Box<TypeRef>),
    Vec(Box<TypeRef>),
    Union(Vec<String>),
    StrLits(Vec<String>),
    IntLits(Vec<i64>),
}

#[derive(Debug)]
pub(crate) struct EnumItem {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
    pub(crate) variants: Vec<Variant>,
}

#[derive(Debug)]
pub(crate) struct Variant {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Attrs {
    pub(crate) doc: Vec<String>,
    pub(crate) name: Option<String>,
    pub(crate) prog: Option<String>,
    pub(crate) metavar: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) positional: bool,
    pub(crate) required: bool,
    pub(crate) aliases_override: bool,
}

impl Attrs {
    pub(crate) fn doc_text(&self) -> Option<String> {
        if self.doc.is_empty() {
            None
        } else {
            Some(self.doc.join("\n"))
        }
    }

    pub(crate) fn has_field_attrs(&self) -> bool {
        self.metavar.is_some() || self.positional || self.required || self.aliases_override
    }
}
