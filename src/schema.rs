//! Field descriptors and the type classifier.
//!
//! A [`ClassSpec`] is the ordered, immutable description of one schema
//! class: per field a name, a declared [`TypeExpr`], an optional default and
//! the recognized metadata. [`classify`] resolves each declared type into
//! exactly one argument [`Shape`]; everything downstream (registration,
//! parsing, instance building) dispatches on the shape, never on the type
//! expression again.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::SchemaError;

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(SchemaError::new(format!($($tt)*)))
    };
}

pub(crate) type DefaultFn = fn() -> Box<dyn Any>;

/// Description of one schema class: its name, parser-level metadata and the
/// ordered field descriptors. Built by the `dflags!` macro or by hand.
#[derive(Debug, Clone)]
pub struct ClassSpec {
    pub(crate) name: &'static str,
    pub(crate) command_name: Option<String>,
    pub(crate) doc: Option<String>,
    pub(crate) prog: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) fields: Vec<FieldSpec>,
}

impl ClassSpec {
    pub fn new(name: &'static str) -> ClassSpec {
        ClassSpec {
            name,
            command_name: None,
            doc: None,
            prog: None,
            aliases: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Description shown in help output.
    pub fn doc(mut self, doc: &str) -> ClassSpec {
        self.doc = Some(doc.to_string());
        self
    }

    /// Overrides the derived sub-command name.
    pub fn command_name(mut self, name: &str) -> ClassSpec {
        self.command_name = Some(name.to_string());
        self
    }

    /// Program name shown when this class is the top-level parser.
    pub fn prog(mut self, prog: &str) -> ClassSpec {
        self.prog = Some(prog.to_string());
        self
    }

    /// Extra name accepted for this class when dispatched as a sub-command.
    pub fn alias(mut self, alias: &str) -> ClassSpec {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> ClassSpec {
        self.fields.push(field);
        self
    }

    /// The name this class answers to as a sub-command.
    pub(crate) fn dispatch_name(&self) -> String {
        self.command_name.clone().unwrap_or_else(|| kebab(self.name))
    }
}

/// One field of a schema class: declared type, default and metadata.
#[derive(Clone)]
pub struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) ty: TypeExpr,
    pub(crate) default: Option<DefaultFn>,
    pub(crate) help: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) aliases_override: bool,
    pub(crate) metavar: Option<String>,
    pub(crate) positional: bool,
    pub(crate) required: bool,
}

impl FieldSpec {
    pub fn new(name: &'static str, ty: TypeExpr) -> FieldSpec {
        FieldSpec {
            name,
            ty,
            default: None,
            help: None,
            aliases: Vec::new(),
            aliases_override: false,
            metavar: None,
            positional: false,
            required: false,
        }
    }

    /// Default value, produced fresh for every parse.
    pub fn default(mut self, default: fn() -> Box<dyn Any>) -> FieldSpec {
        self.default = Some(default);
        self
    }

    pub fn help(mut self, help: &str) -> FieldSpec {
        self.help = Some(help.to_string());
        self
    }

    /// Extra flag token accepted for this field, e.g. `-n`.
    pub fn alias(mut self, alias: &str) -> FieldSpec {
        self.aliases.push(alias.to_string());
        self
    }

    /// Aliases replace the derived flag token instead of extending it.
    pub fn aliases_override(mut self) -> FieldSpec {
        self.aliases_override = true;
        self
    }

    /// Display name for the value placeholder in help output.
    pub fn metavar(mut self, metavar: &str) -> FieldSpec {
        self.metavar = Some(metavar.to_string());
        self
    }

    /// Registers the field as a positional argument, without a flag prefix.
    pub fn positional(mut self) -> FieldSpec {
        self.positional = true;
        self
    }

    /// Marks the field explicitly required.
    pub fn required(mut self) -> FieldSpec {
        self.required = true;
        self
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("default", &self.default.map(|_| "..."))
            .field("positional", &self.positional)
            .finish()
    }
}

/// Declared type of a field, as a closed expression tree. The classifier
/// matches over this exhaustively; there is no other type dispatch.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// `bool`: a presence flag.
    Bool,
    /// Any single-value type constructed from the raw token.
    Scalar(Converter),
    /// An enumeration, selected by member name.
    Choice(ChoiceSet),
    /// A fixed alternation of literal values, compared after coercion.
    Literal(ChoiceSet),
    /// `Option<T>`.
    Option(Box<TypeExpr>),
    /// `Vec<T>`.
    Vec(Box<TypeExpr>),
    /// A union of schema classes, dispatched as sub-commands.
    Union(Vec<Member>),
}

impl TypeExpr {
    /// A scalar parsed with `T`'s `FromStr`; `name` is the type name used
    /// in diagnostics.
    pub fn scalar<T>(name: &str) -> TypeExpr
    where
        T: FromStr + Any,
        T::Err: fmt::Display,
    {
        TypeExpr::Scalar(Converter::of::<T>(name))
    }

    pub fn choice<C: Choices + Any>() -> TypeExpr {
        let names = C::NAMES.iter().map(|it| it.to_string()).collect::<Vec<_>>();
        let convert = Converter::new(format!("{{{}}}", names.join(",")), move |raw| {
            C::by_name(raw).map(|it| Box::new(it) as Box<dyn Any>).ok_or_else(|| {
                format!("invalid choice: `{raw}` (choose from {})", C::NAMES.join(", "))
            })
        });
        TypeExpr::Choice(ChoiceSet { names, convert })
    }

    /// A choice among fixed string values; the field holds a `String`.
    pub fn literal_strs(values: &'static [&'static str]) -> TypeExpr {
        let names = values.iter().map(|it| it.to_string()).collect::<Vec<_>>();
        let convert = Converter::new(format!("{{{}}}", names.join(",")), move |raw| {
            if values.contains(&raw) {
                Ok(Box::new(raw.to_string()) as Box<dyn Any>)
            } else {
                Err(format!("invalid choice: `{raw}` (choose from {})", values.join(", ")))
            }
        });
        TypeExpr::Literal(ChoiceSet { names, convert })
    }

    /// A choice among fixed integer values; the field holds an `i64`.
    pub fn literal_ints(values: &'static [i64]) -> TypeExpr {
        let names = values.iter().map(|it| it.to_string()).collect::<Vec<_>>();
        let display = names.join(", ");
        let convert = Converter::new(format!("{{{}}}", names.join(",")), move |raw| {
            let value = raw.parse::<i64>().map_err(|err| err.to_string())?;
            if values.contains(&value) {
                Ok(Box::new(value) as Box<dyn Any>)
            } else {
                Err(format!("invalid choice: `{raw}` (choose from {display})"))
            }
        });
        TypeExpr::Literal(ChoiceSet { names, convert })
    }

    pub fn option(inner: TypeExpr) -> TypeExpr {
        TypeExpr::Option(Box::new(inner))
    }

    pub fn repeated(inner: TypeExpr) -> TypeExpr {
        TypeExpr::Vec(Box::new(inner))
    }

    pub fn union(members: Vec<Member>) -> TypeExpr {
        TypeExpr::Union(members)
    }

    fn describe(&self) -> String {
        match self {
            TypeExpr::Bool => "bool".to_string(),
            TypeExpr::Scalar(convert) => convert.type_name.clone(),
            TypeExpr::Choice(set) | TypeExpr::Literal(set) => set.convert.type_name.clone(),
            TypeExpr::Option(inner) => format!("Option<{}>", inner.describe()),
            TypeExpr::Vec(inner) => format!("Vec<{}>", inner.describe()),
            TypeExpr::Union(_) => "a sub-command union".to_string(),
        }
    }
}

/// An enumeration, selected by member name.
#[derive(Debug, Clone)]
pub struct ChoiceSet {
    pub(crate) names: Vec<String>,
    pub(crate) convert: Converter,
}

/// A function from a raw token to a typed value.
#[derive(Clone)]
pub struct Converter {
    pub(crate) type_name: String,
    convert: Arc<dyn Fn(&str) -> Result<Box<dyn Any>, String> + Send + Sync>,
}

impl Converter {
    pub(crate) fn new<F>(type_name: String, convert: F) -> Converter
    where
        F: Fn(&str) -> Result<Box<dyn Any>, String> + Send + Sync + 'static,
    {
        Converter { type_name, convert: Arc::new(convert) }
    }

    /// Converts via `T`'s `FromStr` impl, the type's own single-argument
    /// constructor from a string.
    pub fn of<T>(name: &str) -> Converter
    where
        T: FromStr + Any,
        T::Err: fmt::Display,
    {
        Converter::new(name.to_string(), |raw| {
            raw.parse::<T>().map(|it| Box::new(it) as Box<dyn Any>).map_err(|err| err.to_string())
        })
    }

    pub(crate) fn apply(&self, raw: &str) -> Result<Box<dyn Any>, String> {
        (self.convert)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converter({})", self.type_name)
    }
}

/// Enumerated command line choices, selected by name rather than by the
/// underlying value. Implemented by `dflags!` for schema enums.
pub trait Choices: Sized + 'static {
    const NAMES: &'static [&'static str];
    fn by_name(name: &str) -> Option<Self>;
}

/// One member class of a sub-command union.
#[derive(Clone)]
pub struct Member {
    pub(crate) spec: fn() -> ClassSpec,
}

impl Member {
    pub fn of<S: crate::Schema>() -> Member {
        Member { spec: S::class_spec }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({})", (self.spec)().name)
    }
}

/// Value handling shared by scalar-like shapes: the converter, plus the
/// choice set when the value is restricted to one.
#[derive(Debug, Clone)]
pub(crate) struct ValueShape {
    pub(crate) convert: Converter,
    pub(crate) choices: Option<Vec<String>>,
}

/// The argument shape a declared type resolves to. Exactly one shape
/// applies per field, determined by the type alone.
#[derive(Debug)]
pub(crate) enum Shape {
    Toggle,
    Value(ValueShape),
    Optional(Box<Shape>),
    Repeated(ValueShape),
    Commands(Vec<Member>),
}

/// Resolves a declared type into its argument shape. Unsupported nestings
/// fail here, before any input is read.
pub(crate) fn classify(class: &str, field: &str, ty: &TypeExpr) -> Result<Shape, SchemaError> {
    let shape = match ty {
        TypeExpr::Bool => Shape::Toggle,
        TypeExpr::Choice(set) | TypeExpr::Literal(set) => Shape::Value(ValueShape {
            convert: set.convert.clone(),
            choices: Some(set.names.clone()),
        }),
        TypeExpr::Option(inner) => match classify(class, field, inner)? {
            shape @ (Shape::Value(_) | Shape::Commands(_)) => Shape::Optional(Box::new(shape)),
            _ => bail!("{class}.{field}: `{}` has no argument shape", ty.describe()),
        },
        TypeExpr::Vec(inner) => match classify(class, field, inner)? {
            Shape::Value(value) => Shape::Repeated(value),
            _ => bail!("{class}.{field}: `{}` has no argument shape", ty.describe()),
        },
        TypeExpr::Union(members) => {
            if members.is_empty() {
                bail!("{class}.{field}: a sub-command union needs at least one member");
            }
            Shape::Commands(members.clone())
        }
        TypeExpr::Scalar(convert) => {
            Shape::Value(ValueShape { convert: convert.clone(), choices: None })
        }
    };
    Ok(shape)
}

/// Derives the command line name of a class or enum variant:
/// `AnalysisStats` becomes `analysis-stats`.
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
