mod ast;
mod parse;
mod emit;

#[cfg(not(test))]
#[proc_macro]
pub fn dflags(ts: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let schema = parse::schema(ts).unwrap();
    let text = emit::emit(&schema);
    text.parse().unwrap()
}

#[cfg(test)]
pub fn compile(src: &str) -> String {
    use proc_macro2::TokenStream;

    let ts = src.parse::<TokenStream>().unwrap();
    let schema = parse::schema(ts).unwrap();
    emit::emit(&schema)
}
