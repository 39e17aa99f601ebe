use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

extern crate proc_macro;

/// The derives every `Metric`/`Aggregate` implementor needs: serde round-tripping
/// plus comparison, debugging and cloning.
fn common_derives(ast: &ItemStruct) -> proc_macro2::TokenStream {
    quote! {
        #[derive(
            serde::Serialize,
            serde::Deserialize,
            std::cmp::PartialOrd,
            std::cmp::PartialEq,
            std::fmt::Debug,
            std::clone::Clone
        )]
        #ast
    }
}

/// Marks a struct as a metric sample: stamps on the trait-bound derives and
/// emits the `Metric` marker impl. `Metric` must be in scope at the call site.
#[proc_macro_attribute]
pub fn metric(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let derived = common_derives(&ast);
    let expanded = quote! {
        #derived

        impl #impl_generics Metric for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

/// Stamps the trait-bound derives onto an aggregate struct. The `Aggregate`
/// impl itself stays hand-written since `consume`/`merge` carry the semantics.
#[proc_macro_attribute]
pub fn aggregate(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    let derived = common_derives(&ast);

    TokenStream::from(derived)
}
