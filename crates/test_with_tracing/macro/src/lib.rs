// Copyright (C) Microsoft Corporation. All rights reserved.

//! Attribute macro behind `test_with_tracing::test`.

use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;
use syn::spanned::Spanned;
use syn::Error;
use syn::ItemFn;

/// Declares a test that runs with `tracing` routed to the test harness.
///
/// The test body runs inside an `INFO` span named after the test.
///
/// # Errors
///
/// Returns a compile error if the function is async or takes arguments.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemFn);
    make_test(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn make_test(mut item: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    if item.sig.asyncness.is_some() {
        return Err(Error::new(
            item.sig.fn_token.span(),
            "test function must not be async",
        ));
    }
    if !item.sig.inputs.is_empty() {
        return Err(Error::new(item.sig.inputs.span(), "expected 0 arguments"));
    }

    // Attributes move to the generated test; the body keeps none.
    let attrs = std::mem::take(&mut item.attrs);
    let name = &item.sig.ident;
    let return_type = &item.sig.output;

    Ok(quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        fn #name() #return_type {
            #item
            ::test_with_tracing::init();
            let span = ::test_with_tracing::tracing::info_span!(stringify!(#name));
            let _span_guard = span.enter();
            #name()
        }
    })
}
