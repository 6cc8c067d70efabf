use proc_macro::TokenStream;
use quote::{quote, quote_spanned};
use syn::{parse_macro_input, spanned::Spanned, ItemFn};

/// Reject signatures the runtime entry points cannot drive.
fn check_signature(input: &ItemFn, what: &str) -> Option<TokenStream> {
    if input.sig.asyncness.is_none() {
        return Some(
            quote_spanned! { input.sig.fn_token.span()=>
                compile_error!("fn must be `async fn`");
            }
            .into(),
        );
    }

    if !input.sig.inputs.is_empty() {
        let message = format!("arguments to {what} are not supported");
        return Some(
            quote_spanned! { input.sig.inputs.span()=>
                compile_error!(#message);
            }
            .into(),
        );
    }
    None
}

/// Run `async fn main` to completion on the `deferred` reactor.
///
/// Every pending job, spawned task and timer created by `main` is driven by
/// `deferred::runtime::block_on` until the returned future resolves.
#[proc_macro_attribute]
pub fn attr_macro_main(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    if let Some(err) = check_signature(&input, "main") {
        return err;
    }

    if input.sig.ident != "main" {
        return quote_spanned! { input.sig.ident.span()=>
            compile_error!("only `async fn main` can be used for #[deferred::main]");
        }
        .into();
    }

    let attrs = input.attrs;
    let output = input.sig.output;
    let block = input.block;
    quote! {
        #(#attrs)*
        pub fn main() #output {
            async fn __run() #output {
                #block
            }

            ::deferred::runtime::block_on(async {
                __run().await
            })
        }
    }
    .into()
}

/// Turn an `async fn` into a `#[test]` driven by `deferred::runtime::block_on`.
///
/// Attributes such as `#[should_panic]` stay on the generated test function.
#[proc_macro_attribute]
pub fn attr_macro_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    if let Some(err) = check_signature(&input, "tests") {
        return err;
    }

    let name = input.sig.ident;
    let attrs = input.attrs;
    let output = input.sig.output;
    let block = input.block;
    quote! {
        #[test]
        #(#attrs)*
        pub fn #name() #output {
            async fn __run() #output {
                #block
            }

            ::deferred::runtime::block_on(async {
                __run().await
            })
        }
    }
    .into()
}
