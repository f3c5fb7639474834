//! Augment the development of compact indices with procedural macros.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitStr};

/// Run a test function with a [tracing] subscriber that writes to the test output.
///
/// The log level defaults to `DEBUG` and can be overridden with a string literal
/// (`TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`). Crates using this attribute must
/// depend on `tracing` and `tracing-subscriber`.
///
/// # Example
/// ```rust
/// use binsearch_macros::test_traced;
///
/// #[test_traced("INFO")]
/// fn test_info_level() {
///     tracing::info!("visible");
///     tracing::debug!("hidden");
/// }
/// ```
#[proc_macro_attribute]
pub fn test_traced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    // Parse the log level
    let level = if attr.is_empty() {
        "DEBUG".to_string()
    } else {
        parse_macro_input!(attr as LitStr).value()
    };
    let level = match level.to_uppercase().as_str() {
        "TRACE" => quote! { tracing::Level::TRACE },
        "DEBUG" => quote! { tracing::Level::DEBUG },
        "INFO" => quote! { tracing::Level::INFO },
        "WARN" => quote! { tracing::Level::WARN },
        "ERROR" => quote! { tracing::Level::ERROR },
        other => {
            return syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("invalid log level: {other}"),
            )
            .to_compile_error()
            .into();
        }
    };

    let attrs = input.attrs;
    let vis = input.vis;
    let sig = input.sig;
    let block = input.block;
    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let subscriber = tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(#level)
                .with_line_number(true)
                .finish();
            let dispatcher = tracing::Dispatch::new(subscriber);
            tracing::dispatcher::with_default(&dispatcher, || #block)
        }
    };
    TokenStream::from(expanded)
}
