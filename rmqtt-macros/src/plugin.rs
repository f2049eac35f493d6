use quote::quote;
use syn::{parse_macro_input, DeriveInput};

pub(crate) fn build(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {

        impl #impl_generics rmqtt_ext::plugin::PackageInfo for #name #ty_generics #where_clause {
            #[inline]
            fn name(&self) -> &str {
                env!("CARGO_PKG_NAME")
            }

            #[inline]
            fn version(&self) -> &str {
                env!("CARGO_PKG_VERSION")
            }

            #[inline]
            fn descr(&self) -> Option<&str> {
                option_env!("CARGO_PKG_DESCRIPTION").filter(|descr| !descr.is_empty())
            }

            #[inline]
            fn authors(&self) -> Option<Vec<&str>> {
                option_env!("CARGO_PKG_AUTHORS")
                    .filter(|authors| !authors.is_empty())
                    .map(|authors| authors.split(':').collect())
            }

            #[inline]
            fn homepage(&self) -> Option<&str> {
                option_env!("CARGO_PKG_HOMEPAGE").filter(|homepage| !homepage.is_empty())
            }

            #[inline]
            fn license(&self) -> Option<&str> {
                option_env!("CARGO_PKG_LICENSE").filter(|license| !license.is_empty())
            }

            #[inline]
            fn repository(&self) -> Option<&str> {
                option_env!("CARGO_PKG_REPOSITORY").filter(|repository| !repository.is_empty())
            }
        }

    };

    proc_macro::TokenStream::from(expanded)
}
