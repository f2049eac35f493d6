#![deny(unsafe_code)]
extern crate proc_macro;

mod plugin;

/// Implements `rmqtt_ext::plugin::PackageInfo` from the plugin crate's Cargo metadata.
#[proc_macro_derive(Plugin)]
pub fn derive_plugin(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    plugin::build(input)
}
