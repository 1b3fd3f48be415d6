use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt};

/// Time a function when the `perf_stats` feature is enabled.
///
/// A guard created at function entry logs the elapsed time through Bevy's
/// `info!` when it is dropped, if the call took longer than the threshold.
/// Without `perf_stats` the guard is compiled out.
///
/// # Example
/// ```ignore
/// #[profile]      // log calls slower than 1 ms
/// pub fn query() { ... }
///
/// #[profile(10)]  // log calls slower than 10 ms
/// pub fn build() { ... }
/// ```
#[proc_macro_attribute]
pub fn profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let threshold_ms: u128 = if attr.is_empty() {
        1
    } else {
        let lit = parse_macro_input!(attr as LitInt);
        match lit.base10_parse() {
            Ok(ms) => ms,
            Err(e) => return e.to_compile_error().into(),
        }
    };
    let threshold = LitInt::new(&format!("{}u128", threshold_ms), Span::call_site());

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let fn_name_str = sig.ident.to_string();

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #[cfg(feature = "perf_stats")]
            let _profile_timer = {
                struct ProfileGuard {
                    name: &'static str,
                    start: std::time::Instant,
                }
                impl Drop for ProfileGuard {
                    fn drop(&mut self) {
                        let elapsed = self.start.elapsed();
                        if elapsed.as_millis() > #threshold {
                            bevy::prelude::info!("[PERF] {}: {:?}", self.name, elapsed);
                        }
                    }
                }
                ProfileGuard {
                    name: #fn_name_str,
                    start: std::time::Instant::now(),
                }
            };

            #block
        }
    };

    output.into()
}
