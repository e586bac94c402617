//! The `#[methods]` attribute.
//!
//! Turns an `impl` block into a `MethodHandlers` implementation: every
//! `&self` method with exactly one argument becomes a message method named
//! after the function.
//!
//! Methods that only make sense between values of the type itself are left
//! out by signature: an argument of type `Self` (or the implementing type,
//! by value or by reference) never names a message. Neither do `&mut`
//! arguments, which cover `fmt(&mut Formatter)` and `hash(&mut H)`. Impls
//! of the standard comparison, hashing, formatting and cloning traits are
//! skipped whole.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Type, parse::Parse,
    parse_macro_input,
};

/// Arguments for the `#[methods]` macro.
pub(crate) struct MethodsArgs {
    pub default_handler: bool,
}

impl Parse for MethodsArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut default_handler = false;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;

            match ident.to_string().as_str() {
                "default_handler" => default_handler = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                input.parse::<syn::Token![,]>()?;
            }
        }

        Ok(MethodsArgs { default_handler })
    }
}

/// Options read from `#[wirecall(..)]` on one method.
#[derive(Default)]
struct MethodOptions {
    skip: bool,
    name: Option<LitStr>,
}

impl MethodOptions {
    /// Read and remove the `#[wirecall(..)]` attributes.
    fn take(attrs: &mut Vec<Attribute>) -> syn::Result<Self> {
        let mut options = MethodOptions::default();
        let mut error: Option<syn::Error> = None;

        attrs.retain(|attr| {
            if !attr.path().is_ident("wirecall") {
                return true;
            }
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                    Ok(())
                } else if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    check_name(&lit)?;
                    options.name = Some(lit);
                    Ok(())
                } else {
                    Err(meta.error("expected `skip` or `name = \"..\"`"))
                }
            });
            if let Err(e) = parsed {
                match error.as_mut() {
                    Some(first) => first.combine(e),
                    None => error = Some(e),
                }
            }
            false
        });

        match error {
            Some(e) => Err(e),
            None => Ok(options),
        }
    }
}

fn check_name(lit: &LitStr) -> syn::Result<()> {
    let name = lit.value();
    let reason = if name.is_empty() {
        "message name is empty"
    } else if name.len() > u8::MAX as usize {
        "message name is longer than 255 bytes"
    } else if name.contains(':') {
        "message name contains ':'"
    } else if name.chars().any(char::is_whitespace) {
        "message name contains whitespace"
    } else {
        return Ok(());
    };
    Err(syn::Error::new_spanned(lit, reason))
}

/// Standard traits whose methods are never messages.
const STANDARD_TRAITS: &[&str] = &[
    "PartialEq",
    "Eq",
    "PartialOrd",
    "Ord",
    "Hash",
    "Debug",
    "Display",
    "Clone",
];

fn is_standard_trait(path: &syn::Path) -> bool {
    path.segments
        .last()
        .is_some_and(|segment| STANDARD_TRAITS.contains(&segment.ident.to_string().as_str()))
}

/// True if `ty` is `Self` or spells the implementing type.
fn is_self_type(ty: &Type, self_ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.qself.is_none() && path.path.is_ident("Self"))
        || quote!(#ty).to_string() == quote!(#self_ty).to_string()
}

/// How the single argument reaches the method.
enum Argument<'a> {
    Owned(&'a Type),
    Borrowed(&'a Type),
}

/// Classify `method`. `None` means it is not a message method.
fn classify<'a>(method: &'a ImplItemFn, self_ty: &Type) -> Option<Argument<'a>> {
    let sig = &method.sig;

    let Some(FnArg::Receiver(receiver)) = sig.inputs.first() else {
        return None;
    };
    // `&self` and `self: &Self` both arrive as a `&Self` type
    let shared_self = match &*receiver.ty {
        Type::Reference(reference) if reference.mutability.is_none() => {
            matches!(&*reference.elem, Type::Path(path) if path.path.is_ident("Self"))
        }
        _ => false,
    };
    if !shared_self {
        return None;
    }
    if sig.asyncness.is_some() || sig.unsafety.is_some() || !sig.generics.params.is_empty() {
        return None;
    }
    if sig.inputs.len() != 2 {
        return None;
    }

    let Some(FnArg::Typed(arg)) = sig.inputs.iter().nth(1) else {
        return None;
    };
    let argument = match &*arg.ty {
        Type::Reference(reference) if reference.mutability.is_some() => return None,
        Type::Reference(reference) => Argument::Borrowed(&reference.elem),
        ty => Argument::Owned(ty),
    };
    let (Argument::Owned(ty) | Argument::Borrowed(ty)) = argument;
    if is_self_type(ty, self_ty) {
        return None;
    }
    Some(argument)
}

/// Implementation of the `#[methods]` macro.
pub fn methods_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as MethodsArgs);
    let mut input = parse_macro_input!(item as ItemImpl);

    match expand(&args, &mut input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(args: &MethodsArgs, input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    let self_ty = input.self_ty.clone();
    let qualified = match &input.trait_ {
        Some((_, path, _)) => quote! { <#self_ty as #path> },
        None => quote! { <#self_ty> },
    };

    let standard = input
        .trait_
        .as_ref()
        .is_some_and(|(_, path, _)| is_standard_trait(path));

    let mut registrations = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let options = MethodOptions::take(&mut method.attrs)?;
        if options.skip || standard {
            continue;
        }
        let Some(argument) = classify(method, &self_ty) else {
            continue;
        };

        let ident = &method.sig.ident;
        let name = match &options.name {
            Some(lit) => lit.clone(),
            None => LitStr::new(&ident.to_string(), ident.span()),
        };

        registrations.push(match argument {
            Argument::Owned(ty) => quote! {
                {
                    let this = ::std::sync::Arc::clone(&self);
                    methods.on(#name, move |arg: #ty| #qualified::#ident(&*this, arg));
                }
            },
            Argument::Borrowed(ty) => quote! {
                {
                    let this = ::std::sync::Arc::clone(&self);
                    methods.on_ref(#name, move |arg: &#ty| #qualified::#ident(&*this, arg));
                }
            },
        });
    }

    let default_handler = args.default_handler.then(|| {
        quote! {
            fn as_default_handler(
                self: ::std::sync::Arc<Self>,
            ) -> ::core::option::Option<::std::sync::Arc<dyn ::wirecall::DefaultHandler>> {
                ::core::option::Option::Some(self)
            }
        }
    });

    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics ::wirecall::MethodHandlers for #self_ty #where_clause {
            #[allow(unused_variables)]
            fn register_methods(
                self: ::std::sync::Arc<Self>,
                methods: &mut ::wirecall::Methods<'_>,
            ) {
                #(#registrations)*
            }

            #default_handler
        }
    })
}
