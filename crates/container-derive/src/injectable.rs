//! Injectable attribute macro implementation
//!
//! Provides the `#[injectable]` attribute macro for implementing the
//! Injectable trait from a struct's fields.

use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use syn::{
    parse::Result, parse_macro_input, Attribute, Error, GenericArgument, Item, ItemStruct,
    LitStr, PathArguments, PathSegment, Type, TypePath,
};

/// Main implementation function for the injectable macro
pub fn injectable_impl(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = proc_macro2::TokenStream::from(args);
    if !args.is_empty() {
        return Error::new_spanned(args, "#[injectable] does not take arguments")
            .to_compile_error()
            .into();
    }

    let input_item = parse_macro_input!(input as Item);

    match process_injectable_item(input_item) {
        Ok(result) => result.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn process_injectable_item(item: Item) -> Result<proc_macro2::TokenStream> {
    match item {
        Item::Struct(mut item_struct) => process_injectable_struct(&mut item_struct),
        _ => Err(Error::new_spanned(
            item,
            "#[injectable] can only be applied to structs",
        )),
    }
}

fn process_injectable_struct(item_struct: &mut ItemStruct) -> Result<proc_macro2::TokenStream> {
    let dependencies = extract_dependencies_from_struct(item_struct)?;
    let injectable_impl = generate_injectable_impl(item_struct, &dependencies);

    Ok(quote! {
        #item_struct

        #injectable_impl
    })
}

/// Dependency information extracted from a struct field
#[derive(Debug, Clone)]
struct DependencyInfo {
    /// The type to inject (inner type for Arc<T> or Option<Arc<T>>)
    service_type: Type,
    /// Whether this dependency is optional
    is_optional: bool,
    /// Binding name from `#[inject(name = "...")]`
    name: Option<LitStr>,
    field_name: Ident,
}

/// Extract dependencies from named fields, stripping `#[inject]` attributes
fn extract_dependencies_from_struct(item_struct: &mut ItemStruct) -> Result<Vec<DependencyInfo>> {
    let mut dependencies = Vec::new();

    match &mut item_struct.fields {
        syn::Fields::Named(fields) => {
            for field in fields.named.iter_mut() {
                let name = take_inject_name(&mut field.attrs)?;
                if let Some(field_name) = &field.ident {
                    let mut dep_info = analyze_field_type(&field.ty, field_name.clone())?;
                    dep_info.name = name;
                    dependencies.push(dep_info);
                }
            }
        }
        syn::Fields::Unit => {}
        syn::Fields::Unnamed(_) => {
            return Err(Error::new_spanned(
                &item_struct.ident,
                "#[injectable] requires structs with named fields",
            ));
        }
    }

    Ok(dependencies)
}

/// Remove `#[inject(name = "...")]` from a field and return the name
fn take_inject_name(attrs: &mut Vec<Attribute>) -> Result<Option<LitStr>> {
    let mut name = None;
    let mut error = None;

    attrs.retain(|attr| {
        if !attr.path().is_ident("inject") {
            return true;
        }

        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported inject option, expected `name = \"...\"`"))
            }
        });

        if let Err(err) = parsed {
            error = Some(err);
        }
        false
    });

    match error {
        Some(err) => Err(err),
        None => Ok(name),
    }
}

/// Supports: Arc<T>, Option<Arc<T>>
fn analyze_field_type(field_type: &Type, field_name: Ident) -> Result<DependencyInfo> {
    match field_type {
        Type::Path(type_path) => analyze_type_path(type_path, field_name),
        _ => Err(Error::new_spanned(
            field_type,
            "Unsupported field type for dependency injection. Use Arc<T> or Option<Arc<T>>",
        )),
    }
}

fn analyze_type_path(type_path: &TypePath, field_name: Ident) -> Result<DependencyInfo> {
    let segment = type_path
        .path
        .segments
        .last()
        .ok_or_else(|| Error::new_spanned(type_path, "Invalid type path"))?;

    match segment.ident.to_string().as_str() {
        "Option" => {
            let inner_type = extract_generic_type(segment, "Option")?;
            Ok(DependencyInfo {
                service_type: extract_arc_inner_type(&inner_type)?,
                is_optional: true,
                name: None,
                field_name,
            })
        }
        "Arc" => Ok(DependencyInfo {
            service_type: extract_generic_type(segment, "Arc")?,
            is_optional: false,
            name: None,
            field_name,
        }),
        _ => Err(Error::new_spanned(
            type_path,
            "Dependency injection fields must be Arc<T> or Option<Arc<T>>",
        )),
    }
}

fn extract_generic_type(segment: &PathSegment, expected_name: &str) -> Result<Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(GenericArgument::Type(inner_type)) = args.args.first() {
            return Ok(inner_type.clone());
        }
    }

    Err(Error::new_spanned(
        segment,
        format!("Failed to extract generic type from {}<T>", expected_name),
    ))
}

fn extract_arc_inner_type(ty: &Type) -> Result<Type> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Arc" {
                return extract_generic_type(segment, "Arc");
            }
        }
    }

    Err(Error::new_spanned(ty, "Expected Arc<T> type"))
}

fn generate_injectable_impl(
    item_struct: &ItemStruct,
    dependencies: &[DependencyInfo],
) -> proc_macro2::TokenStream {
    let struct_name = &item_struct.ident;
    let (impl_generics, ty_generics, where_clause) = item_struct.generics.split_for_impl();

    // Optional dependencies are not part of the declared list: their absence is not an error
    let required_keys: Vec<proc_macro2::TokenStream> = dependencies
        .iter()
        .filter(|dep| !dep.is_optional)
        .map(|dep| {
            let service_type = &dep.service_type;
            match &dep.name {
                Some(name) => quote! {
                    ::elif_container::CapabilityKey::named::<#service_type>(#name)
                },
                None => quote! {
                    ::elif_container::CapabilityKey::of::<#service_type>()
                },
            }
        })
        .collect();

    let field_initializers: Vec<proc_macro2::TokenStream> = dependencies
        .iter()
        .map(|dep| {
            let field_name = &dep.field_name;
            let service_type = &dep.service_type;

            match (&dep.name, dep.is_optional) {
                (None, false) => quote! {
                    #field_name: ctx.resolve::<#service_type>()?
                },
                (None, true) => quote! {
                    #field_name: ctx.try_resolve::<#service_type>()?
                },
                (Some(name), false) => quote! {
                    #field_name: ctx.resolve_named::<#service_type>(#name)?
                },
                (Some(name), true) => quote! {
                    #field_name: match ctx.resolve_named::<#service_type>(#name) {
                        Ok(service) => Some(service),
                        Err(::elif_container::ContainerError::UnresolvableBinding { ref key, .. })
                            if *key == ::elif_container::CapabilityKey::named::<#service_type>(#name) => None,
                        Err(err) => return Err(err),
                    }
                },
            }
        })
        .collect();

    quote! {
        impl #impl_generics ::elif_container::Injectable for #struct_name #ty_generics #where_clause {
            fn dependencies() -> ::std::vec::Vec<::elif_container::CapabilityKey> {
                ::std::vec![#(#required_keys),*]
            }

            fn create(
                ctx: &::elif_container::ResolutionContext<'_>,
            ) -> ::std::result::Result<Self, ::elif_container::ContainerError> {
                #[allow(unused_imports)]
                use ::elif_container::Resolver as _;

                ::std::result::Result::Ok(Self {
                    #(#field_initializers),*
                })
            }
        }
    }
}
