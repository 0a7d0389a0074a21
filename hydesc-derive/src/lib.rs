use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, ImplItem, ItemImpl, Lit, LitStr, Meta,
    MetaNameValue, Visibility, ext::IdentExt, parse_macro_input,
};

#[derive(Default)]
struct TypeOptions {
    name: Option<LitStr>,
    operations: bool,
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    flatten: bool,
    rename: Option<LitStr>,
}

fn parse_type_options(attrs: &[Attribute]) -> syn::Result<TypeOptions> {
    let mut options = TypeOptions::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("describe")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("operations") {
                options.operations = true;
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"` or `operations`"))
            }
        })?;
    }
    Ok(options)
}

fn parse_field_options(attrs: &[Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("describe")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else if meta.path.is_ident("flatten") {
                options.flatten = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                options.rename = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `skip`, `flatten` or `rename = \"...\"`"))
            }
        })?;
    }
    Ok(options)
}

/// Join the `#[doc = "..."]` attributes (i.e. `///` lines) with newlines.
fn collect_doc(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(MetaNameValue {
                value:
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(line),
                        ..
                    }),
                ..
            }) => Some(line.value()),
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Derive `hydesc::Describable`: emits the static field table of a struct and
/// submits the type to the registration inventory.
///
/// Supported attributes:
///  - on the type: `#[describe(name = "canonical::Name")]`, `#[describe(operations)]`
///  - on fields: `#[describe(skip)]`, `#[describe(flatten)]`, `#[describe(rename = "x")]`
#[proc_macro_derive(Describe, attributes(describe))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_describe(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_describe(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Describe cannot be derived for generic types",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(data) => {
            return Err(syn::Error::new_spanned(
                data.enum_token,
                "Describe can only be derived for structs",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "Describe can only be derived for structs",
            ));
        }
    };

    let options = parse_type_options(&input.attrs)?;
    let ident = &input.ident;

    let type_name = match &options.name {
        Some(name) if name.value().is_empty() => {
            return Err(syn::Error::new_spanned(name, "type name cannot be empty"));
        }
        Some(name) => quote!(#name),
        None => {
            let ident_str = ident.unraw().to_string();
            quote!(concat!(module_path!(), "::", #ident_str))
        }
    };

    let mut field_schemas = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let field_options = parse_field_options(&field.attrs)?;
        if field_options.skip {
            continue;
        }

        let ty = &field.ty;
        let kind = if field_options.flatten {
            quote!(::hydesc::schema::FieldKind::Flatten(
                <#ty as ::hydesc::Describable>::schema
            ))
        } else {
            quote!(::hydesc::schema::FieldKind::Plain)
        };

        // Tuple fields are named after their position
        let name = match (&field_options.rename, &field.ident) {
            (Some(rename), _) => rename.value(),
            (None, Some(field_ident)) => field_ident.unraw().to_string(),
            (None, None) => index.to_string(),
        };
        let doc = match collect_doc(&field.attrs) {
            Some(doc) => quote!(::core::option::Option::Some(#doc)),
            None => quote!(::core::option::Option::None),
        };

        field_schemas.push(quote! {
            ::hydesc::schema::FieldSchema {
                name: #name,
                doc: #doc,
                kind: #kind,
            }
        });
    }

    let operations = if options.operations {
        quote!(<#ident as ::hydesc::DescribeOperations>::OPERATIONS)
    } else {
        quote!(&[])
    };

    Ok(quote! {
        impl ::hydesc::Describable for #ident {
            const TYPE_NAME: &'static str = #type_name;

            fn schema() -> &'static ::hydesc::schema::TypeSchema {
                static SCHEMA: ::hydesc::schema::TypeSchema = ::hydesc::schema::TypeSchema {
                    name: <#ident as ::hydesc::Describable>::TYPE_NAME,
                    fields: &[#(#field_schemas),*],
                    operations: #operations,
                };
                &SCHEMA
            }
        }

        ::hydesc::inventory::submit! {
            ::hydesc::registry::TypeRegistration::of::<#ident>()
        }
    })
}

/// Emit `hydesc::DescribeOperations` for the self type of an inherent `impl`
/// block, listing every method with its visibility. Only plain `pub` counts as
/// public. Methods marked `#[describe(skip)]` are left out.
#[proc_macro_attribute]
pub fn describe_operations(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[describe_operations] takes no arguments",
        )
        .into_compile_error()
        .into();
    }

    let item = parse_macro_input!(input as ItemImpl);
    expand_operations(item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_operations(mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[describe_operations] expects an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[describe_operations] does not support generic impl blocks",
        ));
    }

    let mut operations = Vec::new();
    for impl_item in item.items.iter_mut() {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };

        // Strip our attribute, the compiler does not know about it on methods
        let mut skip = false;
        let mut error = None;
        method.attrs.retain(|attr| {
            if !attr.path().is_ident("describe") {
                return true;
            }
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `skip`"))
                }
            });
            if let Err(err) = parsed {
                error = Some(err);
            }
            false
        });
        if let Some(err) = error {
            return Err(err);
        }
        if skip {
            continue;
        }

        let name = method.sig.ident.unraw().to_string();
        let public = matches!(method.vis, Visibility::Public(_));
        operations.push(quote! {
            ::hydesc::schema::OperationSchema {
                name: #name,
                public: #public,
            }
        });
    }

    let self_ty = &item.self_ty;
    Ok(quote! {
        #item

        impl ::hydesc::DescribeOperations for #self_ty {
            const OPERATIONS: &'static [::hydesc::schema::OperationSchema] = &[#(#operations),*];
        }
    })
}
