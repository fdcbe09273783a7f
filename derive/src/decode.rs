use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Error, Expr, ExprLit, Field, Fields, Ident, Lit, LitByteStr, LitInt,
    Result, Token, Type,
    parse::{Parse, ParseStream},
};

pub(crate) fn expand_decode(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new_spanned(
            input,
            "`Decode` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new_spanned(
            input,
            "`Decode` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .collect::<Result<Vec<_>>>()?;

    // A remainder is measured against a declared length, so one must precede it.
    let mut has_length = false;
    for field in &fields {
        match field.layout {
            Layout::Length if has_length => Err(Error::new_spanned(
                &field.name,
                "A record may only declare one length.",
            ))?,
            Layout::Length => has_length = true,
            Layout::Remaining if !has_length => Err(Error::new_spanned(
                &field.name,
                "`remaining` must follow a `length` field.",
            ))?,
            _ => {}
        }
    }

    let entries = fields.iter().map(|field| {
        let name = field.name.to_string();
        let name = name.trim_start_matches("r#");

        let kind = match &field.layout {
            Layout::Length => quote! { ::bufr::layout::Kind::Length },
            Layout::Bits {
                width,
                skip,
                offset,
            } => {
                let width = Literal::u32_unsuffixed(*width);
                let skip = Literal::u32_unsuffixed(*skip);
                let offset = Literal::u64_unsuffixed(*offset);
                quote! {
                    ::bufr::layout::Kind::Bits { width: #width, skip: #skip, offset: #offset }
                }
            }
            Layout::Magic(literal) => quote! { ::bufr::layout::Kind::Magic(#literal) },
            Layout::Remaining => quote! { ::bufr::layout::Kind::Remaining },
        };

        quote! { ::bufr::layout::Field { name: #name, kind: #kind } }
    });

    let locals = (0..fields.len())
        .map(|i| format_ident!("__bufr_field_{}", i))
        .collect::<Vec<_>>();

    let reads = locals.iter().enumerate().map(|(i, local)| {
        let i = Literal::usize_unsuffixed(i);
        quote! {
            let #local = frame.read(cursor, &Self::LAYOUT[#i])?;
        }
    });

    let names = fields.iter().map(|field| &field.name);

    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::bufr::layout::Decode for #name #ty_generics #where_clause {
            const NAME: &'static str = #name_str;
            const LAYOUT: &'static [::bufr::layout::Field] = &[#(#entries),*];

            fn decode<S: ::bufr::bits::Source>(
                cursor: &mut ::bufr::bits::BitCursor<S>,
            ) -> ::core::result::Result<Self, ::bufr::Error> {
                let mut frame = ::bufr::layout::Frame::new(Self::NAME, cursor);
                #(#reads)*
                ::core::result::Result::Ok(Self {
                    #(#names: #locals),*
                })
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    layout: Layout,
}

/// Name of the last path segment of a type, such as `Vec` in `alloc::vec::Vec<u8>`.
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Check that a field's type can hold values of its layout.
fn check_type(layout: &Layout, ty: &Type) -> Result<()> {
    let name = type_name(ty);

    let message = match layout {
        Layout::Length if !matches!(name.as_deref(), Some("u32" | "u64")) => {
            "A `length` field must be a `u32` or `u64`."
        }
        Layout::Bits { .. }
            if matches!(ty, Type::Array(_)) || name.as_deref() == Some("Vec") =>
        {
            "A `bits` field must be an integer or `bool`."
        }
        Layout::Magic(literal) => match ty {
            Type::Array(array) => match &array.len {
                Expr::Lit(ExprLit {
                    lit: Lit::Int(len), ..
                }) if len.base10_parse::<usize>()? != literal.value().len() => {
                    "A `magic` field must be as long as its literal."
                }
                _ => return Ok(()),
            },
            _ => "A `magic` field must be a `[u8; N]`.",
        },
        Layout::Remaining if name.as_deref() != Some("Vec") => {
            "A `remaining` field must be a `Vec`."
        }
        _ => return Ok(()),
    };

    Err(Error::new_spanned(ty, message))
}

#[derive(Debug)]
enum Layout {
    Length,
    Bits { width: u32, skip: u32, offset: u64 },
    Magic(LitByteStr),
    Remaining,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Self> {
        let name = field.ident.clone().unwrap();

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("bufr")) else {
            Err(Error::new_spanned(
                &name,
                "Every field must have a `bufr` attribute describing its layout.",
            ))?
        };

        let layout = attr.meta.require_list()?.parse_args()?;
        check_type(&layout, &field.ty)?;

        Ok(Self { name, layout })
    }
}

impl Parse for Layout {
    fn parse(input: ParseStream) -> Result<Self> {
        let ident = input.parse::<Ident>()?;

        let layout = if ident == "length" {
            Layout::Length
        } else if ident == "remaining" {
            Layout::Remaining
        } else if ident == "magic" {
            input.parse::<Token![=]>()?;
            Layout::Magic(input.parse::<LitByteStr>()?)
        } else if ident == "bits" {
            input.parse::<Token![=]>()?;
            let width = input.parse::<LitInt>()?;
            let width_value = width.base10_parse::<u32>()?;

            if !(1..=64).contains(&width_value) {
                Err(Error::new_spanned(
                    width,
                    "Field width must be between 1 and 64 bits.",
                ))?
            }

            let (mut skip, mut offset) = (0, 0);

            while !input.is_empty() {
                input.parse::<Token![,]>()?;
                let option = input.parse::<Ident>()?;
                input.parse::<Token![=]>()?;
                let value = input.parse::<LitInt>()?;

                if option == "skip" {
                    skip = value.base10_parse()?;
                } else if option == "offset" {
                    offset = value.base10_parse()?;
                } else {
                    Err(Error::new_spanned(
                        option,
                        "Expected `skip` or `offset`.",
                    ))?
                }
            }

            Layout::Bits {
                width: width_value,
                skip,
                offset,
            }
        } else {
            Err(Error::new_spanned(
                ident,
                "Field layout must be `length`, `bits = N`, `magic = b\"...\"` or `remaining`.",
            ))?
        };

        if !input.is_empty() {
            Err(input.error("Unexpected tokens after field layout."))?
        }

        Ok(layout)
    }
}
