use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, ExprUnary, Fields, Ident, Lit, LitStr, Type,
    UnOp, parse_macro_input, spanned::Spanned,
};

/* ────────────────────────── #[derive(SheetRow)] ───────────────────── */
#[proc_macro_derive(SheetRow, attributes(sheet))]
pub fn derive_sheet_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_sheet_row(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/* ────────────────────────── #[derive(SheetEnum)] ──────────────────── */
#[proc_macro_derive(SheetEnum)]
pub fn derive_sheet_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_sheet_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct FieldAttrs {
    display: Option<LitStr>,
    expand: bool,
    sheet_name: bool,
    skip: bool,
}

fn container_sheet_name(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("sheet")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("sheet")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("display") {
                out.display = Some(meta.value()?.parse::<LitStr>()?);
            } else if meta.path.is_ident("expand") {
                out.expand = true;
            } else if meta.path.is_ident("sheet_name") {
                out.sheet_name = true;
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else {
                return Err(meta.error(
                    "expected one of `display = \"...\"`, `expand`, `sheet_name`, `skip`",
                ));
            }
            Ok(())
        })?;
    }
    let roles = [out.expand, out.sheet_name, out.skip]
        .iter()
        .filter(|b| **b)
        .count();
    if roles > 1 {
        return Err(syn::Error::new(
            attrs[0].span(),
            "`expand`, `sheet_name` and `skip` are mutually exclusive",
        ));
    }
    Ok(out)
}

fn expand_sheet_row(input: &DeriveInput) -> syn::Result<TokenStream2> {
    /* -------- 1 · shape checks -------- */
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "SheetRow cannot be derived for generic types",
        ));
    }
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "SheetRow requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "SheetRow can only be derived for structs",
            ));
        }
    };

    let ident = &input.ident;
    let fixed_name = container_sheet_name(&input.attrs)?;

    /* -------- 2 · walk declared fields -------- */
    let mut defs = Vec::new();
    let mut reads = Vec::new();
    let mut writes = Vec::new();
    let mut inserts = Vec::new();
    let mut sheet_field: Option<&Ident> = None;

    for field in fields {
        let attrs = field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(name) = field.ident.as_ref() else {
            continue;
        };
        let ty: &Type = &field.ty;
        let index = defs.len();
        let name_str = name.to_string();
        let display = attrs.display.as_ref().map(|d| quote! { .display(#d) });

        if attrs.sheet_name {
            if sheet_field.is_some() {
                return Err(syn::Error::new(
                    name.span(),
                    "only one field may carry `sheet_name`",
                ));
            }
            sheet_field = Some(name);
            defs.push(quote! {
                ::sheetbind::FieldDef::new(#name_str, ::sheetbind::FieldKind::Text)
                    .sheet_name()
            });
        } else if attrs.expand {
            defs.push(quote! {
                ::sheetbind::FieldDef::new(#name_str, ::sheetbind::FieldKind::Mapping)
                    #display
                    .expand()
            });
            reads.push(quote! {
                #index => ::sheetbind::FieldValue::Columns(
                    ::sheetbind::ExpandColumns::to_columns(&self.#name)
                ),
            });
            inserts.push(quote! {
                #index => {
                    ::sheetbind::ExpandColumns::insert_column(&mut self.#name, __key, __value);
                    Ok(())
                }
            });
        } else {
            defs.push(quote! {
                ::sheetbind::FieldDef::new(
                    #name_str,
                    <#ty as ::sheetbind::CellField>::KIND,
                )
                #display
                .optional(<#ty as ::sheetbind::CellField>::OPTIONAL)
            });
            reads.push(quote! {
                #index => ::sheetbind::FieldValue::Scalar(
                    <#ty as ::sheetbind::CellField>::to_cell(&self.#name)
                ),
            });
            writes.push(quote! {
                #index => {
                    self.#name = <#ty as ::sheetbind::CellField>::from_cell(__value, __locale)?;
                    Ok(())
                }
            });
        }
    }

    /* -------- 3 · sheet-name capability -------- */
    let record_impl = match (&fixed_name, sheet_field) {
        (Some(_), Some(field)) => {
            return Err(syn::Error::new(
                field.span(),
                "`sheet_name` field conflicts with `#[sheet(name = ...)]`",
            ));
        }
        (Some(lit), None) => Some(quote! {
            impl ::sheetbind::SheetRecord for #ident {
                fn sheet_name(&self) -> ::std::borrow::Cow<'_, str> {
                    ::std::borrow::Cow::Borrowed(#lit)
                }
            }
        }),
        (None, Some(field)) => Some(quote! {
            impl ::sheetbind::SheetRecord for #ident {
                fn sheet_name(&self) -> ::std::borrow::Cow<'_, str> {
                    ::std::borrow::Cow::Borrowed(::std::convert::AsRef::<str>::as_ref(&self.#field))
                }
            }
        }),
        (None, None) => None,
    };

    /* -------- 4 · assemble -------- */
    Ok(quote! {
        impl ::sheetbind::SheetRow for #ident {
            fn fields() -> &'static [::sheetbind::FieldDef]
            where
                Self: Sized,
            {
                const FIELDS: &[::sheetbind::FieldDef] = &[ #(#defs),* ];
                FIELDS
            }

            fn field_defs(&self) -> &'static [::sheetbind::FieldDef] {
                <Self as ::sheetbind::SheetRow>::fields()
            }

            fn type_key(&self) -> ::std::any::TypeId {
                ::std::any::TypeId::of::<Self>()
            }

            fn read_field(&self, __index: usize) -> ::sheetbind::FieldValue {
                match __index {
                    #(#reads)*
                    _ => ::sheetbind::FieldValue::Scalar(::sheetbind::CellValue::Empty),
                }
            }

            fn write_field(
                &mut self,
                __index: usize,
                __value: ::sheetbind::CellValue,
                __locale: &::sheetbind::NumberLocale,
            ) -> ::std::result::Result<(), ::sheetbind::ConversionError> {
                match __index {
                    #(#writes)*
                    _ => {
                        let _ = (__value, __locale);
                        Err(::sheetbind::ConversionError::UnknownField(__index))
                    }
                }
            }

            fn insert_column(
                &mut self,
                __index: usize,
                __key: ::std::string::String,
                __value: ::std::string::String,
            ) -> ::std::result::Result<(), ::sheetbind::ConversionError> {
                match __index {
                    #(#inserts)*
                    _ => {
                        let _ = (__key, __value);
                        Err(::sheetbind::ConversionError::UnknownField(__index))
                    }
                }
            }
        }

        #record_impl
    })
}

fn discriminant_value(expr: &Expr) -> syn::Result<i64> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(int), ..
        }) => int.base10_parse::<i64>(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => discriminant_value(expr).map(|v| -v),
        Expr::Group(group) => discriminant_value(&group.expr),
        Expr::Paren(paren) => discriminant_value(&paren.expr),
        other => Err(syn::Error::new(
            other.span(),
            "SheetEnum supports integer literal discriminants only",
        )),
    }
}

fn expand_sheet_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "SheetEnum cannot be derived for generic types",
        ));
    }
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new(
            input.ident.span(),
            "SheetEnum can only be derived for enums",
        ));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new(
            input.ident.span(),
            "SheetEnum requires at least one variant",
        ));
    }

    let ident = &input.ident;
    let type_name = ident.to_string();
    let mut to_text = Vec::new();
    let mut by_name = Vec::new();
    let mut by_number = Vec::new();
    let mut next: i64 = 0;

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "SheetEnum variants cannot carry data",
            ));
        }
        let v = &variant.ident;
        let text = v.to_string();
        let number = match &variant.discriminant {
            Some((_, expr)) => discriminant_value(expr)?,
            None => next,
        };
        next = number.wrapping_add(1);

        to_text.push(quote! { #ident::#v => #text, });
        by_name.push(quote! { #text => return Ok(#ident::#v), });
        by_number.push(quote! { #number => return Ok(#ident::#v), });
    }

    Ok(quote! {
        impl ::sheetbind::CellField for #ident {
            const KIND: ::sheetbind::FieldKind = ::sheetbind::FieldKind::Enum;

            fn to_cell(&self) -> ::sheetbind::CellValue {
                let text = match self {
                    #(#to_text)*
                };
                ::sheetbind::CellValue::Text(::std::string::String::from(text))
            }

            fn from_cell(
                value: ::sheetbind::CellValue,
                _locale: &::sheetbind::NumberLocale,
            ) -> ::std::result::Result<Self, ::sheetbind::ConversionError> {
                let text = value.into_text();
                let key = text.trim();
                match key {
                    #(#by_name)*
                    _ => {}
                }
                if let Ok(n) = key.parse::<i64>() {
                    match n {
                        #(#by_number)*
                        _ => {}
                    }
                }
                Err(::sheetbind::ConversionError::unknown_variant(#type_name, text))
            }
        }
    })
}
