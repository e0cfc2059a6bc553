//! Procedural macros for the collector API
//!
//! - `#[derive(TableEntity)]` - Generate the table name and field definitions
//!   the query engine uses to build property maps and table schemas.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DataStruct, DeriveInput, Error, Fields, GenericArgument, LitStr,
    PathArguments, Type,
};

/// Derive `crate::query::TableEntity` for a struct with named fields.
///
/// # Usage
///
/// ```ignore
/// #[derive(TableEntity)]
/// #[table(name = "tags")]
/// pub struct Tag {
///     #[column(primary_key)]
///     pub id: i64,
///     #[column(unique)]
///     pub tag_name: String,
///     pub tag_data: Option<String>,
///     #[column(skip)]
///     pub secret: String,
/// }
/// ```
///
/// # Generated Code
///
/// ```ignore
/// impl crate::query::TableEntity for Tag {
///     const TABLE_NAME: &'static str = "tags";
///     fn fields() -> &'static [crate::query::FieldDef] {
///         const FIELDS: &[crate::query::FieldDef] = &[
///             crate::query::FieldDef { name: "id", property: Some("id"), sql_type: "INTEGER", .. },
///             ..
///         ];
///         FIELDS
///     }
/// }
/// ```
///
/// Field attributes:
/// - `primary_key`: `INTEGER PRIMARY KEY` (rowid alias)
/// - `unique`: adds a `UNIQUE` constraint
/// - `skip`: column is stored but not exposed as a property
/// - `property = "..."`: external property name when it differs from the field name
/// - `sql_type = "..."`: override the inferred SQLite type
#[proc_macro_derive(TableEntity, attributes(table, column))]
pub fn derive_table_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_table_entity(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_table_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;

    let mut table_name: Option<String> = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("table") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                table_name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported table attribute"))
            }
        })?;
    }
    let table_name = table_name
        .ok_or_else(|| Error::new_spanned(ident, "missing #[table(name = \"...\")]"))?;

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(named),
            ..
        }) => &named.named,
        _ => {
            return Err(Error::new_spanned(
                ident,
                "TableEntity can only be derived for structs with named fields",
            ))
        }
    };

    let mut defs = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let name = field_ident.to_string();
        let mut property = Some(name.clone());
        let mut primary_key = false;
        let mut unique = false;
        let mut sql_type_override: Option<String> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("column") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    primary_key = true;
                } else if meta.path.is_ident("unique") {
                    unique = true;
                } else if meta.path.is_ident("skip") {
                    property = None;
                } else if meta.path.is_ident("property") {
                    let lit: LitStr = meta.value()?.parse()?;
                    property = Some(lit.value());
                } else if meta.path.is_ident("sql_type") {
                    let lit: LitStr = meta.value()?.parse()?;
                    sql_type_override = Some(lit.value());
                } else {
                    return Err(meta.error("unsupported column attribute"));
                }
                Ok(())
            })?;
        }

        let (inferred, nullable) = infer_sql_type(&field.ty);
        let sql_type = sql_type_override.unwrap_or_else(|| inferred.to_string());
        let property = match property {
            Some(p) => quote! { Some(#p) },
            None => quote! { None },
        };

        defs.push(quote! {
            crate::query::FieldDef {
                name: #name,
                property: #property,
                sql_type: #sql_type,
                nullable: #nullable,
                primary_key: #primary_key,
                unique: #unique,
            }
        });
    }

    Ok(quote! {
        impl crate::query::TableEntity for #ident {
            const TABLE_NAME: &'static str = #table_name;

            fn fields() -> &'static [crate::query::FieldDef] {
                const FIELDS: &[crate::query::FieldDef] = &[#(#defs),*];
                FIELDS
            }
        }
    })
}

/// Map a Rust field type to a SQLite column type. `Option<T>` is nullable.
fn infer_sql_type(ty: &Type) -> (&'static str, bool) {
    let Type::Path(path) = ty else {
        return ("TEXT", false);
    };
    let Some(segment) = path.path.segments.last() else {
        return ("TEXT", false);
    };

    if segment.ident == "Option" {
        if let PathArguments::AngleBracketed(args) = &segment.arguments {
            if let Some(GenericArgument::Type(inner)) = args.args.first() {
                return (infer_sql_type(inner).0, true);
            }
        }
        return ("TEXT", true);
    }

    let sql_type = match segment.ident.to_string().as_str() {
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "isize" | "usize" => "INTEGER",
        "bool" => "BOOLEAN",
        "f32" | "f64" => "REAL",
        "Vec" => "BLOB",
        _ => "TEXT",
    };
    (sql_type, false)
}
