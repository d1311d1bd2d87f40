use snow_common::Width;

/// Maps a source-language type name to its IR `Width`. Unknown names
/// (struct/array/user types) default to `Width::Ref`, matching the data
/// model's treatment of everything that isn't a scalar as a reference-typed
/// slot.
pub fn width_of_type_name(name: &str) -> Width {
    match name {
        "i8" | "byte" => Width::B8,
        "i16" | "short" => Width::S16,
        "i32" | "int" => Width::I32,
        "i64" | "long" => Width::L64,
        "f32" | "float" => Width::F32,
        "f64" | "double" => Width::D64,
        "bool" | "boolean" => Width::Bool,
        "string" | "str" => Width::Str,
        _ => Width::Ref,
    }
}

/// The inverse of `width_of_type_name`, used to annotate registers that
/// hold a computed value (constants, binary/unary results) rather than a
/// declared local.
pub fn type_name_of_width(width: Width) -> String {
    match width {
        Width::B8 => "i8",
        Width::S16 => "i16",
        Width::I32 => "i32",
        Width::L64 => "i64",
        Width::F32 => "f32",
        Width::D64 => "f64",
        Width::Bool => "bool",
        Width::Str => "string",
        Width::Ref | Width::List => "Ref",
    }
    .to_string()
}
