/// Errors raised while decoding an ABI or compiling it into validation rules.
///
/// These are construction errors: they abort the whole ABI, never a single
/// field. A well-formed ABI from the engine never produces one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The descriptor carries a type tag outside the known grammar.
    #[error("unrecognized component type '{tag}'")]
    UnrecognizedType { tag: String },

    /// A descriptor node is missing a key or has one of the wrong shape.
    #[error("malformed ABI at {path}: {message}")]
    MalformedAbi { path: String, message: String },

    /// Two members of one struct share a name.
    #[error("duplicate member '{member}' in struct at {path}")]
    DuplicateMember { path: String, member: String },

    /// Two top-level inputs share a name.
    #[error("duplicate input '{name}'")]
    DuplicateInput { name: String },

    /// The generated schema was refused by the schema compiler.
    #[error("failed to compile validation schema: {message}")]
    Compile { message: String },
}
