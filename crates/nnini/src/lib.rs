//! INI topology documents: parser and normalizing serializer.
pub mod ast;
pub mod parser;
pub mod serializer;

pub use ast::{IniDocument, IniSection};
pub use parser::{parse_ini, IniError};
pub use serializer::serialize_ini;
