use crate::ast::IniDocument;

/// Render a document in normalized form: one blank line between sections,
/// `key = value` with lower-cased keys, no comments.
pub fn serialize_ini(doc: &IniDocument) -> String {
    let mut out = String::new();

    for (i, section) in doc.sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push('[');
        out.push_str(&section.name);
        out.push_str("]\n");

        for (k, v) in &section.properties {
            out.push_str(k);
            out.push_str(" = ");
            out.push_str(v);
            out.push('\n');
        }
    }

    out
}
