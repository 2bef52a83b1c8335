use crate::ast::{IniDocument, IniSection};
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "ini.pest"]
struct IniGrammar;

#[derive(Debug, Error, PartialEq)]
pub enum IniError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("line {line}: property '{key}' appears before any section")]
    OrphanProperty { line: usize, key: String },
    #[error("line {line}: duplicate section [{name}]")]
    DuplicateSection { line: usize, name: String },
    #[error("line {line}: empty section name")]
    EmptySectionName { line: usize },
}

/// Parse an INI document. Keys are lower-cased, names and values trimmed.
pub fn parse_ini(input: &str) -> Result<IniDocument, IniError> {
    let file = IniGrammar::parse(Rule::file, input)
        .map_err(syntax_error)?
        .next()
        .ok_or(IniError::Syntax {
            line: 1,
            column: 1,
            message: "empty parse".to_string(),
        })?;

    let mut doc = IniDocument::default();
    for pair in file.into_inner() {
        let line = pair.as_span().start_pos().line_col().0;
        match pair.as_rule() {
            Rule::section => {
                let name = inner_str(pair).trim().to_string();
                if name.is_empty() {
                    return Err(IniError::EmptySectionName { line });
                }
                if doc.section(&name).is_some() {
                    return Err(IniError::DuplicateSection { line, name });
                }
                doc.sections.push(IniSection::new(name, line));
            }
            Rule::property => {
                let mut parts = pair.into_inner();
                let key = parts.next().map(|p| p.as_str().trim()).unwrap_or_default();
                let value = parts.next().map(|p| p.as_str().trim()).unwrap_or_default();
                match doc.sections.last_mut() {
                    Some(section) => section.set(key, value),
                    None => {
                        return Err(IniError::OrphanProperty {
                            line,
                            key: key.to_string(),
                        })
                    }
                }
            }
            _ => {}
        }
    }

    Ok(doc)
}

fn inner_str(pair: Pair<'_, Rule>) -> &str {
    pair.into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default()
}

fn syntax_error(err: pest::error::Error<Rule>) -> IniError {
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    IniError::Syntax {
        line,
        column,
        message: err.variant.message().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_and_properties() {
        let doc = parse_ini(
            "# model\n[Model]\nType = NeuralNetwork\nBatch_Size=32 ; trailing\n\n[fc1]\n  Unit = 10\n",
        )
        .unwrap();

        assert_eq!(doc.sections.len(), 2);
        let model = doc.section("model").unwrap();
        assert_eq!(model.line, 2);
        assert_eq!(model.get("type"), Some("NeuralNetwork"));
        assert_eq!(model.get("BATCH_SIZE"), Some("32"));
        assert_eq!(doc.section("FC1").unwrap().get("unit"), Some("10"));
    }

    #[test]
    fn test_crlf_and_empty_values() {
        let doc = parse_ini("[a]\r\nx =\r\ny = 1:2:3\r\n").unwrap();
        let a = doc.section("a").unwrap();
        assert_eq!(a.get("x"), Some(""));
        assert_eq!(a.get("y"), Some("1:2:3"));
    }

    #[test]
    fn test_last_assignment_wins() {
        let doc = parse_ini("[a]\nunit = 1\nUNIT = 2\n").unwrap();
        let a = doc.section("a").unwrap();
        assert_eq!(a.properties, vec![("unit".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_ini("").unwrap(), IniDocument::default());
        assert_eq!(parse_ini("\n; only a comment\n").unwrap().sections.len(), 0);
    }

    #[test]
    fn test_orphan_property() {
        let err = parse_ini("unit = 3\n[a]\n").unwrap_err();
        assert_eq!(
            err,
            IniError::OrphanProperty {
                line: 1,
                key: "unit".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_section() {
        let err = parse_ini("[fc]\n[FC]\n").unwrap_err();
        assert!(matches!(err, IniError::DuplicateSection { line: 2, .. }));
    }

    #[test]
    fn test_syntax_errors_carry_position() {
        let err = parse_ini("[a]\nthis line has no equals\n").unwrap_err();
        match err {
            IniError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            parse_ini("[unterminated\n").unwrap_err(),
            IniError::Syntax { line: 1, .. }
        ));
        assert!(!parse_ini("[a]\nbad\n").unwrap_err().to_string().contains('\n'));
    }
}
