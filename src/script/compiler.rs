//! Extraction-script compiler
//!
//! Line-oriented recursive-descent parsing of the script grammar:
//!
//! - `# ...` comment, skipped
//! - blank line: end of the current scope (end of script at top level)
//! - `Sha256 {` / `Cut_bit {` / `Cut_byte {` opens a function block
//! - `}` alone closes the innermost open block
//! - `>field` declares a getter
//! - any other non-empty line is a value literal, verbatim
//!
//! One top-level expression is produced; anything non-empty after it is
//! trailing code. Line numbers in errors are 1-based.

use crate::script::tree::{ExecutableTree, FunctionKind, Node};
use crate::{ApWatchError, Result};

/// Compiles one script text into an [`ExecutableTree`].
#[derive(Debug)]
pub struct Compiler {
    lines: Vec<String>,
}

/// What one parsing step produced.
enum Parsed {
    /// A complete expression.
    Node(Node),
    /// A `}` line, with its 0-based line number.
    Close(usize),
    /// Blank line or end of input.
    End,
}

impl Compiler {
    /// Create a compiler over the given script source.
    pub fn new(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
        }
    }

    /// Compile the script.
    pub fn compile(&self) -> Result<ExecutableTree> {
        let mut tree = ExecutableTree::new();
        let mut cursor = 0usize;

        match self.parse_expression(&mut cursor)? {
            Parsed::Node(node) => tree.set_root(node)?,
            Parsed::Close(line) => {
                return Err(ApWatchError::UnmatchedClose { line: line + 1 });
            }
            // An empty script compiles to an empty tree; evaluation reports it.
            Parsed::End => {}
        }

        // Exactly one top-level expression is allowed.
        while cursor < self.lines.len() {
            let line = &self.lines[cursor];
            if !line.is_empty() {
                return Err(ApWatchError::TrailingCode {
                    line: cursor + 1,
                    text: line.clone(),
                });
            }
            cursor += 1;
        }

        Ok(tree)
    }

    /// Parse one complete expression starting at `cursor`, consuming the
    /// lines it covers. Comments before the expression are skipped.
    fn parse_expression(&self, cursor: &mut usize) -> Result<Parsed> {
        while *cursor < self.lines.len() {
            let line_number = *cursor;
            let line = self.lines[line_number].as_str();

            if line.is_empty() {
                return Ok(Parsed::End);
            }

            if line.starts_with('#') {
                *cursor += 1;
                continue;
            }

            if line == "}" {
                *cursor += 1;
                return Ok(Parsed::Close(line_number));
            }

            if line.ends_with('{') {
                *cursor += 1;
                return self.parse_function(line, line_number, cursor);
            }

            if let Some(field) = line.strip_prefix('>') {
                *cursor += 1;
                return Ok(Parsed::Node(Node::Getter {
                    field: field.to_string(),
                }));
            }

            *cursor += 1;
            return Ok(Parsed::Node(Node::Value(line.to_string())));
        }

        Ok(Parsed::End)
    }

    /// Parse the children of a just-opened function block up to its `}`.
    fn parse_function(
        &self,
        open_line: &str,
        line_number: usize,
        cursor: &mut usize,
    ) -> Result<Parsed> {
        let kind = match open_line {
            "Sha256 {" => FunctionKind::Sha256,
            "Cut_bit {" => FunctionKind::CutBit,
            "Cut_byte {" => FunctionKind::CutByte,
            other => {
                return Err(ApWatchError::UnknownFunction {
                    name: other.trim_end_matches('{').trim_end().to_string(),
                    line: line_number + 1,
                });
            }
        };

        let mut args = Vec::new();
        loop {
            match self.parse_expression(cursor)? {
                Parsed::Node(node) => args.push(node),
                Parsed::Close(_) => return Ok(Parsed::Node(Node::Function { kind, args })),
                Parsed::End => return Err(ApWatchError::UnterminatedFunction),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::beacon_frame;
    use crate::frame::Frame;
    use sha2::{Digest, Sha256};

    fn compile(source: &str) -> Result<ExecutableTree> {
        Compiler::new(source).compile()
    }

    fn home_frame() -> Frame {
        let mut frame = Frame::new();
        frame.set_raw_data(beacon_frame(&[(0, b"Home")]));
        frame.decode().unwrap();
        frame
    }

    #[test]
    fn test_single_value_literal() {
        let tree = compile("just a literal\n").unwrap();
        assert_eq!(
            tree.root(),
            Some(&Node::Value("just a literal".to_string()))
        );
    }

    #[test]
    fn test_getter_line() {
        let tree = compile(">bssid\n").unwrap();
        assert_eq!(
            tree.root(),
            Some(&Node::Getter {
                field: "bssid".to_string()
            })
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tree = compile("# leading comment\n>bssid\n").unwrap();
        assert_eq!(
            tree.root(),
            Some(&Node::Getter {
                field: "bssid".to_string()
            })
        );
    }

    #[test]
    fn test_sha256_over_ssid_end_to_end() {
        let tree = compile("Sha256 {\n>ssid\n}\n").unwrap();
        let frame = home_frame();

        let mut hasher = Sha256::new();
        hasher.update(b"Home");
        assert_eq!(
            tree.evaluate(&frame).unwrap(),
            hex::encode(hasher.finalize())
        );
    }

    #[test]
    fn test_cut_byte_end_to_end() {
        let tree = compile("Cut_byte {\nAABBCCDD\n1\n2\n}\n").unwrap();
        let frame = home_frame();
        assert_eq!(tree.evaluate(&frame).unwrap(), "BBCC");
    }

    #[test]
    fn test_nested_functions() {
        let source = "Sha256 {\nCut_byte {\nAABBCCDD\n1\n2\n}\n>ssid\n}\n";
        let tree = compile(source).unwrap();
        let frame = home_frame();

        let mut hasher = Sha256::new();
        hasher.update(b"BBCCHome");
        assert_eq!(
            tree.evaluate(&frame).unwrap(),
            hex::encode(hasher.finalize())
        );
    }

    #[test]
    fn test_comments_inside_function_blocks() {
        let source = "Sha256 {\n# salt below\nsalt\n}\n";
        let tree = compile(source).unwrap();
        assert_eq!(
            tree.root(),
            Some(&Node::Function {
                kind: FunctionKind::Sha256,
                args: vec![Node::Value("salt".to_string())],
            })
        );
    }

    #[test]
    fn test_empty_function_block_parses() {
        let tree = compile("Sha256 {\n}\n").unwrap();
        assert_eq!(
            tree.root(),
            Some(&Node::Function {
                kind: FunctionKind::Sha256,
                args: vec![],
            })
        );
    }

    #[test]
    fn test_unknown_function_fails() {
        assert!(matches!(
            compile("Md5 {\nx\n}\n"),
            Err(ApWatchError::UnknownFunction { line: 1, .. })
        ));
    }

    #[test]
    fn test_unmatched_close_names_line() {
        assert!(matches!(
            compile("# comment\n}\n"),
            Err(ApWatchError::UnmatchedClose { line: 2 })
        ));
    }

    #[test]
    fn test_unterminated_function_fails() {
        assert!(matches!(
            compile("Sha256 {\n>ssid\n"),
            Err(ApWatchError::UnterminatedFunction)
        ));
        // A blank line ends the scope before the brace is closed.
        assert!(matches!(
            compile("Sha256 {\n>ssid\n\n}\n"),
            Err(ApWatchError::UnterminatedFunction)
        ));
    }

    #[test]
    fn test_trailing_code_fails() {
        assert!(matches!(
            compile(">ssid\nleftover\n"),
            Err(ApWatchError::TrailingCode { line: 2, .. })
        ));
        // Blank separation does not make trailing code legal.
        assert!(matches!(
            compile(">ssid\n\n\nleftover\n"),
            Err(ApWatchError::TrailingCode { line: 4, .. })
        ));
    }

    #[test]
    fn test_empty_script_compiles_to_empty_tree() {
        let tree = compile("").unwrap();
        assert!(tree.root().is_none());

        let tree = compile("\n\n").unwrap();
        assert!(tree.root().is_none());
    }

    #[test]
    fn test_getter_field_keeps_rest_of_line_verbatim() {
        let tree = compile(">capabilities_information\n").unwrap();
        assert_eq!(
            tree.root(),
            Some(&Node::Getter {
                field: "capabilities_information".to_string()
            })
        );
    }
}
