//! Executable expression tree
//!
//! The compiled form of an extraction script: a tree of value literals,
//! frame-field getters, and functions over their children. Evaluation walks
//! the tree against one decoded frame and produces the fingerprint string.

use sha2::{Digest, Sha256};

use crate::frame::Frame;
use crate::number::BigNumber;
use crate::{ApWatchError, Result};

/// Function variants a script can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// SHA-256 over the concatenated child results.
    Sha256,
    /// Bit-range extraction: (hex value, offset, length).
    CutBit,
    /// Byte-range extraction: (hex value, offset, length).
    CutByte,
}

impl FunctionKind {
    /// Script-facing spelling, as it appears before the opening brace.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "Sha256",
            Self::CutBit => "Cut_bit",
            Self::CutByte => "Cut_byte",
        }
    }
}

/// One node of the executable tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A constant line of script text.
    Value(String),
    /// A frame-field lookup resolved at evaluation time.
    Getter { field: String },
    /// A function applied to its child results, in declared order.
    Function { kind: FunctionKind, args: Vec<Node> },
}

impl Node {
    /// Evaluate this node against a decoded frame.
    pub fn evaluate(&self, frame: &Frame) -> Result<String> {
        if !frame.is_decoded() {
            return Err(ApWatchError::FrameNotDecoded);
        }

        match self {
            Self::Value(literal) => Ok(literal.clone()),
            Self::Getter { field } => evaluate_getter(frame, field),
            Self::Function { kind, args } => match kind {
                FunctionKind::Sha256 => evaluate_sha256(frame, args),
                FunctionKind::CutBit => evaluate_cut(frame, args, FunctionKind::CutBit),
                FunctionKind::CutByte => evaluate_cut(frame, args, FunctionKind::CutByte),
            },
        }
    }

    /// Render the node, indented by depth, for diagnostics.
    pub fn render(&self, depth: usize) -> String {
        let indent = "-".repeat(depth);

        match self {
            Self::Value(literal) => format!("{}{}\n", indent, literal),
            Self::Getter { field } => format!("{}get -> {}\n", indent, field),
            Self::Function { kind, args } => {
                let mut output = format!("{}{}()\n", indent, kind.name());
                for arg in args {
                    output.push_str(&arg.render(depth + 1));
                }
                output
            }
        }
    }
}

/// A getter resolves its field against the frame and renders hex; a miss is
/// the empty string. The `"ssid"` field is text by convention.
fn evaluate_getter(frame: &Frame, field: &str) -> Result<String> {
    let value = frame.get_value(field)?;

    if value.is_null() {
        return Ok(String::new());
    }

    if field == "ssid" {
        value.to_text_string()
    } else {
        value.to_hex_string()
    }
}

fn evaluate_sha256(frame: &Frame, args: &[Node]) -> Result<String> {
    let mut data = String::new();
    for arg in args {
        data.push_str(&arg.evaluate(frame)?);
    }

    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Shared Cut_bit / Cut_byte evaluation: exactly three children, positionally
/// (hex value, offset, length). A null hex value short-circuits to the empty
/// string; a null cut result renders as the empty string too.
fn evaluate_cut(frame: &Frame, args: &[Node], kind: FunctionKind) -> Result<String> {
    let function = kind.name();

    if args.len() < 3 {
        return Err(ApWatchError::TooFewArguments {
            function,
            got: args.len(),
        });
    }
    if args.len() > 3 {
        return Err(ApWatchError::TooManyArguments {
            function,
            got: args.len(),
        });
    }

    let hex_value = args[0].evaluate(frame)?;
    let from = parse_index(function, &args[1].evaluate(frame)?)?;
    let length = parse_index(function, &args[2].evaluate(frame)?)?;

    let value = BigNumber::from_hex_string(&hex_value)?;
    if value.is_null() {
        return Ok(String::new());
    }

    let cut = match kind {
        FunctionKind::CutBit => value.cut_bit(from, length)?,
        FunctionKind::CutByte => value.cut_byte(from, length)?,
        FunctionKind::Sha256 => unreachable!("not a cut function"),
    };

    if cut.is_null() {
        Ok(String::new())
    } else {
        cut.to_hex_string()
    }
}

fn parse_index(function: &'static str, text: &str) -> Result<usize> {
    text.parse::<usize>()
        .map_err(|_| ApWatchError::InvalidArgument {
            function,
            value: text.to_string(),
        })
}

/// The compiled script: a root holding exactly one expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutableTree {
    root: Option<Node>,
}

impl ExecutableTree {
    /// Create a tree with no expression yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the single top-level expression.
    ///
    /// The grammar guarantees this is called at most once; a second call is
    /// an internal-consistency error.
    pub fn set_root(&mut self, node: Node) -> Result<()> {
        if self.root.is_some() {
            return Err(ApWatchError::DuplicateRoot);
        }
        self.root = Some(node);
        Ok(())
    }

    /// The top-level expression, if the script produced one.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Evaluate the tree against a decoded frame, yielding the fingerprint.
    pub fn evaluate(&self, frame: &Frame) -> Result<String> {
        match &self.root {
            Some(node) => node.evaluate(frame),
            None => Err(ApWatchError::EmptyTree),
        }
    }

    /// Render the whole tree for diagnostics.
    pub fn render(&self) -> String {
        match &self.root {
            Some(node) => node.render(0),
            None => "No tree\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::beacon_frame;

    fn home_frame() -> Frame {
        let mut frame = Frame::new();
        frame.set_raw_data(beacon_frame(&[(0, b"Home"), (1, &[0x82, 0x84])]));
        frame.decode().unwrap();
        frame
    }

    fn sha256_hex(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    #[test]
    fn test_value_node_returns_literal() {
        let frame = home_frame();
        let node = Node::Value("literal text".to_string());
        assert_eq!(node.evaluate(&frame).unwrap(), "literal text");
    }

    #[test]
    fn test_getter_renders_hex() {
        let frame = home_frame();
        let node = Node::Getter {
            field: "1".to_string(),
        };
        assert_eq!(node.evaluate(&frame).unwrap(), "8284");
    }

    #[test]
    fn test_getter_ssid_renders_text() {
        let frame = home_frame();
        let node = Node::Getter {
            field: "ssid".to_string(),
        };
        assert_eq!(node.evaluate(&frame).unwrap(), "Home");
    }

    #[test]
    fn test_getter_miss_is_empty_string() {
        let frame = home_frame();
        let node = Node::Getter {
            field: "DD".to_string(),
        };
        assert_eq!(node.evaluate(&frame).unwrap(), "");
    }

    #[test]
    fn test_evaluation_requires_decoded_frame() {
        let mut frame = Frame::new();
        frame.set_raw_data(beacon_frame(&[]));

        let node = Node::Value("x".to_string());
        assert!(matches!(
            node.evaluate(&frame),
            Err(ApWatchError::FrameNotDecoded)
        ));
    }

    #[test]
    fn test_sha256_of_ssid() {
        let frame = home_frame();
        let node = Node::Function {
            kind: FunctionKind::Sha256,
            args: vec![Node::Getter {
                field: "ssid".to_string(),
            }],
        };
        assert_eq!(node.evaluate(&frame).unwrap(), sha256_hex("Home"));
    }

    #[test]
    fn test_sha256_concatenates_children_in_order() {
        let frame = home_frame();
        let node = Node::Function {
            kind: FunctionKind::Sha256,
            args: vec![
                Node::Value("a".to_string()),
                Node::Value("b".to_string()),
            ],
        };
        assert_eq!(node.evaluate(&frame).unwrap(), sha256_hex("ab"));
    }

    #[test]
    fn test_cut_byte_literal_args() {
        let frame = home_frame();
        let node = Node::Function {
            kind: FunctionKind::CutByte,
            args: vec![
                Node::Value("AABBCCDD".to_string()),
                Node::Value("1".to_string()),
                Node::Value("2".to_string()),
            ],
        };
        assert_eq!(node.evaluate(&frame).unwrap(), "BBCC");
    }

    #[test]
    fn test_cut_bit_literal_args() {
        let frame = home_frame();
        let node = Node::Function {
            kind: FunctionKind::CutBit,
            args: vec![
                Node::Value("AABB".to_string()),
                Node::Value("4".to_string()),
                Node::Value("8".to_string()),
            ],
        };
        assert_eq!(node.evaluate(&frame).unwrap(), "AB");
    }

    #[test]
    fn test_cut_null_input_short_circuits() {
        // The getter misses, the hex value is empty, the cut yields "".
        let frame = home_frame();
        let node = Node::Function {
            kind: FunctionKind::CutByte,
            args: vec![
                Node::Getter {
                    field: "DD".to_string(),
                },
                Node::Value("0".to_string()),
                Node::Value("1".to_string()),
            ],
        };
        assert_eq!(node.evaluate(&frame).unwrap(), "");
    }

    #[test]
    fn test_cut_zero_length_is_empty_string() {
        let frame = home_frame();
        let node = Node::Function {
            kind: FunctionKind::CutByte,
            args: vec![
                Node::Value("AABB".to_string()),
                Node::Value("0".to_string()),
                Node::Value("0".to_string()),
            ],
        };
        assert_eq!(node.evaluate(&frame).unwrap(), "");
    }

    #[test]
    fn test_cut_arity_checked_at_evaluation() {
        let frame = home_frame();

        let node = Node::Function {
            kind: FunctionKind::CutBit,
            args: vec![Node::Value("AA".to_string())],
        };
        assert!(matches!(
            node.evaluate(&frame),
            Err(ApWatchError::TooFewArguments { got: 1, .. })
        ));

        let node = Node::Function {
            kind: FunctionKind::CutByte,
            args: vec![
                Node::Value("AA".to_string()),
                Node::Value("0".to_string()),
                Node::Value("1".to_string()),
                Node::Value("extra".to_string()),
            ],
        };
        assert!(matches!(
            node.evaluate(&frame),
            Err(ApWatchError::TooManyArguments { got: 4, .. })
        ));
    }

    #[test]
    fn test_cut_non_numeric_offset_fails() {
        let frame = home_frame();
        let node = Node::Function {
            kind: FunctionKind::CutByte,
            args: vec![
                Node::Value("AABB".to_string()),
                Node::Value("one".to_string()),
                Node::Value("2".to_string()),
            ],
        };
        assert!(matches!(
            node.evaluate(&frame),
            Err(ApWatchError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_root_set_once() {
        let mut tree = ExecutableTree::new();
        tree.set_root(Node::Value("a".to_string())).unwrap();
        assert!(matches!(
            tree.set_root(Node::Value("b".to_string())),
            Err(ApWatchError::DuplicateRoot)
        ));
    }

    #[test]
    fn test_empty_tree_fails_evaluation() {
        let frame = home_frame();
        let tree = ExecutableTree::new();
        assert!(matches!(
            tree.evaluate(&frame),
            Err(ApWatchError::EmptyTree)
        ));
    }

    #[test]
    fn test_render_distinguishes_node_kinds() {
        let mut tree = ExecutableTree::new();
        tree.set_root(Node::Function {
            kind: FunctionKind::Sha256,
            args: vec![
                Node::Getter {
                    field: "ssid".to_string(),
                },
                Node::Value("salt".to_string()),
            ],
        })
        .unwrap();

        let rendered = tree.render();
        assert!(rendered.contains("Sha256()"));
        assert!(rendered.contains("-get -> ssid"));
        assert!(rendered.contains("-salt"));
    }
}
