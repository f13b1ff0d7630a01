//! Instruction tree for block scripts.
//!
//! A script document is a list of entry points (hats), each followed by a
//! sequence of statement blocks. Documents are stored on entities as opaque
//! JSON text and only decoded when a run or broadcast scans for entry points.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DocumentError, ScriptError};

pub const EMPTY_DOCUMENT: &str = r#"{"scripts":[]}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Numeric view of the value. Blank text reads as zero; any other text
    /// must parse as a number.
    pub fn to_number(&self, block: &'static str) -> Result<f64, ScriptError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| ScriptError::TypeMismatch { block, found: text.clone() })
            }
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(text) => !text.is_empty(),
        }
    }

    fn as_lenient_number(&self) -> Option<f64> {
        self.to_number("logic_compare").ok()
    }

    fn compare(&self, other: &Value, op: CompareOp) -> bool {
        match (self.as_lenient_number(), other.as_lenient_number()) {
            (Some(a), Some(b)) => match op {
                CompareOp::Eq => a == b,
                CompareOp::Neq => a != b,
                CompareOp::Lt => a < b,
                CompareOp::Lte => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Gte => a >= b,
            },
            _ => {
                let (a, b) = (self.to_string(), other.to_string());
                match op {
                    CompareOp::Eq => a == b,
                    CompareOp::Neq => a != b,
                    CompareOp::Lt => a < b,
                    CompareOp::Lte => a <= b,
                    CompareOp::Gt => a > b,
                    CompareOp::Gte => a >= b,
                }
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArithmeticOp {
    Add,
    Minus,
    Multiply,
    Divide,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicOp {
    And,
    Or,
}

/// A value input: either a literal shadow value or a reporter block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Literal(Value),
    Reporter(Box<Reporter>),
}

impl Expr {
    pub fn number(n: f64) -> Self {
        Expr::Literal(Value::Number(n))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Expr::Literal(Value::text(value))
    }

    pub fn evaluate(&self) -> Result<Value, ScriptError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Reporter(reporter) => reporter.evaluate(),
        }
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Literal(Value::default())
    }
}

fn empty_text() -> Expr {
    Expr::text("")
}

fn literal_false() -> Expr {
    Expr::Literal(Value::Bool(false))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "opcode")]
pub enum Reporter {
    #[serde(rename = "math_arithmetic")]
    Arithmetic {
        op: ArithmeticOp,
        #[serde(default)]
        a: Expr,
        #[serde(default)]
        b: Expr,
    },
    #[serde(rename = "logic_compare")]
    Compare {
        op: CompareOp,
        #[serde(default)]
        a: Expr,
        #[serde(default)]
        b: Expr,
    },
    #[serde(rename = "logic_operation")]
    Logic {
        op: LogicOp,
        #[serde(default = "literal_false")]
        a: Expr,
        #[serde(default = "literal_false")]
        b: Expr,
    },
    #[serde(rename = "logic_negate")]
    Negate {
        #[serde(default = "literal_false")]
        value: Expr,
    },
}

impl Reporter {
    fn evaluate(&self) -> Result<Value, ScriptError> {
        match self {
            Reporter::Arithmetic { op, a, b } => {
                let a = a.evaluate()?.to_number("math_arithmetic")?;
                let b = b.evaluate()?.to_number("math_arithmetic")?;
                let result = match op {
                    ArithmeticOp::Add => a + b,
                    ArithmeticOp::Minus => a - b,
                    ArithmeticOp::Multiply => a * b,
                    ArithmeticOp::Divide => a / b,
                    ArithmeticOp::Power => a.powf(b),
                };
                Ok(Value::Number(result))
            }
            Reporter::Compare { op, a, b } => Ok(Value::Bool(a.evaluate()?.compare(&b.evaluate()?, *op))),
            Reporter::Logic { op, a, b } => {
                let lhs = a.evaluate()?.is_truthy();
                let result = match op {
                    LogicOp::And => lhs && b.evaluate()?.is_truthy(),
                    LogicOp::Or => lhs || b.evaluate()?.is_truthy(),
                };
                Ok(Value::Bool(result))
            }
            Reporter::Negate { value } => Ok(Value::Bool(!value.evaluate()?.is_truthy())),
        }
    }
}

/// Statement blocks. Opcodes match the block registry names used by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "opcode")]
pub enum Block {
    #[serde(rename = "motion_move")]
    Move {
        #[serde(default)]
        steps: Expr,
    },
    #[serde(rename = "motion_turn")]
    Turn {
        #[serde(default)]
        degrees: Expr,
    },
    #[serde(rename = "motion_goto_xy")]
    GotoXy {
        #[serde(default)]
        x: Expr,
        #[serde(default)]
        y: Expr,
    },
    #[serde(rename = "looks_say")]
    Say {
        #[serde(default = "empty_text")]
        message: Expr,
    },
    #[serde(rename = "looks_switchbackdropto")]
    SwitchBackdrop { backdrop: Expr },
    #[serde(rename = "control_wait")]
    Wait {
        #[serde(default)]
        duration: Expr,
    },
    #[serde(rename = "control_forever")]
    Forever {
        #[serde(default)]
        body: Vec<Block>,
    },
    #[serde(rename = "controls_repeat_ext")]
    Repeat {
        #[serde(default)]
        times: Expr,
        #[serde(default)]
        body: Vec<Block>,
    },
    #[serde(rename = "controls_if")]
    If {
        #[serde(default = "literal_false")]
        condition: Expr,
        #[serde(default)]
        body: Vec<Block>,
    },
    #[serde(rename = "event_broadcast")]
    Broadcast {
        #[serde(default = "empty_text")]
        message: Expr,
    },
}

impl Block {
    pub fn opcode(&self) -> &'static str {
        match self {
            Block::Move { .. } => "motion_move",
            Block::Turn { .. } => "motion_turn",
            Block::GotoXy { .. } => "motion_goto_xy",
            Block::Say { .. } => "looks_say",
            Block::SwitchBackdrop { .. } => "looks_switchbackdropto",
            Block::Wait { .. } => "control_wait",
            Block::Forever { .. } => "control_forever",
            Block::Repeat { .. } => "controls_repeat_ext",
            Block::If { .. } => "controls_if",
            Block::Broadcast { .. } => "event_broadcast",
        }
    }
}

fn default_message() -> String {
    "message1".to_string()
}

/// Hat blocks that start a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "opcode")]
pub enum Trigger {
    #[serde(rename = "event_whenflagclicked")]
    FlagClicked,
    #[serde(rename = "event_whenbroadcastreceived")]
    BroadcastReceived {
        #[serde(default = "default_message")]
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub trigger: Trigger,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Script {
    pub fn new(trigger: Trigger, blocks: Vec<Block>) -> Self {
        Self { trigger, blocks }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptDocument {
    #[serde(default)]
    pub scripts: Vec<Script>,
}

impl ScriptDocument {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self { scripts }
    }

    /// Blank text decodes as an empty document.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Bodies of every `when flag clicked` hat with at least one block beneath it.
    pub fn flag_bodies(&self) -> impl Iterator<Item = &[Block]> + '_ {
        self.scripts
            .iter()
            .filter(|script| matches!(script.trigger, Trigger::FlagClicked))
            .map(|script| script.blocks.as_slice())
            .filter(|blocks| !blocks.is_empty())
    }

    /// Bodies of every `when I receive` hat listening for `message`.
    pub fn receiver_bodies<'a>(&'a self, message: &'a str) -> impl Iterator<Item = &'a [Block]> + 'a {
        self.scripts
            .iter()
            .filter(move |script| {
                matches!(&script.trigger, Trigger::BroadcastReceived { message: m } if m == message)
            })
            .map(|script| script.blocks.as_slice())
            .filter(|blocks| !blocks.is_empty())
    }
}
