//! Block surface shared with the host: extension descriptors, argument
//! coercion and the opcode dispatch trait.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::device::Pending;

pub mod menus;

#[derive(Debug, Error, PartialEq)]
pub enum BlockError {
    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("missing argument {0}")]
    MissingArgument(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Hat,
    Command,
    Reporter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentInfo {
    #[serde(rename = "type")]
    pub kind: ArgumentType,
    pub default_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu: Option<&'static str>,
}

impl ArgumentInfo {
    pub fn string(default_value: impl Into<Value>) -> Self {
        Self {
            kind: ArgumentType::String,
            default_value: default_value.into(),
            menu: None,
        }
    }

    pub fn menu(mut self, menu: &'static str) -> Self {
        self.menu = Some(menu);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub opcode: &'static str,
    pub text: &'static str,
    pub block_type: BlockType,
    pub arguments: IndexMap<&'static str, ArgumentInfo>,
}

impl BlockInfo {
    pub fn new(block_type: BlockType, opcode: &'static str, text: &'static str) -> Self {
        Self {
            opcode,
            text,
            block_type,
            arguments: IndexMap::new(),
        }
    }

    pub fn command(opcode: &'static str, text: &'static str) -> Self {
        Self::new(BlockType::Command, opcode, text)
    }

    pub fn reporter(opcode: &'static str, text: &'static str) -> Self {
        Self::new(BlockType::Reporter, opcode, text)
    }

    pub fn argument(mut self, name: &'static str, info: ArgumentInfo) -> Self {
        self.arguments.insert(name, info);
        self
    }
}

/// Entry of the block palette; separators render as `"---"`.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockItem {
    Separator,
    Block(BlockInfo),
}

impl Serialize for BlockItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Separator => serializer.serialize_str("---"),
            Self::Block(block) => block.serialize(serializer),
        }
    }
}

impl From<BlockInfo> for BlockItem {
    fn from(block: BlockInfo) -> Self {
        Self::Block(block)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub accept_reporters: bool,
    pub items: Vec<&'static str>,
}

impl Menu {
    pub fn new(items: &[&'static str]) -> Self {
        Self {
            accept_reporters: true,
            items: items.to_vec(),
        }
    }
}

/// Everything the host needs to render an extension's blocks and menus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionInfo {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "blockIconURI")]
    pub block_icon_uri: &'static str,
    #[serde(rename = "menuIconURI")]
    pub menu_icon_uri: &'static str,
    pub blocks: Vec<BlockItem>,
    pub menus: IndexMap<&'static str, Menu>,
}

impl ExtensionInfo {
    pub fn block_infos(&self) -> impl Iterator<Item = &BlockInfo> {
        self.blocks.iter().filter_map(|item| match item {
            BlockItem::Block(block) => Some(block),
            BlockItem::Separator => None,
        })
    }

    pub fn block(&self, opcode: &str) -> Option<&BlockInfo> {
        self.block_infos().find(|block| block.opcode == opcode)
    }
}

/// Value handed back by a reporter block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for BlockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{}", number),
        }
    }
}

#[derive(Debug)]
pub enum BlockOutput {
    /// Command finished synchronously.
    Done,
    /// Command sent a request; the caller may drop the handle.
    Dispatched(Pending),
    Value(BlockValue),
}

impl BlockOutput {
    pub fn into_value(self) -> Option<BlockValue> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Plugin seam the host drives: describe the blocks, then run them by opcode.
pub trait BlockExtension {
    fn info(&self) -> ExtensionInfo;

    /// `args` is the JSON object of argument values keyed by argument name.
    fn run_block(&mut self, opcode: &str, args: &Value) -> Result<BlockOutput, BlockError>;
}

fn raw_arg<'a>(args: &'a Value, name: &'static str) -> Result<&'a Value, BlockError> {
    args.get(name).ok_or(BlockError::MissingArgument(name))
}

/// Coerces an argument to text the way the host's string cast does.
pub fn arg_text(args: &Value, name: &'static str) -> Result<String, BlockError> {
    Ok(match raw_arg(args, name)? {
        Value::String(text) => text.clone(),
        // `300.0` reads back as `300`
        Value::Number(number) if number.is_f64() => match number.as_f64() {
            Some(value) => value.to_string(),
            None => number.to_string(),
        },
        other => other.to_string(),
    })
}

/// Coerces an argument to a number; anything unparsable becomes `0`.
pub fn arg_number(args: &Value, name: &'static str) -> Result<f64, BlockError> {
    let number = match raw_arg(args, name)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.trim().is_empty() => Some(0.0),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };
    Ok(number.filter(|n| !n.is_nan()).unwrap_or(0.0))
}
