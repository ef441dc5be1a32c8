//! Facet ABI loading and call encoding
//!
//! ABIs are loaded from the abis directory by facet name, so callers name a
//! function and pass positional JSON arguments instead of hex calldata.

use ethers::abi::{Abi, Function, ParamType, Token};
use ethers::types::{Address, I256, U256};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;

/// ABI file structure
#[derive(Debug, Deserialize)]
pub struct AbiFile {
    pub name: String,
    pub abi: Vec<Value>,
    /// Network name -> deployed address
    #[serde(default)]
    pub address: HashMap<String, String>,
}

/// A parsed facet ABI plus its known deployments
#[derive(Debug, Clone)]
pub struct FacetAbi {
    pub name: String,
    pub abi: Abi,
    pub addresses: HashMap<String, String>,
}

impl FacetAbi {
    pub fn load(abis_dir: &Path, name: &str) -> Result<Self, String> {
        let abi_file = load_abi(abis_dir, name)?;
        let abi = parse_abi(&abi_file)?;
        Ok(Self {
            name: abi_file.name,
            abi,
            addresses: abi_file.address,
        })
    }

    pub fn function(&self, name: &str) -> Result<&Function, String> {
        find_function(&self.abi, name)
    }

    /// Deployed address for a network, if the ABI file records one
    pub fn resolve_address(&self, network: &str) -> Option<&str> {
        self.addresses.get(network).map(String::as_str)
    }
}

/// Load ABI from file
pub fn load_abi(abis_dir: &Path, name: &str) -> Result<AbiFile, String> {
    let path = abis_dir.join(format!("{}.json", name));

    let content = std::fs::read_to_string(&path).map_err(|e| {
        format!("Failed to load ABI '{}' from {}: {}", name, path.display(), e)
    })?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse ABI '{}': {}", name, e))
}

/// Parse ethers Abi from our ABI file format
pub fn parse_abi(abi_file: &AbiFile) -> Result<Abi, String> {
    serde_json::from_value(Value::Array(abi_file.abi.clone()))
        .map_err(|e| format!("Failed to parse ABI '{}': {}", abi_file.name, e))
}

/// Find function in ABI
pub fn find_function<'a>(abi: &'a Abi, name: &str) -> Result<&'a Function, String> {
    abi.function(name)
        .map_err(|_| format!("Function '{}' not found in ABI", name))
}

/// Parse a U256 from decimal or 0x-prefixed hex
pub fn parse_u256(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if let Some(hex_str) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(hex_str, 16).map_err(|e| format!("Invalid hex number '{}': {}", s, e))
    } else {
        U256::from_dec_str(s).map_err(|e| format!("Invalid number '{}': {}", s, e))
    }
}

/// Integers may be given as JSON numbers or as decimal/hex strings
fn integer_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn elements<'a>(value: &'a Value, expected: Option<usize>) -> Result<&'a [Value], String> {
    let items = value.as_array()
        .ok_or_else(|| format!("Expected JSON array, got {}", value))?;
    match expected {
        Some(n) if items.len() != n => Err(format!("Expected {} elements, got {}", n, items.len())),
        _ => Ok(items),
    }
}

/// Convert one positional JSON argument into the token its ABI type expects
pub fn value_to_token(value: &Value, param_type: &ParamType) -> Result<Token, String> {
    let invalid = || format!("Invalid {}: {}", param_type, value);

    match param_type {
        ParamType::Address => value.as_str()
            .and_then(|s| s.parse::<Address>().ok())
            .map(Token::Address)
            .ok_or_else(invalid),
        ParamType::Uint(_) => integer_text(value)
            .and_then(|s| parse_u256(&s).ok())
            .map(Token::Uint)
            .ok_or_else(invalid),
        ParamType::Int(_) => integer_text(value)
            .and_then(|s| s.trim().parse::<I256>().ok())
            .map(|n| Token::Int(n.into_raw()))
            .ok_or_else(invalid),
        ParamType::Bool => value.as_bool().map(Token::Bool).ok_or_else(invalid),
        ParamType::String => value.as_str()
            .map(|s| Token::String(s.to_string()))
            .ok_or_else(invalid),
        ParamType::Bytes => hex_bytes(value).map(Token::Bytes).ok_or_else(invalid),
        ParamType::FixedBytes(size) => hex_bytes(value)
            .filter(|b| b.len() == *size)
            .map(Token::FixedBytes)
            .ok_or_else(invalid),
        ParamType::Array(inner) => tokens(elements(value, None)?, |_| &**inner).map(Token::Array),
        ParamType::FixedArray(inner, size) => {
            tokens(elements(value, Some(*size))?, |_| &**inner).map(Token::FixedArray)
        }
        ParamType::Tuple(types) => {
            tokens(elements(value, Some(types.len()))?, |i| &types[i]).map(Token::Tuple)
        }
    }
}

fn tokens<'a, F>(items: &[Value], kind_at: F) -> Result<Vec<Token>, String>
where
    F: Fn(usize) -> &'a ParamType,
{
    items.iter()
        .enumerate()
        .map(|(i, v)| value_to_token(v, kind_at(i)))
        .collect()
}

fn hex_bytes(value: &Value) -> Option<Vec<u8>> {
    let s = value.as_str()?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
}

/// Encode a call to `function` with positional JSON arguments
pub fn encode_call(function: &Function, args: &[Value]) -> Result<Vec<u8>, String> {
    if args.len() != function.inputs.len() {
        let expected: Vec<String> = function.inputs.iter()
            .map(|p| format!("{} {}", p.kind, p.name))
            .collect();
        return Err(format!(
            "{} expects {} parameters, got {} ({})",
            function.name,
            function.inputs.len(),
            args.len(),
            expected.join(", ")
        ));
    }

    let tokens = args.iter()
        .zip(&function.inputs)
        .map(|(value, param)| value_to_token(value, &param.kind))
        .collect::<Result<Vec<_>, _>>()?;

    function.encode_input(&tokens)
        .map_err(|e| format!("Failed to encode {}: {}", function.name, e))
}

/// Convert ethers Token to JSON value
pub fn token_to_value(token: &Token) -> Value {
    match token {
        Token::Address(a) => json!(format!("{:?}", a)),
        Token::Uint(n) => json!(n.to_string()),
        Token::Int(n) => json!(I256::from_raw(*n).to_string()),
        Token::Bool(b) => json!(b),
        Token::String(s) => json!(s),
        Token::Bytes(b) | Token::FixedBytes(b) => json!(format!("0x{}", hex::encode(b))),
        Token::Array(arr) | Token::FixedArray(arr) | Token::Tuple(arr) => {
            Value::Array(arr.iter().map(token_to_value).collect())
        }
    }
}

/// Decode the output of a read-only call; a single output is returned bare
pub fn decode_return(function: &Function, data: &[u8]) -> Result<Value, String> {
    let tokens = function.decode_output(data)
        .map_err(|e| format!("Failed to decode return value of '{}': {}", function.name, e))?;

    match tokens.as_slice() {
        [single] => Ok(token_to_value(single)),
        many => Ok(Value::Array(many.iter().map(token_to_value).collect())),
    }
}
