//! Built-in value stack capability served for configured targets.
//!
//! The stack holds JSON values pushed by clients and hands back their
//! indices, the same entry-point bookkeeping the inspection client relies on
//! (`pushString`, `pushInt`, `pushBoolean`, `getEntryPoints`). It lets the
//! daemon serve something useful without a host-provided capability.

use std::sync::{Mutex, MutexGuard};

use gadget_protocol::{Argument, ParamType};
use serde_json::{Value, json};

use crate::capability::{Capability, CapabilityError, Operation, OperationTable};

/// Capability storing pushed values as indexed entry points.
#[derive(Debug)]
pub struct ValueStack {
    table: OperationTable,
    entries: Mutex<Vec<Value>>,
}

impl Default for ValueStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueStack {
    /// Builds an empty stack.
    #[must_use]
    pub fn new() -> Self {
        let table = OperationTable::new()
            .with("getEntryPoints", &[])
            .with("getEntryPoint", &[ParamType::Int])
            .with("push", &[ParamType::Bool])
            .with("push", &[ParamType::Int])
            .with("push", &[ParamType::String])
            .with("pushString", &[ParamType::String])
            .with("pushInt", &[ParamType::Int])
            .with("pushBoolean", &[ParamType::Bool])
            .with("filterEntryPoints", &[ParamType::String])
            .with("clear", &[]);
        Self {
            table,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, Vec<Value>>, CapabilityError> {
        self.entries
            .lock()
            .map_err(|_| CapabilityError::invocation("value stack lock poisoned"))
    }

    fn push(&self, argument: Argument) -> Result<Value, CapabilityError> {
        let value = serde_json::to_value(&argument)
            .map_err(|error| CapabilityError::invocation(error.to_string()))?;
        let mut entries = self.entries()?;
        entries.push(value);
        Ok(json!(entries.len() - 1))
    }

    fn entry_point(&self, argument: Option<&Argument>) -> Result<Value, CapabilityError> {
        let index = argument
            .and_then(Argument::as_i64)
            .and_then(|raw| usize::try_from(raw).ok())
            .ok_or_else(|| CapabilityError::invocation("entry point index must be positive"))?;
        self.entries()?
            .get(index)
            .cloned()
            .ok_or_else(|| CapabilityError::invocation(format!("no entry point at {index}")))
    }

    fn filter(&self, argument: Option<&Argument>) -> Result<Value, CapabilityError> {
        let kind = argument
            .and_then(Argument::as_str)
            .ok_or_else(|| CapabilityError::invocation("filter needs a type name"))?;
        let indices: Vec<usize> = self
            .entries()?
            .iter()
            .enumerate()
            .filter(|(_, value)| type_name(value) == kind)
            .map(|(index, _)| index)
            .collect();
        Ok(json!(indices))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Null | Value::Array(_) | Value::Object(_) => "json",
    }
}

impl Capability for ValueStack {
    fn operations(&self) -> &OperationTable {
        &self.table
    }

    fn invoke(
        &self,
        operation: &Operation,
        arguments: Vec<Argument>,
    ) -> Result<Value, CapabilityError> {
        match operation.name() {
            "getEntryPoints" => Ok(Value::Array(self.entries()?.clone())),
            "getEntryPoint" => self.entry_point(arguments.first()),
            "push" | "pushString" | "pushInt" | "pushBoolean" => arguments
                .into_iter()
                .next()
                .ok_or_else(|| CapabilityError::invocation("push needs a value"))
                .and_then(|argument| self.push(argument)),
            "filterEntryPoints" => self.filter(arguments.first()),
            "clear" => {
                self.entries()?.clear();
                Ok(Value::Null)
            }
            other => Err(CapabilityError::invocation(format!(
                "operation {other} is declared but not implemented"
            ))),
        }
    }
}
