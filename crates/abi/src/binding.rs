//! Per-input editing state for a loaded ABI.

use crate::coerce::{coerce, CandidateValue};
use crate::descriptor::{Abi, TypeDescriptor};
use crate::schema::{SchemaBuilder, ValidationRule};
use crate::validate::Verdict;
use crate::SchemaError;

/// One top-level ABI input together with its current edit.
#[derive(Debug)]
pub struct InputBinding {
    name: String,
    descriptor: TypeDescriptor,
    raw: String,
    value: CandidateValue,
    rule: ValidationRule,
    verdict: Verdict,
}

impl InputBinding {
    fn new(name: String, descriptor: TypeDescriptor, rule: ValidationRule) -> Self {
        let mut binding = InputBinding {
            name,
            descriptor,
            raw: String::new(),
            value: CandidateValue::Null,
            rule,
            verdict: Verdict::valid(),
        };
        binding.edit(String::new());
        binding
    }

    fn edit(&mut self, raw: String) {
        self.value = coerce(&self.descriptor, &raw);
        self.verdict = self.rule.validate(&self.value);
        self.raw = raw;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> &CandidateValue {
        &self.value
    }

    pub fn rule(&self) -> &ValidationRule {
        &self.rule
    }

    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Whether the input should be flagged: edited and failing validation.
    ///
    /// An input nobody has typed into yet is never flagged.
    pub fn is_invalid(&self) -> bool {
        !self.raw.is_empty() && !self.verdict.valid
    }
}

/// The ordered set of bindings for one ABI.
///
/// Rebuilt from scratch whenever a new ABI is loaded.
#[derive(Debug, Default)]
pub struct InputSet {
    bindings: Vec<InputBinding>,
}

impl InputSet {
    /// Build one binding per ABI input, compiling every rule up front.
    pub fn from_abi(abi: &Abi) -> Result<Self, SchemaError> {
        let rules = SchemaBuilder::build_abi(abi)?;
        let bindings = abi
            .inputs
            .iter()
            .zip(rules)
            .map(|(input, rule)| InputBinding::new(input.name.clone(), input.ty.clone(), rule))
            .collect();
        Ok(InputSet { bindings })
    }

    /// Replace the raw text of an input; returns `None` for an unknown name.
    pub fn set(&mut self, name: &str, raw: impl Into<String>) -> Option<&InputBinding> {
        let binding = self.bindings.iter_mut().find(|b| b.name == name)?;
        binding.edit(raw.into());
        Some(binding)
    }

    pub fn get(&self, name: &str) -> Option<&InputBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// True when every input currently passes local validation.
    pub fn all_valid(&self) -> bool {
        self.bindings.iter().all(|b| b.verdict.valid)
    }

    /// The argument list for a compute request: input `i` at position `i`.
    pub fn arguments(&self) -> Vec<CandidateValue> {
        self.bindings.iter().map(|b| b.value.clone()).collect()
    }
}
