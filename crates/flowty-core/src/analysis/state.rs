use crate::analysis::value::SymValue;
use crate::expr::SubjectExpr;
use crate::types::Type;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Narrowed-type facts known on one path: at most one type per subject,
/// keyed by structural equivalence, last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFacts {
    map: HashMap<SubjectExpr, Type>,
}

impl TypeFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: SubjectExpr, ty: Type) {
        self.map.insert(subject, ty);
    }

    pub fn get(&self, subject: &SubjectExpr) -> Option<&Type> {
        self.map.get(subject)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&SubjectExpr, &Type) -> bool) {
        self.map.retain(|subject, ty| keep(subject, ty));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectExpr, &Type)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Hash for TypeFacts {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Entry hashes are combined commutatively; map iteration order must
        // not leak into the hash.
        let mut combined: u64 = 0;
        for (subject, ty) in &self.map {
            let mut entry = DefaultHasher::new();
            subject.hash(&mut entry);
            ty.hash(&mut entry);
            combined = combined.wrapping_add(entry.finish());
        }
        self.map.len().hash(state);
        combined.hash(state);
    }
}

/// Per-path interpreter state: the operand stack and the facts established
/// so far. Cloned at every fork; the clone owns its facts outright, so
/// narrowing on one branch can never leak into a sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MemoryState {
    stack: Vec<SymValue>,
    facts: TypeFacts,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: SymValue) {
        self.stack.push(value);
    }

    /// Panics on underflow: an instruction consumed an operand nothing
    /// produced, which means the flow graph was built wrong.
    pub fn pop(&mut self) -> SymValue {
        self.stack
            .pop()
            .expect("operand stack underflow: flow graph builder produced unbalanced instructions")
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Assumes `value` just evaluated to true on this path. A non-negated
    /// type test installs its fact; a negated one installs nothing. Returns
    /// whether the path is still feasible.
    pub fn apply_condition(&mut self, value: &SymValue) -> bool {
        if let SymValue::TypeTest(test) = value {
            if !test.negated {
                self.facts
                    .insert(test.subject.clone(), test.candidate.clone());
            }
        }

        match value {
            SymValue::Bool(value) => *value,
            _ => true,
        }
    }

    /// Unconditional fact write; a cast asserts, it does not test.
    pub fn set_expression_type(&mut self, subject: SubjectExpr, ty: Type) {
        self.facts.insert(subject, ty);
    }

    pub fn facts(&self) -> &TypeFacts {
        &self.facts
    }
}
