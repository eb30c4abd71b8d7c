//! file: core/src/symbol/method.rs
//! description: resolved extern method descriptors.
//!
//! Overload resolution happens in the front end; the backend only reads
//! the chosen callee. A descriptor knows its owner type, whether it takes
//! an instance, its input and output types, and the extern signature
//! string the host dispatches on.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::qualifier::sanitize;
use crate::ast::Ty;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: Ty,
    pub name: String,
    #[serde(default)]
    pub instance: bool,
    #[serde(default)]
    pub params: Vec<Ty>,
    #[serde(default)]
    pub outputs: Vec<Ty>,
    pub extern_name: String,
}

impl MethodRef {
    /// Static method with a synthesized extern signature.
    pub fn new_static(owner: Ty, name: &str, params: Vec<Ty>, outputs: Vec<Ty>) -> Self {
        let extern_name = signature(&owner, name, &params, &outputs);
        MethodRef { owner, name: name.to_string(), instance: false, params, outputs, extern_name }
    }

    /// Instance method; the receiver is pushed before `params` but is not
    /// part of the signature.
    pub fn new_instance(owner: Ty, name: &str, params: Vec<Ty>, outputs: Vec<Ty>) -> Self {
        let extern_name = signature(&owner, name, &params, &outputs);
        MethodRef { owner, name: name.to_string(), instance: true, params, outputs, extern_name }
    }

    /// Constructor of `ty` modeled as a static extern.
    pub fn ctor(ty: Ty, params: Vec<Ty>) -> Self {
        let out = ty.clone();
        Self::new_static(ty, "ctor", params, vec![out])
    }

    /// Cast from `from` to `to` modeled as a call into the conversion type.
    pub fn convert(from: Ty, to: Ty) -> Self {
        let name = format!("To{}", sanitize(&to.platform_name()));
        Self::new_static(Ty::named("SystemConvert"), &name, vec![from], vec![to])
    }

    /// Number of explicit arguments, receiver excluded.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Types of every pushed input, receiver first.
    pub fn inputs(&self) -> Vec<Ty> {
        let mut out = Vec::with_capacity(self.params.len() + 1);
        if self.instance {
            out.push(self.owner.clone());
        }
        out.extend(self.params.iter().cloned());
        out
    }

    /// Type of the value the call leaves on the stack.
    pub fn result_ty(&self) -> Ty {
        match self.outputs.len() {
            0 => Ty::Unit,
            1 => self.outputs[0].clone(),
            _ => Ty::Tuple(self.outputs.clone()),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extern_name)
    }
}

fn signature(owner: &Ty, name: &str, params: &[Ty], outputs: &[Ty]) -> String {
    let mut sig = format!("{}.__{}", sanitize(&owner.platform_name()), name);
    if !params.is_empty() {
        let ps: Vec<String> = params.iter().map(|t| sanitize(&t.platform_name())).collect();
        sig.push_str("__");
        sig.push_str(&ps.join("_"));
    }
    sig.push_str("__");
    if outputs.is_empty() {
        sig.push_str("SystemVoid");
    } else {
        let os: Vec<String> = outputs.iter().map(|t| sanitize(&t.platform_name())).collect();
        sig.push_str(&os.join("_"));
    }
    sig
}
