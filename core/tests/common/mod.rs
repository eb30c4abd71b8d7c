#![allow(dead_code)]

use slate_core::ast::{ArrayInit, Branch, FunctionDecl, LeftValue, NodeKind, Program, Ty, TypedNode};
use slate_core::ir::{CompiledProgram, Instruction};
use slate_core::symbol::{
    AnonKind, AnonLabel, FuncLabel, Label, LabelKind, MethodRef, Named, Qualifier, Table, VarLabel,
};
use slate_core::{compile, CompileOptions, CompileUnit, LowerError};

pub fn int() -> Ty {
    Ty::named("SystemInt32")
}

pub fn boolean() -> Ty {
    Ty::named("SystemBoolean")
}

pub fn object() -> Ty {
    Ty::named("UnityEngineTransform")
}

pub fn int_array() -> Ty {
    Ty::array_of(int())
}

/// Qualifier of the implicit entry block (`Start` hook).
pub fn entry_scope() -> Qualifier {
    Qualifier::from_segments(["Start"])
}

/// Table with the integer, boolean, array and reference-type methods the
/// tests lean on.
pub struct Fixture {
    pub table: Table,
}

impl Fixture {
    pub fn new() -> Self {
        let mut table = Table::new();
        let i = int();
        let b = boolean();
        let arr = int_array();
        let obj = object();

        for op in ["op_Addition", "op_Subtraction", "op_Division"] {
            table.register_method(MethodRef::new_static(i.clone(), op, vec![i.clone(), i.clone()], vec![i.clone()]));
        }
        for op in ["op_LessThan", "op_GreaterThan", "op_Equality"] {
            table.register_method(MethodRef::new_static(i.clone(), op, vec![i.clone(), i.clone()], vec![b.clone()]));
        }
        table.register_method(MethodRef::ctor(arr.clone(), vec![i.clone()]));
        table.register_method(MethodRef::new_instance(arr.clone(), "Set", vec![i.clone(), i.clone()], vec![]));
        table.register_method(MethodRef::new_instance(arr.clone(), "Get", vec![i.clone()], vec![i.clone()]));
        table.register_method(MethodRef::new_instance(arr.clone(), "get_Length", vec![], vec![i.clone()]));
        table.register_method(MethodRef::new_instance(arr.clone(), "Clone", vec![], vec![arr.clone()]));
        table.register_method(MethodRef::new_static(obj.clone(), "op_Equality", vec![obj.clone(), obj.clone()], vec![b.clone()]));
        table.register_method(MethodRef::new_instance(obj.clone(), "get_childCount", vec![], vec![i.clone()]));
        table.register_method(MethodRef::new_instance(obj.clone(), "set_name", vec![Ty::named("SystemString")], vec![]));
        Fixture { table }
    }

    /// Fixture whose table knows no methods at all.
    pub fn bare() -> Self {
        Fixture { table: Table::new() }
    }

    pub fn method(&self, owner: &Ty, name: &str, arity: usize) -> MethodRef {
        self.table.method(owner, name, arity).cloned().expect("fixture method registered")
    }

    pub fn lit(&mut self, text: &str, ty: Ty) -> TypedNode {
        let label = self.table.literal(text, &ty);
        TypedNode::new(ty, NodeKind::Literal(label))
    }

    pub fn int_lit(&mut self, value: i64) -> TypedNode {
        self.lit(&value.to_string(), int())
    }

    pub fn bool_lit(&mut self, value: bool) -> TypedNode {
        self.lit(if value { "true" } else { "false" }, boolean())
    }

    pub fn binary(&self, op: &str, lhs: TypedNode, rhs: TypedNode) -> TypedNode {
        let m = self.method(&int(), op, 2);
        let ty = m.result_ty();
        TypedNode::new(ty, NodeKind::Call { method: Some(m), instance: None, args: vec![lhs, rhs] })
    }

    pub fn add(&self, lhs: TypedNode, rhs: TypedNode) -> TypedNode {
        self.binary("op_Addition", lhs, rhs)
    }

    pub fn less(&self, lhs: TypedNode, rhs: TypedNode) -> TypedNode {
        self.binary("op_LessThan", lhs, rhs)
    }

    pub fn unit(&self, program: Program) -> CompileUnit {
        CompileUnit::new(self.table.clone(), program)
    }

    pub fn compile_entry(&self, entry: Vec<TypedNode>) -> CompiledProgram {
        compile_ok(&self.unit(Program { functions: Vec::new(), entry }))
    }
}

pub fn var(scope: &Qualifier, name: &str, ty: Ty) -> VarLabel {
    VarLabel::user(scope.clone(), name, ty)
}

pub fn read(v: &VarLabel) -> TypedNode {
    TypedNode::new(v.ty.clone(), NodeKind::Var(v.clone()))
}

pub fn let_(targets: Vec<VarLabel>, value: TypedNode) -> TypedNode {
    TypedNode::unit(NodeKind::Let { targets, value: Box::new(value) })
}

pub fn assign(target: &VarLabel, value: TypedNode) -> TypedNode {
    TypedNode::unit(NodeKind::Assign { targets: vec![LeftValue::Var(target.clone())], value: Box::new(value) })
}

pub fn tuple(items: Vec<TypedNode>) -> TypedNode {
    let ty = Ty::Tuple(items.iter().map(|n| n.ty.clone()).collect());
    TypedNode::new(ty, NodeKind::Tuple(items))
}

pub fn block(scope: &Qualifier, ordinal: u32, ty: Ty, body: Vec<TypedNode>) -> TypedNode {
    let label = AnonLabel::new(AnonKind::Block, scope.clone(), ordinal);
    TypedNode::new(ty, NodeKind::Block { label, body })
}

pub fn if_(branches: Vec<(TypedNode, TypedNode)>, otherwise: Option<TypedNode>, ty: Ty) -> TypedNode {
    let branches = branches.into_iter().map(|(cond, body)| Branch { cond, body }).collect();
    TypedNode::new(ty, NodeKind::If { branches, otherwise: otherwise.map(Box::new) })
}

pub fn while_(cond: TypedNode, body: TypedNode) -> TypedNode {
    TypedNode::unit(NodeKind::While { cond: Box::new(cond), body: Box::new(body) })
}

pub fn array(elem: Ty, init: ArrayInit) -> TypedNode {
    TypedNode::new(Ty::array_of(elem.clone()), NodeKind::Array { elem, init })
}

pub fn func(name: &str, params: Vec<VarLabel>, ret: Ty) -> FuncLabel {
    FuncLabel::new(Qualifier::from_segments(["Main"]), name, params, ret)
}

pub fn call_func(f: &FuncLabel, args: Vec<TypedNode>) -> TypedNode {
    TypedNode::new(f.ret.clone(), NodeKind::FuncCall { func: f.clone(), args })
}

pub fn decl(label: FuncLabel, body: TypedNode) -> FunctionDecl {
    FunctionDecl::new(label, body)
}

pub fn compile_ok(unit: &CompileUnit) -> CompiledProgram {
    compile(unit, &CompileOptions::default()).expect("unit compiles")
}

pub fn compile_err(unit: &CompileUnit) -> Vec<LowerError> {
    match compile(unit, &CompileOptions::default()) {
        Ok(p) => panic!("expected diagnostics, got a program:\n{}", p),
        Err(errs) => errs,
    }
}

/// Code of the block entered at `identifier`, `INDENT` markers removed.
pub fn block_code(program: &CompiledProgram, identifier: &str) -> Vec<Instruction> {
    let block = program.block(identifier).expect("block present");
    block.code.iter().filter(|op| !matches!(op, Instruction::Indent(_))).cloned().collect()
}

/// Body of the implicit entry block, between the entry label and the
/// return-to-host jump.
pub fn entry_body(program: &CompiledProgram) -> Vec<Instruction> {
    let code = block_code(program, "_start");
    // EXPORT_CODE, LABEL ... JUMP
    code[2..code.len() - 1].to_vec()
}

pub fn count_labels(code: &[Instruction], kind: LabelKind) -> usize {
    code.iter()
        .filter(|op| matches!(op, Instruction::Label(l) if l.kind() == kind))
        .count()
}

pub fn count_externs(code: &[Instruction], extern_name: &str) -> usize {
    code.iter()
        .filter(|op| matches!(op, Instruction::Extern(s) if s == extern_name))
        .count()
}

pub fn push(label: impl Into<Label>) -> Instruction {
    Instruction::push(label)
}

pub fn identifiers(code: &[Instruction]) -> Vec<String> {
    code.iter()
        .filter_map(|op| match op {
            Instruction::Push(addr) => Some(addr.0.identifier()),
            _ => None,
        })
        .collect()
}
