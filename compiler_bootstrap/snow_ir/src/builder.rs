//! The IR builder: a stateless transformation from the minimal AST-input
//! contract (`crate::ast`) into an `IRProgram`. See §4.2.

use smallvec::{smallvec, SmallVec};
use snow_common::{widen, ConstantValue, Width};

use crate::ast::{AstRoot, BinarySym, Expr, FunctionNode, ModuleNode, Stmt, StructNode, UnarySym};
use crate::error::{BuildError, BuildResult};
use crate::function::IRFunction;
use crate::instruction::{Instruction, Operand};
use crate::opcode::{BinOp, CmpOp, UnOp};
use crate::program::IRProgram;
use crate::register::{Label, VReg};
use crate::scope::SymbolTable;
use crate::tables::{GlobalConstantTable, GlobalFunctionTable, StructLayout, StructLayoutTable};
use crate::typenames::{type_name_of_width, width_of_type_name};

const INDEX_CALLEE: &str = "__index_r";
const START_FUNCTION: &str = "_start";

/// Lowers `roots` into an `IRProgram`. Pre-scans collect globals and struct
/// layouts before any function body is built, matching §4.2's two-phase
/// pre-scan ordering.
pub fn build_program(
    roots: &[AstRoot],
    globals: &GlobalConstantTable,
    functions: &GlobalFunctionTable,
    structs: &StructLayoutTable,
) -> BuildResult<IRProgram> {
    prescan_constants(roots, globals);
    prescan_structs(roots, structs);
    prescan_function_return_types(roots, functions);

    let mut program = IRProgram::new();
    let mut pending_start_stmts: Vec<Stmt> = Vec::new();

    for root in roots {
        match root {
            AstRoot::Module(module) => build_module(module, globals, functions, structs, &mut program)?,
            AstRoot::Function(function) => {
                let ir_fn = build_function(function, None, globals, functions, structs)?;
                program.add_function(ir_fn);
            }
            AstRoot::Stmt(stmt) => pending_start_stmts.push(stmt.clone()),
        }
    }

    if !pending_start_stmts.is_empty() {
        let start = build_start_function(&pending_start_stmts, globals, functions, structs)?;
        program.add_function(start);
    }

    Ok(program)
}

fn prescan_constants(roots: &[AstRoot], globals: &GlobalConstantTable) {
    for root in roots {
        if let AstRoot::Module(module) = root {
            for (name, value) in &module.constants {
                globals.register(format!("{}.{name}", module.name), value.clone());
            }
        }
    }
}

fn prescan_structs(roots: &[AstRoot], structs: &StructLayoutTable) {
    for root in roots {
        if let AstRoot::Module(module) = root {
            for s in &module.structs {
                let mut fields = indexmap::IndexMap::new();
                for (i, field) in s.fields.iter().enumerate() {
                    fields.insert(field.clone(), i);
                }
                structs.register(
                    s.name.clone(),
                    StructLayout {
                        fields,
                        parent: s.parent.clone(),
                    },
                );
            }
        }
    }
}

fn prescan_function_return_types(roots: &[AstRoot], functions: &GlobalFunctionTable) {
    for root in roots {
        match root {
            AstRoot::Module(module) => {
                for s in &module.structs {
                    functions.register(format!("{}.new", s.name), s.name.clone());
                }
                for f in &module.functions {
                    functions.register(qualified_name(Some(&module.name), &f.name), f.return_type.as_str());
                }
            }
            AstRoot::Function(f) => functions.register(f.name.clone(), f.return_type.as_str()),
            AstRoot::Stmt(_) => {}
        }
    }
}

fn qualified_name(module: Option<&str>, name: &str) -> String {
    match module {
        Some(m) => format!("{m}.{name}"),
        None => name.to_string(),
    }
}

fn build_module(
    module: &ModuleNode,
    globals: &GlobalConstantTable,
    functions: &GlobalFunctionTable,
    structs: &StructLayoutTable,
    program: &mut IRProgram,
) -> BuildResult<()> {
    for s in &module.structs {
        program.add_function(build_struct_constructor(s));
    }
    for f in &module.functions {
        let ir_fn = build_function(f, Some(&module.name), globals, functions, structs)?;
        program.add_function(ir_fn);
    }
    Ok(())
}

/// Synthesizes `<Struct>.new(p0..pk)`, delegating actual allocation to the
/// `__new_struct` external the host VM resolves (struct allocation has no
/// dedicated VM opcode; it rides the same open-extension-surface mechanism
/// as syscalls — see DESIGN.md's Open Question notes).
fn build_struct_constructor(s: &StructNode) -> IRFunction {
    let mut func = IRFunction::new(format!("{}.new", s.name));
    let mut args: SmallVec<[Operand; 4]> = SmallVec::new();
    for _ in &s.fields {
        let p = func.new_register();
        func.add_parameter(p);
        func.set_register_type(p, "Ref");
        args.push(Operand::Reg(p));
    }
    let dest = func.new_register();
    func.add_instruction(Instruction::Call {
        dest: Some(dest),
        target: "__new_struct".to_string(),
        args,
    });
    func.set_register_type(dest, "Ref");
    func.add_instruction(Instruction::Return(Some(Operand::Reg(dest))));
    func
}

fn build_start_function(
    stmts: &[Stmt],
    globals: &GlobalConstantTable,
    functions: &GlobalFunctionTable,
    structs: &StructLayoutTable,
) -> BuildResult<IRFunction> {
    let mut func = IRFunction::new(START_FUNCTION);
    let mut scopes = SymbolTable::new();
    let mut ctx = FnCtx {
        func: &mut func,
        scopes: &mut scopes,
        label_counter: 0,
        globals,
        functions,
        structs,
    };
    for stmt in stmts {
        lower_stmt(&mut ctx, stmt)?;
    }
    Ok(func)
}

fn build_function(
    node: &FunctionNode,
    module: Option<&str>,
    globals: &GlobalConstantTable,
    functions: &GlobalFunctionTable,
    structs: &StructLayoutTable,
) -> BuildResult<IRFunction> {
    let fq_name = qualified_name(module, &node.name);
    let mut func = IRFunction::new(fq_name);
    let mut scopes = SymbolTable::new();
    for param in &node.params {
        let vr = func.new_register();
        func.add_parameter(vr);
        func.set_register_type(vr, param.type_name.as_str());
        scopes.define(param.name.as_str(), vr, param.type_name.as_str());
    }
    let mut ctx = FnCtx {
        func: &mut func,
        scopes: &mut scopes,
        label_counter: 0,
        globals,
        functions,
        structs,
    };
    for stmt in &node.body {
        lower_stmt(&mut ctx, stmt)?;
    }
    Ok(func)
}

/// Per-function builder state: the in-progress function, the scoped symbol
/// table, a monotonic label counter, and the process-wide table views.
struct FnCtx<'a> {
    func: &'a mut IRFunction,
    scopes: &'a mut SymbolTable,
    label_counter: u32,
    globals: &'a GlobalConstantTable,
    functions: &'a GlobalFunctionTable,
    structs: &'a StructLayoutTable,
}

impl FnCtx<'_> {
    fn fresh_label(&mut self, purpose: &str) -> Label {
        let n = self.label_counter;
        self.label_counter += 1;
        Label::new(format!("{}_{purpose}_{n}", self.func.name))
    }
}

fn lower_stmt(ctx: &mut FnCtx, stmt: &Stmt) -> BuildResult<()> {
    match stmt {
        Stmt::Let { name, type_name, init } => {
            let dest = ctx.func.new_register();
            lower_expr_into(ctx, init, dest, type_name)?;
            ctx.scopes.define(name.as_str(), dest, type_name.as_str());
            Ok(())
        }
        Stmt::Assign { name, value } => {
            let (dest, ty) = ctx
                .scopes
                .lookup(name)
                .ok_or_else(|| BuildError::UnresolvedSymbol(name.clone()))?;
            lower_expr_into(ctx, value, dest, &ty)
        }
        Stmt::ExprStmt(expr) => {
            if let Expr::Call { name, args } = expr {
                lower_call_instr(ctx, name, args)?;
            } else {
                lower_expr(ctx, expr)?;
            }
            Ok(())
        }
        Stmt::If { cond, then_body, else_body } => {
            let then_label = ctx.fresh_label("if_then");
            let else_label = ctx.fresh_label("if_else");
            let end_label = ctx.fresh_label("if_end");
            lower_condition_branch(ctx, cond, &then_label)?;
            ctx.func.add_instruction(Instruction::Jump(else_label.clone()));
            ctx.func.add_instruction(Instruction::Label(then_label));
            ctx.scopes.push_scope();
            for s in then_body {
                lower_stmt(ctx, s)?;
            }
            ctx.scopes.pop_scope();
            ctx.func.add_instruction(Instruction::Jump(end_label.clone()));
            ctx.func.add_instruction(Instruction::Label(else_label));
            ctx.scopes.push_scope();
            for s in else_body {
                lower_stmt(ctx, s)?;
            }
            ctx.scopes.pop_scope();
            ctx.func.add_instruction(Instruction::Label(end_label));
            Ok(())
        }
        Stmt::While { cond, body } => {
            let start_label = ctx.fresh_label("while_start");
            let body_label = ctx.fresh_label("while_body");
            let end_label = ctx.fresh_label("while_end");
            ctx.func.add_instruction(Instruction::Label(start_label.clone()));
            lower_condition_branch(ctx, cond, &body_label)?;
            ctx.func.add_instruction(Instruction::Jump(end_label.clone()));
            ctx.func.add_instruction(Instruction::Label(body_label));
            ctx.scopes.push_scope();
            for s in body {
                lower_stmt(ctx, s)?;
            }
            ctx.scopes.pop_scope();
            ctx.func.add_instruction(Instruction::Jump(start_label));
            ctx.func.add_instruction(Instruction::Label(end_label));
            Ok(())
        }
        Stmt::Return(value) => {
            match value {
                Some(e) => {
                    let (vr, _) = lower_expr(ctx, e)?;
                    ctx.func.add_instruction(Instruction::Return(Some(Operand::Reg(vr))));
                }
                None => ctx.func.add_instruction(Instruction::Return(None)),
            }
            Ok(())
        }
    }
}

/// Emits a branch to `target` when `cond` holds. Comparison expressions
/// lower directly to `CompareJump`; any other boolean-valued expression is
/// first materialized into a register and compared against zero.
fn lower_condition_branch(ctx: &mut FnCtx, cond: &Expr, target: &Label) -> BuildResult<()> {
    if let Expr::Binary { op, lhs, rhs } = cond {
        if let Some(cmp) = cmp_sym(*op) {
            let (lop, lty) = lower_operand(ctx, lhs)?;
            let (rop, rty) = lower_operand(ctx, rhs)?;
            let width = widen(width_of_type_name(&lty), width_of_type_name(&rty));
            ctx.func.add_instruction(Instruction::CompareJump {
                op: cmp,
                width,
                lhs: lop,
                rhs: rop,
                target: target.clone(),
            });
            return Ok(());
        }
    }
    let (vr, ty) = lower_expr(ctx, cond)?;
    let width = width_of_type_name(&ty);
    ctx.func.add_instruction(Instruction::CompareJump {
        op: CmpOp::Ne,
        width,
        lhs: Operand::Reg(vr),
        rhs: Operand::Const(zero_const(width)),
        target: target.clone(),
    });
    Ok(())
}

/// Writes the result of `expr` into the caller-supplied `dest`. When `expr`
/// is itself a plain variable reference (a move), this is emitted as
/// `ADD_<T> dest, src, CONST-0` so the backend's peephole (§4.3) collapses
/// it to a real `MOV` — the IR never needs a dedicated `MOV` opcode.
fn lower_expr_into(ctx: &mut FnCtx, expr: &Expr, dest: VReg, type_name: &str) -> BuildResult<()> {
    match expr {
        Expr::Ident(name) => {
            let (src, src_ty) = ctx
                .scopes
                .lookup(name)
                .ok_or_else(|| BuildError::UnresolvedSymbol(name.clone()))?;
            let src_width = width_of_type_name(&src_ty);
            ctx.func.add_instruction(Instruction::BinaryOp {
                op: BinOp::Add,
                width: src_width,
                dest,
                lhs: Operand::Reg(src),
                rhs: Operand::Const(zero_const(src_width)),
            });
            ctx.func.set_register_type(dest, src_ty.as_str());
            Ok(())
        }
        _ => {
            let (vr, ty) = lower_expr(ctx, expr)?;
            if vr != dest {
                let result_width = width_of_type_name(&ty);
                ctx.func.add_instruction(Instruction::BinaryOp {
                    op: BinOp::Add,
                    width: result_width,
                    dest,
                    lhs: Operand::Reg(vr),
                    rhs: Operand::Const(zero_const(result_width)),
                });
            }
            ctx.func.set_register_type(dest, type_name_or(&ty, type_name));
            Ok(())
        }
    }
}

fn type_name_or<'a>(computed: &'a str, declared: &'a str) -> &'a str {
    if declared.is_empty() {
        computed
    } else {
        declared
    }
}

fn zero_const(width: Width) -> ConstantValue {
    match width {
        Width::B8 => ConstantValue::B8(0),
        Width::S16 => ConstantValue::S16(0),
        Width::I32 | Width::Bool => ConstantValue::I32(0),
        Width::L64 => ConstantValue::L64(0),
        Width::F32 => ConstantValue::F32(0.0),
        Width::D64 => ConstantValue::D64(0.0),
        Width::Str | Width::Ref | Width::List => ConstantValue::I32(0),
    }
}

/// Lowers `expr` as an instruction operand without forcing a `LoadConst`
/// when it is already a literal — this is what lets cross-module constant
/// folding and arithmetic-with-a-literal emit the constant inline
/// (`ADD_I32 %r, CONST 1`) instead of always routing through a register.
fn lower_operand(ctx: &mut FnCtx, expr: &Expr) -> BuildResult<(Operand, String)> {
    if let Expr::Const(c) = expr {
        return Ok((Operand::Const(c.clone()), type_name_of_width(c.width())));
    }
    let (vr, ty) = lower_expr(ctx, expr)?;
    Ok((Operand::Reg(vr), ty))
}

/// Lowers `expr`, producing a register holding its value. This is case (a)
/// of the expression-handler contract in §4.2.
fn lower_expr(ctx: &mut FnCtx, expr: &Expr) -> BuildResult<(VReg, String)> {
    match expr {
        Expr::Const(c) => {
            let dest = ctx.func.new_register();
            let ty = type_name_of_width(c.width());
            ctx.func.add_instruction(Instruction::LoadConst {
                dest,
                value: c.clone(),
            });
            ctx.func.set_register_type(dest, ty.as_str());
            Ok((dest, ty))
        }
        Expr::Ident(name) => ctx
            .scopes
            .lookup(name)
            .ok_or_else(|| BuildError::UnresolvedSymbol(name.clone())),
        Expr::Member { base, field } => lower_member(ctx, base, field),
        Expr::Index { base, index } => lower_index(ctx, base, index),
        Expr::Binary { op, lhs, rhs } => lower_binary(ctx, *op, lhs, rhs),
        Expr::Unary { op, operand } => lower_unary(ctx, *op, operand),
        Expr::Call { name, args } => lower_call_instr(ctx, name, args)?.ok_or_else(|| {
            BuildError::InvalidAstShape(format!("call to void function '{name}' used as a value"))
        }),
        Expr::ArrayLiteral(items) => lower_array_literal(ctx, items),
        Expr::New { struct_name, args } => lower_call_instr(ctx, &format!("{struct_name}.new"), args)?
            .ok_or_else(|| BuildError::InvalidAstShape(format!("constructor '{struct_name}.new' returned void"))),
    }
}

fn lower_member(ctx: &mut FnCtx, base: &str, field: &str) -> BuildResult<(VReg, String)> {
    let fq = format!("{base}.{field}");
    if let Some(value) = ctx.globals.get(&fq) {
        log::debug!("folded cross-module constant {fq}");
        let dest = ctx.func.new_register();
        let ty = type_name_of_width(value.width());
        ctx.func.add_instruction(Instruction::LoadConst { dest, value });
        ctx.func.set_register_type(dest, ty.as_str());
        return Ok((dest, ty));
    }

    let (obj_vr, obj_ty) = ctx
        .scopes
        .lookup(base)
        .ok_or_else(|| BuildError::UnresolvedSymbol(fq.clone()))?;
    let idx = ctx
        .structs
        .field_index(&obj_ty, field)
        .ok_or_else(|| BuildError::UnresolvedSymbol(fq))?;
    let dest = ctx.func.new_register();
    ctx.func.add_instruction(Instruction::Call {
        dest: Some(dest),
        target: INDEX_CALLEE.to_string(),
        args: smallvec![Operand::Reg(obj_vr), Operand::Const(ConstantValue::I32(idx as i32))],
    });
    ctx.func.set_register_type(dest, "Ref");
    Ok((dest, "Ref".to_string()))
}

fn lower_index(ctx: &mut FnCtx, base: &Expr, index: &Expr) -> BuildResult<(VReg, String)> {
    let (obj_vr, _) = lower_expr(ctx, base)?;
    let (idx_operand, _) = lower_operand(ctx, index)?;
    let dest = ctx.func.new_register();
    ctx.func.add_instruction(Instruction::Call {
        dest: Some(dest),
        target: INDEX_CALLEE.to_string(),
        args: smallvec![Operand::Reg(obj_vr), idx_operand],
    });
    ctx.func.set_register_type(dest, "Ref");
    Ok((dest, "Ref".to_string()))
}

fn cmp_sym(op: BinarySym) -> Option<CmpOp> {
    match op {
        BinarySym::Eq => Some(CmpOp::Eq),
        BinarySym::Ne => Some(CmpOp::Ne),
        BinarySym::Lt => Some(CmpOp::Lt),
        BinarySym::Gt => Some(CmpOp::Gt),
        BinarySym::Le => Some(CmpOp::Le),
        BinarySym::Ge => Some(CmpOp::Ge),
        _ => None,
    }
}

fn lower_binary(ctx: &mut FnCtx, op: BinarySym, lhs: &Expr, rhs: &Expr) -> BuildResult<(VReg, String)> {
    let (lop, lty) = lower_operand(ctx, lhs)?;
    let (rop, rty) = lower_operand(ctx, rhs)?;
    let lwidth = width_of_type_name(&lty);
    let rwidth = width_of_type_name(&rty);

    let binop = match cmp_sym(op) {
        Some(cmp) => BinOp::Cmp(cmp),
        None => match op {
            BinarySym::Add => BinOp::Add,
            BinarySym::Sub => BinOp::Sub,
            BinarySym::Mul => BinOp::Mul,
            BinarySym::Div => BinOp::Div,
            BinarySym::Mod => BinOp::Mod,
            BinarySym::And => BinOp::And,
            BinarySym::Or => BinOp::Or,
            BinarySym::Xor => BinOp::Xor,
            _ => unreachable!("comparison symbols handled above"),
        },
    };

    // Reference-addition disambiguation (§8 scenario 5): if either side of
    // a `+` is string/reference typed, the whole operation takes the `R`
    // path regardless of the other operand's declared width.
    let width = if matches!(binop, BinOp::Add) && (lwidth == Width::Str || rwidth == Width::Str || lwidth == Width::Ref || rwidth == Width::Ref) {
        Width::Ref
    } else {
        widen(lwidth, rwidth)
    };

    let dest = ctx.func.new_register();
    ctx.func.add_instruction(Instruction::BinaryOp {
        op: binop,
        width,
        dest,
        lhs: lop,
        rhs: rop,
    });
    let result_ty = if binop.is_cmp() {
        "bool".to_string()
    } else {
        type_name_of_width(width)
    };
    ctx.func.set_register_type(dest, result_ty.as_str());
    Ok((dest, result_ty))
}

fn lower_unary(ctx: &mut FnCtx, op: UnarySym, operand: &Expr) -> BuildResult<(VReg, String)> {
    let (opnd, ty) = lower_operand(ctx, operand)?;
    let width = width_of_type_name(&ty);
    let unop = match op {
        UnarySym::Neg => UnOp::Neg,
        UnarySym::Inc => UnOp::Inc,
    };
    let dest = ctx.func.new_register();
    ctx.func.add_instruction(Instruction::UnaryOp {
        op: unop,
        width,
        dest,
        src: opnd,
    });
    ctx.func.set_register_type(dest, ty.as_str());
    Ok((dest, ty))
}

fn lower_array_literal(ctx: &mut FnCtx, items: &[Expr]) -> BuildResult<(VReg, String)> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Expr::Const(c) => values.push(c.clone()),
            other => {
                return Err(BuildError::InvalidAstShape(format!(
                    "array literal element must be a constant, got {other:?}"
                )))
            }
        }
    }
    let dest = ctx.func.new_register();
    ctx.func
        .add_instruction(Instruction::LoadConst { dest, value: ConstantValue::List(values) });
    ctx.func.set_register_type(dest, "Ref");
    Ok((dest, "Ref".to_string()))
}

/// Emits the `Call` instruction. The destination is `None` exactly when the
/// global function table reports a `void` return type for `target` — this
/// is the IR-level consulter of that table; the backend's separate,
/// documented-unsound return-type heuristic (§4.3, §9 Open Question 1) is
/// only about which `<T>_STORE` to pick for a *non-void* call's result.
fn lower_call_instr(ctx: &mut FnCtx, target: &str, args: &[Expr]) -> BuildResult<Option<(VReg, String)>> {
    let mut arg_operands: SmallVec<[Operand; 4]> = SmallVec::new();
    for arg in args {
        let (op, _) = lower_operand(ctx, arg)?;
        arg_operands.push(op);
    }
    let ret_type = ctx.functions.return_type_of(target);
    let is_void = ret_type.as_deref() == Some("void");
    let dest = if is_void { None } else { Some(ctx.func.new_register()) };
    ctx.func.add_instruction(Instruction::Call {
        dest,
        target: target.to_string(),
        args: arg_operands,
    });
    Ok(dest.map(|d| {
        let ty = ret_type.unwrap_or_default();
        if !ty.is_empty() {
            ctx.func.set_register_type(d, ty.as_str());
        }
        (d, ty)
    }))
}
