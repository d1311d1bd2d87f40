//! The interpreter loop: decode one line, execute its handler, advance the
//! program counter. Generalizes the teacher's `Runtime` (environment stack +
//! call stack pairing, push/pop frame around a call) into a flat `pc`-driven
//! loop instead of tree-walking evaluation, since the VM executes linear
//! text rather than an AST.

use log::trace;

use crate::config::VmConfig;
use crate::decode::{classify, split_opcode, OpKind};
use crate::error::{FaultKind, VmResult};
use crate::frame::Frame;
use crate::literal::parse_literal;
use crate::registries::Resources;
use crate::syscall::SyscallTable;
use crate::value::{self, Value};

/// `None` is the `PROGRAM_END` sentinel: the root frame returning, or a
/// `HALT`, both terminate the run by producing this pc.
pub type NextPc = Option<usize>;

pub struct Engine {
    program: Vec<String>,
    call_stack: Vec<Frame>,
    pc: usize,
    pub resources: Resources,
    syscalls: SyscallTable,
    config: VmConfig,
}

impl Engine {
    pub fn new(program: Vec<String>, config: VmConfig) -> Self {
        let resources = Resources::new(config.first_user_fd);
        Self {
            program,
            call_stack: vec![Frame::new(0, None)],
            pc: 0,
            resources,
            syscalls: SyscallTable::default(),
            config,
        }
    }

    fn frame(&mut self) -> &mut Frame {
        self.call_stack.last_mut().expect("root frame is never popped while running")
    }

    /// Pushes onto the active frame's operand stack, enforcing
    /// `operand_stack_limit` so a runaway program faults instead of growing
    /// the host's heap without bound.
    fn push_value(&mut self, v: Value) -> VmResult<()> {
        let limit = self.config.operand_stack_limit;
        if self.frame().operand_stack_len() >= limit {
            return Err(FaultKind::StackOverflow(limit));
        }
        self.frame().push(v);
        Ok(())
    }

    /// Runs until `HALT` or the root frame returns. Returns the final
    /// exit value left on the root frame's operand stack, if any.
    pub fn run(&mut self) -> VmResult<Option<Value>> {
        loop {
            match self.step()? {
                Some(next) => self.pc = next,
                None => break,
            }
        }
        let root = self.call_stack.first().expect("root frame always exists");
        Ok(if root.operand_stack_len() > 0 {
            Some(self.call_stack[0].pop()?)
        } else {
            None
        })
    }

    /// Executes the instruction at the current `pc`, returning the next
    /// `pc` (`None` means `PROGRAM_END`).
    pub fn step(&mut self) -> VmResult<NextPc> {
        let line = self
            .program
            .get(self.pc)
            .ok_or(FaultKind::LinkError(self.pc as i64))?
            .clone();

        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            return Ok(Some(self.pc + 1));
        }

        let (opcode, rest) = split_opcode(&line).ok_or(FaultKind::LinkError(self.pc as i64))?;
        let kind = classify(opcode)?;

        if self.config.trace_instructions {
            trace!("pc={} {}", self.pc, line);
        }

        self.execute(kind, rest)
    }

    fn execute(&mut self, kind: OpKind, rest: &str) -> VmResult<NextPc> {
        match kind {
            OpKind::Push(width) => {
                let v = if width == snow_common::Width::Ref {
                    parse_literal(rest)?
                } else {
                    parse_typed_atom(width, rest)?
                };
                self.push_value(v)?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Load(_width) => {
                let slot: usize = parse_operand(rest)?;
                let v = self.frame().load(slot)?;
                self.push_value(v)?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Store(_width) => {
                let slot: usize = parse_operand(rest)?;
                let v = self.frame().pop()?;
                self.frame().store(slot, v);
                Ok(Some(self.pc + 1))
            }

            OpKind::Binary(mnemonic, _width) => {
                let right = self.frame().pop()?;
                let left = self.frame().pop()?;
                let result = if _width == snow_common::Width::Ref {
                    match mnemonic {
                        "ADD" => value::ref_add(left, right)?,
                        other => {
                            return Err(FaultKind::InvalidInstruction(
                                other.to_string(),
                                "not defined over reference width".to_string(),
                            ))
                        }
                    }
                } else {
                    value::binary_numeric(mnemonic, left, right)?
                };
                self.push_value(result)?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Unary(mnemonic, _width) => {
                let v = self.frame().pop()?;
                let result = value::unary_numeric(mnemonic, v)?;
                self.push_value(result)?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Compare(code, width) => {
                let right = self.frame().pop()?;
                let left = self.frame().pop()?;
                let holds = if width == snow_common::Width::Ref && (code == "EQ" || code == "NE") {
                    let eq = value::ref_equals(&left, &right);
                    if code == "EQ" {
                        eq
                    } else {
                        !eq
                    }
                } else {
                    value::compare(code, &left, &right)?
                };
                if holds {
                    let target: usize = parse_operand(rest)?;
                    Ok(Some(target))
                } else {
                    Ok(Some(self.pc + 1))
                }
            }

            OpKind::Convert(_from, to) => {
                let v = self.frame().pop()?;
                let converted = value::convert(v, to.tag())?;
                self.push_value(converted)?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Mov => {
                let mut parts = rest.split_whitespace();
                let dest: usize = next_operand(&mut parts)?;
                let src: usize = next_operand(&mut parts)?;
                self.frame().mov(dest, src)?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Jump => {
                let target: usize = parse_operand(rest)?;
                Ok(Some(target))
            }

            OpKind::Call => {
                let mut parts = rest.split_whitespace();
                let target: usize = next_operand(&mut parts)?;
                let argc: usize = next_operand(&mut parts)?;

                if self.call_stack.len() >= self.config.call_stack_limit {
                    return Err(FaultKind::StackOverflow(self.config.call_stack_limit));
                }

                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(self.frame().pop()?);
                }
                args.reverse();

                let mut callee = Frame::new(argc, Some(self.pc + 1));
                for (i, arg) in args.into_iter().enumerate() {
                    callee.store(i, arg);
                }
                self.call_stack.push(callee);
                Ok(Some(target))
            }

            OpKind::Ret => {
                let mut finished = self.call_stack.pop().expect("RET executes inside a pushed frame");
                // The callee's return value (if any) was left on its own
                // operand stack by the `<T>_LOAD`-then-RET sequence; carry it
                // down onto the caller's stack before discarding the frame.
                let retval = if finished.operand_stack_len() > 0 { Some(finished.pop()?) } else { None };
                if self.call_stack.is_empty() {
                    // The root frame returning is PROGRAM_END; keep its
                    // operand stack around for `run()`'s exit-value read.
                    if let Some(v) = retval {
                        finished.push(v);
                    }
                    self.call_stack.push(finished);
                    return Ok(None);
                }
                if let Some(v) = retval {
                    self.push_value(v)?;
                }
                Ok(finished.return_addr)
            }

            OpKind::Halt => Ok(None),

            OpKind::Syscall => {
                let mut parts = rest.split_whitespace();
                let call_id: i64 = next_operand(&mut parts)?;
                let argc = parts.clone().count();
                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(self.frame().pop()?);
                }
                args.reverse();
                let results = self.syscalls.call(call_id, &self.resources, &args)?;
                for r in results {
                    self.push_value(r)?;
                }
                Ok(Some(self.pc + 1))
            }

            OpKind::Pop => {
                self.frame().pop()?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Dup => {
                let v = self.frame().pop()?;
                self.push_value(v.clone())?;
                self.push_value(v)?;
                Ok(Some(self.pc + 1))
            }

            OpKind::Swap => {
                let a = self.frame().pop()?;
                let b = self.frame().pop()?;
                self.frame().push(a);
                self.frame().push(b);
                Ok(Some(self.pc + 1))
            }
        }
    }

    /// A post-mortem snapshot of the running state: the current frame's
    /// operand stack and locals, plus a return-address summary of every
    /// frame on the call stack (root first). Used to render the fault
    /// report a crashed program leaves behind.
    pub fn dump_state(&self) -> serde_json::Value {
        let top = self.call_stack.last().expect("root frame is never popped while running");
        serde_json::json!({
            "pc": self.pc,
            "call_depth": self.call_stack.len(),
            "operand_stack": top.operand_stack(),
            "locals": top.locals(),
            "call_stack": self.call_stack.iter().map(|f| f.return_addr).collect::<Vec<_>>(),
        })
    }
}

fn parse_operand<T: std::str::FromStr>(rest: &str) -> VmResult<T> {
    rest.trim()
        .parse()
        .map_err(|_| FaultKind::InvalidInstruction("operand".to_string(), rest.to_string()))
}

fn next_operand<'a, T: std::str::FromStr>(parts: &mut impl Iterator<Item = &'a str>) -> VmResult<T> {
    parts
        .next()
        .ok_or_else(|| FaultKind::InvalidInstruction("operand".to_string(), "missing".to_string()))?
        .parse()
        .map_err(|_| FaultKind::InvalidInstruction("operand".to_string(), "malformed".to_string()))
}

fn parse_typed_atom(width: snow_common::Width, text: &str) -> VmResult<Value> {
    use snow_common::Width::*;
    let text = text.trim();
    let err = || FaultKind::InvalidInstruction("PUSH".to_string(), text.to_string());
    Ok(match width {
        B8 => Value::B8(text.parse().map_err(|_| err())?),
        S16 => Value::S16(text.parse().map_err(|_| err())?),
        I32 => Value::I32(text.parse().map_err(|_| err())?),
        L64 => Value::L64(text.parse().map_err(|_| err())?),
        F32 => Value::F32(text.parse().map_err(|_| err())?),
        D64 => Value::D64(text.parse().map_err(|_| err())?),
        Bool => Value::Bool(text.parse().map_err(|_| err())?),
        Str | Ref | List => return Err(err()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_program;

    fn run_text(text: &str) -> Option<Value> {
        let program = parse_program(text);
        let mut engine = Engine::new(program, VmConfig::default());
        engine.run().unwrap()
    }

    #[test]
    fn constant_return_leaves_value_on_stack() {
        let result = run_text("PUSH_I32 6\nHALT");
        assert_eq!(result, Some(Value::I32(6)));
    }

    #[test]
    fn move_then_halt() {
        let result = run_text("PUSH_I32 9\nSTORE_I32 0\nLOAD_I32 0\nMOV 1 0\nLOAD_I32 1\nHALT");
        assert_eq!(result, Some(Value::I32(9)));
    }

    #[test]
    fn addition_computes_correctly() {
        let result = run_text("PUSH_I32 2\nPUSH_I32 3\nADD_I32\nHALT");
        assert_eq!(result, Some(Value::I32(5)));
    }

    #[test]
    fn comparison_branch_skips_false_arm() {
        // 3 < 5 -> true: CMP_ILT branches to line 5 (PUSH_I32 1), skipping
        // the PUSH_I32 0 / JUMP pair, matching the backend's comparison-as-
        // value dance.
        let text = "\
PUSH_I32 3
PUSH_I32 5
CMP_ILT 5
PUSH_I32 0
JUMP 6
PUSH_I32 1
HALT";
        let result = run_text(text);
        assert_eq!(result, Some(Value::I32(1)));
    }

    #[test]
    fn call_and_return_round_trip_an_argument() {
        // _start: push 41, call helper(argc=1) at line 3, halt with result.
        // helper: load local 0, push 1, add, return.
        let text = "\
PUSH_I32 41
STORE_I32 0
LOAD_I32 0
CALL 5 1
HALT
LOAD_I32 0
PUSH_I32 1
ADD_I32
RET";
        let result = run_text(text);
        assert_eq!(result, Some(Value::I32(42)));
    }

    #[test]
    fn division_by_zero_faults() {
        let program = parse_program("PUSH_I32 1\nPUSH_I32 0\nDIV_I32\nHALT");
        let mut engine = Engine::new(program, VmConfig::default());
        assert!(matches!(engine.run(), Err(FaultKind::DivisionByZero)));
    }

    #[test]
    fn blank_and_comment_lines_do_not_shift_addressing() {
        let text = "\
# a comment

JUMP 4
HALT
PUSH_I32 1
HALT";
        let result = run_text(text);
        assert_eq!(result, Some(Value::I32(1)));
    }

    #[test]
    fn operand_stack_limit_triggers_stack_overflow() {
        let program = parse_program("PUSH_I32 1\nJUMP 0");
        let mut config = VmConfig::default();
        config.operand_stack_limit = 4;
        let mut engine = Engine::new(program, config);
        assert!(matches!(engine.run(), Err(FaultKind::StackOverflow(4))));
    }

    #[test]
    fn dump_state_reports_operand_stack_locals_and_call_stack() {
        let program = parse_program("PUSH_I32 7\nPUSH_I32 8\nHALT");
        let mut engine = Engine::new(program, VmConfig::default());
        engine.pc = engine.step().unwrap().unwrap();
        engine.pc = engine.step().unwrap().unwrap();
        let dump = engine.dump_state();
        assert_eq!(dump["pc"], 2);
        assert_eq!(dump["call_depth"], 1);
        assert_eq!(
            dump["operand_stack"],
            serde_json::json!([{"I32": 7}, {"I32": 8}])
        );
        assert_eq!(dump["call_stack"], serde_json::json!([null]));
    }
}
