use snow_common::Width;

/// Comparison kind shared by value-producing `BinaryOp(Cmp(..))` and
/// control-flow `CompareJump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    /// Two-letter code used in the `CMP_<width><code>` family, e.g. `IEQ`,
    /// `LLT`, `REQ`.
    pub fn code(self) -> &'static str {
        match self {
            CmpOp::Eq => "EQ",
            CmpOp::Ne => "NE",
            CmpOp::Lt => "LT",
            CmpOp::Gt => "GT",
            CmpOp::Le => "LE",
            CmpOp::Ge => "GE",
        }
    }
}

/// `BinaryOp` discriminant. Arithmetic and bitwise members take a `Width`
/// from the owning instruction and print as `<MNEMONIC>_<width>` (`ADD_I32`);
/// `Cmp` prints as `CMP_<widthLetter><code>` (`CMP_ILT`), matching §4.0's
/// "one value per (operation, element-type) combination" opcode vocabulary
/// without hand-writing the full cartesian product as separate variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Cmp(CmpOp),
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "ADD",
            BinOp::Sub => "SUB",
            BinOp::Mul => "MUL",
            BinOp::Div => "DIV",
            BinOp::Mod => "MOD",
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::Xor => "XOR",
            BinOp::Cmp(_) => "CMP",
        }
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Xor)
    }

    pub fn is_cmp(self) -> bool {
        matches!(self, BinOp::Cmp(_))
    }
}

/// `UnaryOp` discriminant (§4.0 arithmetic family: `NEG`, `INC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Inc,
}

impl UnOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnOp::Neg => "NEG",
            UnOp::Inc => "INC",
        }
    }
}

/// `<Src>2<Dst>` numeric conversion opcode, used by the backend when
/// widening an operand to the promoted type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conversion {
    pub from: Width,
    pub to: Width,
}

impl Conversion {
    pub fn new(from: Width, to: Width) -> Self {
        Conversion { from, to }
    }

    pub fn mnemonic(self) -> String {
        format!("{}2{}", self.from.tag(), self.to.tag())
    }
}

/// The full IR-level opcode name for a `BinaryOp`, e.g. `ADD_I32`,
/// `CMP_ILT`, `ADD_R`.
pub fn binary_opcode_name(op: BinOp, width: Width) -> String {
    match op {
        BinOp::Cmp(cmp) => format!("CMP_{}{}", width.tag(), cmp.code()),
        _ => format!("{}_{}", op.mnemonic(), width_suffix(width)),
    }
}

/// The full IR-level opcode name for a `UnaryOp`, e.g. `NEG_I32`.
pub fn unary_opcode_name(op: UnOp, width: Width) -> String {
    format!("{}_{}", op.mnemonic(), width_suffix(width))
}

/// Full-width suffix (`B8`, `S16`, `I32`, `L64`, `F32`, `D64`, `R`) as used
/// in arithmetic/bitwise opcode names. Distinct from `Width::tag`, which
/// returns the single-letter slot-type tag used for `PUSH`/`LOAD`/`STORE`.
pub fn width_suffix(width: Width) -> &'static str {
    match width {
        Width::B8 => "B8",
        Width::S16 => "S16",
        Width::I32 => "I32",
        Width::L64 => "L64",
        Width::F32 => "F32",
        Width::D64 => "D64",
        Width::Bool => "I32",
        Width::Str | Width::Ref | Width::List => "R",
    }
}
