//! Operator enums for the annotated AST.
//!
//! Structured Text expressions use the grouped [`LogicOp`], [`CmpOp`],
//! [`ArithOp`], and [`UnaryOp`] sub-enums. Instruction List has its own
//! vocabulary: [`IlSimpleOp`] for the simple and expression operators,
//! [`IlCallOp`] for FB call operators, and [`IlJumpOp`]/[`IlReturnOp`] for
//! flow control.

use serde::{Deserialize, Serialize};

/// Binary logical operators (`OR`, `XOR`, `AND`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// `<`, `<=`, `>`, `>=` -- the operators restricted to ANY_ELEMENTARY
    /// operands.
    pub fn is_ordering(self) -> bool {
        matches!(self, CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge)
    }
}

/// Binary arithmetic operators, including `MOD` and `**`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Power,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// IL operators that pass the current value to a named input of an FB
/// instance, implicitly calling it (`CLK ton1` ≡ `CAL ton1(CLK := cv)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FbParamOp {
    S1,
    R1,
    Clk,
    Cu,
    Cd,
    Pv,
    In,
    Pt,
}

impl FbParamOp {
    /// The FB input the current value is assigned to.
    pub fn input_name(self) -> &'static str {
        match self {
            FbParamOp::S1 => "S1",
            FbParamOp::R1 => "R1",
            FbParamOp::Clk => "CLK",
            FbParamOp::Cu => "CU",
            FbParamOp::Cd => "CD",
            FbParamOp::Pv => "PV",
            FbParamOp::In => "IN",
            FbParamOp::Pt => "PT",
        }
    }
}

/// IL simple and expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IlSimpleOp {
    Ld,
    Ldn,
    St,
    Stn,
    S,
    R,
    Not,
    And,
    Andn,
    Or,
    Orn,
    Xor,
    Xorn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Ge,
    Eq,
    Lt,
    Le,
    Ne,
    /// Implicit FB call operators (`S1`, `R1`, `CLK`, `CU`, `CD`, `PV`,
    /// `IN`, `PT`).
    FbParam(FbParamOp),
}

/// IL FB call operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IlCallOp {
    Cal,
    Calc,
    Calcn,
}

/// IL jump operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IlJumpOp {
    Jmp,
    Jmpc,
    Jmpcn,
}

/// IL return operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IlReturnOp {
    Ret,
    Retc,
    Retcn,
}
