//! The instruction set.
//!
//! Chunks are a flat byte stream, not a `Vec` of this enum: jump targets
//! are patched in place after the jump's destination is known, which needs
//! a mutable byte buffer rather than a sequence of already-sized enum
//! values. `OpCode` exists to give the numeric opcodes names and a
//! checked `TryFrom<u8>`; the compiler and VM otherwise work in raw bytes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Constant = 0,
    Nil,
    True,
    False,
    Pop,
    GetLocal,
    SetLocal,
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    GetUpvalue,
    SetUpvalue,
    GetProperty,
    SetProperty,
    GetSuper,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    Jump,
    JumpIfFalse,
    Loop,
    Call,
    Invoke,
    SuperInvoke,
    Closure,
    CloseUpvalue,
    Return,
    Class,
    Inherit,
    Method,
}

impl OpCode {
    /// Number of operand bytes that follow the opcode byte itself. `Closure`
    /// is variable-length (one constant index plus two bytes per upvalue)
    /// and is handled specially by callers; this covers only its fixed
    /// leading constant index.
    pub fn operand_len(self) -> usize {
        use OpCode::*;
        match self {
            Nil | True | False | Pop | Equal | Greater | Less | Add | Subtract | Multiply | Divide | Not | Negate | Print
            | CloseUpvalue | Return | Inherit => 0,
            Constant | GetLocal | SetLocal | GetGlobal | DefineGlobal | SetGlobal | GetUpvalue | SetUpvalue | GetProperty
            | SetProperty | GetSuper | Call | Closure | Class | Method => 1,
            Jump | JumpIfFalse | Loop | Invoke | SuperInvoke => 2,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use OpCode::*;
        match self {
            Constant => "OP_CONSTANT",
            Nil => "OP_NIL",
            True => "OP_TRUE",
            False => "OP_FALSE",
            Pop => "OP_POP",
            GetLocal => "OP_GET_LOCAL",
            SetLocal => "OP_SET_LOCAL",
            GetGlobal => "OP_GET_GLOBAL",
            DefineGlobal => "OP_DEFINE_GLOBAL",
            SetGlobal => "OP_SET_GLOBAL",
            GetUpvalue => "OP_GET_UPVALUE",
            SetUpvalue => "OP_SET_UPVALUE",
            GetProperty => "OP_GET_PROPERTY",
            SetProperty => "OP_SET_PROPERTY",
            GetSuper => "OP_GET_SUPER",
            Equal => "OP_EQUAL",
            Greater => "OP_GREATER",
            Less => "OP_LESS",
            Add => "OP_ADD",
            Subtract => "OP_SUBTRACT",
            Multiply => "OP_MULTIPLY",
            Divide => "OP_DIVIDE",
            Not => "OP_NOT",
            Negate => "OP_NEGATE",
            Print => "OP_PRINT",
            Jump => "OP_JUMP",
            JumpIfFalse => "OP_JUMP_IF_FALSE",
            Loop => "OP_LOOP",
            Call => "OP_CALL",
            Invoke => "OP_INVOKE",
            SuperInvoke => "OP_SUPER_INVOKE",
            Closure => "OP_CLOSURE",
            CloseUpvalue => "OP_CLOSE_UPVALUE",
            Return => "OP_RETURN",
            Class => "OP_CLASS",
            Inherit => "OP_INHERIT",
            Method => "OP_METHOD",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = crate::error::Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use OpCode::*;
        const TABLE: &[OpCode] = &[
            Constant, Nil, True, False, Pop, GetLocal, SetLocal, GetGlobal, DefineGlobal, SetGlobal, GetUpvalue, SetUpvalue,
            GetProperty, SetProperty, GetSuper, Equal, Greater, Less, Add, Subtract, Multiply, Divide, Not, Negate, Print, Jump,
            JumpIfFalse, Loop, Call, Invoke, SuperInvoke, Closure, CloseUpvalue, Return, Class, Inherit, Method,
        ];
        TABLE.get(byte as usize).copied().ok_or(crate::error::Error::InvalidOpcode(byte))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_round_trips_through_its_byte() {
        for byte in 0..=(OpCode::Method as u8) {
            let op = OpCode::try_from(byte).unwrap();
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    fn byte_past_the_table_is_rejected() {
        assert!(OpCode::try_from(255).is_err());
    }
}
