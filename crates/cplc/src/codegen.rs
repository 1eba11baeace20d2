//! In-memory instruction buffer with backpatching (§4.F).
//!
//! Instructions are appended only; `backpatch` mutates an already-emitted
//! operand but never the opcode and never changes the address count. The
//! buffer's fixed capacity is a deliberate relaxation point: the original
//! treats reaching capacity as fatal (a compile-time program-size limit).
//! We keep that behaviour by default but make the limit a
//! [`crate::config::CompilerConfig`] setting rather than a hardcoded
//! constant, and expose `unbounded()` for callers that want a growable
//! buffer instead — see DESIGN.md for the relaxation note.

use crate::diagnostics::FatalError;

/// Default fixed capacity, matching the original's compile-time limit.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mult,
    Div,
    Neg,
    Write,

    Br,
    Bgz,
    Bg,
    Blz,
    Bl,
    Bz,
    Bnz,
    Call,
    Ldp,
    Rdp,
    Inc,
    Dec,

    LoadImmediate,
    LoadAbsolute,
    StoreAbsolute,
    LoadFp,
    StoreFp,
    LoadSp,
    StoreSp,
    ReadAbsolute,
    ReadFp,
    ReadSp,
}

impl Opcode {
    fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Add => "Add",
            Sub => "Sub",
            Mult => "Mult",
            Div => "Div",
            Neg => "Neg",
            Write => "Write",
            Br => "Br",
            Bgz => "Bgz",
            Bg => "Bg",
            Blz => "Blz",
            Bl => "Bl",
            Bz => "Bz",
            Bnz => "Bnz",
            Call => "Call",
            Ldp => "Ldp",
            Rdp => "Rdp",
            Inc => "Inc",
            Dec => "Dec",
            LoadImmediate | LoadAbsolute | LoadFp | LoadSp => "Load",
            StoreAbsolute | StoreFp | StoreSp => "Store",
            ReadAbsolute | ReadFp | ReadSp => "Read",
        }
    }

    /// Negation used by `ParseBooleanExpression`: the user's relational
    /// operator is replaced by the branch that fires when the test
    /// *fails*, so the compiled code can jump past the guarded body.
    pub fn negated_branch(relop: RelOp) -> Opcode {
        match relop {
            RelOp::LessEqual => Opcode::Bg,
            RelOp::GreaterEqual => Opcode::Bl,
            RelOp::Less => Opcode::Bgz,
            RelOp::Equal => Opcode::Bnz,
            RelOp::Greater => Opcode::Blz,
        }
    }
}

/// The five relational operators `BoolExpr` can carry (§4.G grammar).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Equal,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: i64,
}

/// An instruction address returned by `emit`/`current_address`, used by
/// the parser as a backpatch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CodeAddress(pub usize);

pub struct CodeBuffer {
    instructions: Vec<Instruction>,
    capacity: Option<usize>,
    errors_present: bool,
}

impl CodeBuffer {
    /// A buffer with the original's fixed, overflow-is-fatal capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        CodeBuffer {
            instructions: Vec::with_capacity(capacity.min(4096)),
            capacity: Some(capacity),
            errors_present: false,
        }
    }

    /// A growable buffer that never overflows. Documented relaxation of
    /// the original's fixed-size program limit (§9).
    pub fn unbounded() -> Self {
        CodeBuffer {
            instructions: Vec::new(),
            capacity: None,
            errors_present: false,
        }
    }

    pub fn current_address(&self) -> CodeAddress {
        CodeAddress(self.instructions.len())
    }

    pub fn emit(&mut self, opcode: Opcode, operand: i64) -> Result<CodeAddress, FatalError> {
        if let Some(capacity) = self.capacity {
            if self.instructions.len() >= capacity {
                return Err(FatalError::CodeBufferOverflow { capacity });
            }
        }
        let address = self.current_address();
        self.instructions.push(Instruction { opcode, operand });
        Ok(address)
    }

    /// Overwrites the operand at `address`. The opcode is untouched.
    pub fn backpatch(&mut self, address: CodeAddress, operand: i64) -> Result<(), FatalError> {
        let slot = self.instructions.get_mut(address.0).ok_or(FatalError::BackpatchOutOfRange {
            address: address.0,
            limit: self.instructions.len(),
        })?;
        slot.operand = operand;
        Ok(())
    }

    pub fn opcode_at(&self, address: CodeAddress) -> Option<Opcode> {
        self.instructions.get(address.0).map(|i| i.opcode)
    }

    pub fn kill_output(&mut self) {
        self.errors_present = true;
    }

    pub fn errors_present(&self) -> bool {
        self.errors_present
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Renders the textual assembly listing. If `errors_present` was ever
    /// set, the listing is replaced by the two-line error banner and no
    /// code is shown, even though in-memory emission proceeded.
    pub fn render(&self) -> String {
        if self.errors_present {
            return ";; Errors detected in input file, no code\n;; generated\n".to_string();
        }
        let mut out = String::new();
        for (addr, instr) in self.instructions.iter().enumerate() {
            out.push_str(&format_instruction(addr, *instr));
            out.push('\n');
        }
        out
    }
}

fn format_instruction(addr: usize, instr: Instruction) -> String {
    use Opcode::*;
    let mnemonic = instr.opcode.mnemonic();
    match instr.opcode {
        Add | Sub | Mult | Div | Neg | Write => {
            format!("{addr:>3}  {mnemonic}")
        }
        Br | Bgz | Bg | Blz | Bl | Bz | Bnz | Call | Ldp | Rdp | Inc | Dec => {
            format!("{addr:>3}  {mnemonic} {}", instr.operand)
        }
        LoadImmediate => format!("{addr:>3}  {mnemonic} #{}", instr.operand),
        LoadAbsolute | StoreAbsolute | ReadAbsolute => {
            format!("{addr:>3}  {mnemonic} {}", instr.operand)
        }
        LoadFp | StoreFp | ReadFp => format!("{addr:>3}  {}", format_relative(mnemonic, "FP", instr.operand)),
        LoadSp | StoreSp | ReadSp => {
            format!("{addr:>3}  {}", format_relative(mnemonic, "[SP]", instr.operand))
        }
    }
}

fn format_relative(mnemonic: &str, base: &str, offset: i64) -> String {
    match offset.cmp(&0) {
        std::cmp::Ordering::Equal => format!("{mnemonic} {base}"),
        std::cmp::Ordering::Greater => format!("{mnemonic} {base}+{offset}"),
        // A negative offset already renders with its own sign.
        std::cmp::Ordering::Less => format!("{mnemonic} {base}{offset}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_addresses() {
        let mut buf = CodeBuffer::unbounded();
        let a0 = buf.emit(Opcode::LoadImmediate, 3).unwrap();
        let a1 = buf.emit(Opcode::LoadImmediate, 4).unwrap();
        assert_eq!(a0, CodeAddress(0));
        assert_eq!(a1, CodeAddress(1));
        assert_eq!(buf.current_address(), CodeAddress(2));
    }

    #[test]
    fn backpatch_preserves_opcode() {
        let mut buf = CodeBuffer::unbounded();
        let addr = buf.emit(Opcode::Bnz, 0).unwrap();
        let before = buf.opcode_at(addr);
        buf.backpatch(addr, 42).unwrap();
        let after = buf.opcode_at(addr);
        assert_eq!(before, after);
        assert_eq!(buf.instructions()[addr.0].operand, 42);
    }

    #[test]
    fn overflow_is_fatal_with_fixed_capacity() {
        let mut buf = CodeBuffer::with_capacity(1);
        buf.emit(Opcode::Add, 0).unwrap();
        let err = buf.emit(Opcode::Add, 0).unwrap_err();
        assert_eq!(err, FatalError::CodeBufferOverflow { capacity: 1 });
    }

    #[test]
    fn backpatch_out_of_range_is_fatal() {
        let mut buf = CodeBuffer::unbounded();
        let err = buf.backpatch(CodeAddress(5), 1).unwrap_err();
        assert_eq!(
            err,
            FatalError::BackpatchOutOfRange { address: 5, limit: 0 }
        );
    }

    #[test]
    fn errors_present_suppresses_listing() {
        let mut buf = CodeBuffer::unbounded();
        buf.emit(Opcode::Add, 0).unwrap();
        buf.kill_output();
        assert_eq!(
            buf.render(),
            ";; Errors detected in input file, no code\n;; generated\n"
        );
    }

    #[test]
    fn formats_frame_pointer_relative() {
        assert_eq!(format_relative("Load", "FP", 0), "Load FP");
        assert_eq!(format_relative("Load", "FP", 3), "Load FP+3");
        assert_eq!(format_relative("Load", "FP", -2), "Load FP-2");
        assert_eq!(format_relative("Load", "[SP]", 1), "Load [SP]+1");
    }
}
