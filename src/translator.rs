use std::collections::BTreeSet;

use crate::{
    ast::{ArithmeticOp, Command, Command::*, Segment},
    error::CodegenError,
    labels::LabelAllocator,
    segments::{Location, SegmentResolver, MAX_CONSTANT},
};

/// Where `SP` points once the bootstrap has run.
pub const STACK_BASE: u16 = 256;
/// Words a call site pushes before jumping: return address, LCL, ARG, THIS, THAT.
pub const FRAME_SIZE: u16 = 5;

macro_rules! svec {
    ($($x:expr),* $(,)?) => (vec![$($x.to_string()),*]);
}

fn at_c(arg: u16) -> String {
    format!("@{arg}", arg = arg)
}

fn at_s(arg: &str) -> String {
    format!("@{arg}", arg = arg)
}

fn def(label: &str) -> String {
    format!("({})", label)
}

/// Pushes D
fn push_d() -> Vec<String> {
    svec![
        "@SP",
        "M=M+1",
        "A=M-1", // Don't need to refetch SP; this is safe
        "M=D"
    ]
}

fn push_constant(value: u16) -> Vec<String> {
    let mut out = svec![at_c(value), "D=A"];
    out.extend(push_d());
    out
}

/// Push microcode for the four based segments
fn seg_push(base: &str, offset: u16) -> Vec<String> {
    let mut out = svec![
        at_s(base),
        "D=M",
        at_c(offset),
        "A=D+A", // A = SEG+offset
        "D=M"    // D = value to push
    ];
    out.extend(push_d());
    out
}

fn seg_push_direct(symbol: &str) -> Vec<String> {
    let mut out = svec![at_s(symbol), "D=M"];
    out.extend(push_d());
    out
}

fn seg_pop(base: &str, offset: u16) -> Vec<String> {
    svec![
        at_s(base),
        "D=M",
        at_c(offset),
        "D=D+A", // D = SEG+offset
        "@R13",
        "M=D", // Store target addr in R13
        "@SP",
        "AM=M-1", // SP--, A <- new SP (val to be popped)
        "D=M",
        "@R13",
        "A=M", // At the target address...
        "M=D"  // ... store the popped val
    ]
}

fn seg_pop_direct(symbol: &str) -> Vec<String> {
    svec!["@SP", "AM=M-1", "D=M", at_s(symbol), "M=D"]
}

fn simple_un_op(comp: &str) -> Vec<String> {
    svec!["@SP", "A=M-1", format!("M={}", comp)]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(comp: &str) -> Vec<String> {
    svec![
        "@SP",
        "AM=M-1",              // SP--, looking at top of stack now
        "D=M",                 // Right arg in D
        "A=A-1",               // Looking at second arg of stack, will overwrite
        format!("M={}", comp)  // Op and overwrite second element
    ]
}

/// Push microcode for a pointer variable's own value (not what it points at)
fn push_pointer_value(pointer: &str) -> Vec<String> {
    seg_push_direct(pointer)
}

/// Restores `pointer` from the next lower word of the saved frame in R13.
fn restore_from_frame(pointer: &str) -> Vec<String> {
    svec!["@R13", "AM=M-1", "D=M", at_s(pointer), "M=D"]
}

fn call_sequence(name: &str, args: u16, ret_sym: &str) -> Vec<String> {
    let mut out = svec![at_s(ret_sym), "D=A"];
    out.extend(push_d());
    for pointer in ["LCL", "ARG", "THIS", "THAT"] {
        out.extend(push_pointer_value(pointer));
    }
    out.extend(svec![
        "@SP",
        "D=M",
        at_c(args + FRAME_SIZE),
        "D=D-A",
        "@ARG",
        "M=D", // ARG = SP - args - 5
        "@SP",
        "D=M",
        "@LCL",
        "M=D", // LCL = SP
        at_s(name),
        "0;JMP",
        def(ret_sym)
    ]);
    out
}

/// Generates Hack assembly for VM commands, one unit at a time.
///
/// A single translator is meant to drive a whole program: the label counter
/// and the static table carry over when [`Translator::set_unit`] switches to
/// the next unit.
///
/// Every label it defines is remembered, so a second definition of the same
/// name, or a label spelled like a static variable, is an error instead of
/// assembly that silently misbehaves.
#[derive(Clone)]
pub struct Translator {
    unit: String,
    function: Option<String>,
    labels: LabelAllocator,
    segments: SegmentResolver,
    defined: BTreeSet<String>,
    annotate: bool,
}

impl Translator {
    pub fn new(unit: &str) -> Self {
        Translator {
            unit: unit.to_string(),
            function: None,
            labels: LabelAllocator::new(),
            segments: SegmentResolver::new(),
            defined: BTreeSet::new(),
            annotate: true,
        }
    }

    /// Whether each command's code is preceded by a `// command` line.
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Switches static and label scoping to another unit.
    pub fn set_unit(&mut self, unit: &str) {
        self.unit = unit.to_string();
        self.function = None;
    }

    pub fn static_count(&self) -> usize {
        self.segments.static_count()
    }

    fn next_gen_sym(&mut self, kind: &str) -> String {
        format!("{}:{}_{}", self.unit, kind, self.labels.next())
    }

    /// `(label)`, unless the name is already taken.
    fn define(&mut self, label: String) -> Result<String, CodegenError> {
        if self.segments.is_static(&label) {
            return Err(CodegenError::StaticClash(label));
        }
        let line = def(&label);
        if !self.defined.insert(label.clone()) {
            return Err(CodegenError::DuplicateLabel(label));
        }
        Ok(line)
    }

    fn locate(&mut self, segment: Segment, index: u16) -> Result<Location, CodegenError> {
        let location = self.segments.resolve(&self.unit, segment, index)?;
        match location {
            Location::Direct(symbol)
                if segment == Segment::Static && self.defined.contains(&symbol) =>
            {
                Err(CodegenError::StaticClash(symbol))
            }
            location => Ok(location),
        }
    }

    fn push(&mut self, segment: Segment, index: u16) -> Result<Vec<String>, CodegenError> {
        Ok(match self.locate(segment, index)? {
            Location::Immediate(value) => push_constant(value),
            Location::Indirect { base, offset } => seg_push(base, offset),
            Location::Direct(symbol) => seg_push_direct(&symbol),
        })
    }

    fn pop(&mut self, segment: Segment, index: u16) -> Result<Vec<String>, CodegenError> {
        let invalid = CodegenError::InvalidSegmentForOperation {
            segment,
            operation: "pop",
        };
        if segment == Segment::Constant {
            return Err(invalid);
        }

        match self.locate(segment, index)? {
            Location::Immediate(_) => Err(invalid),
            Location::Indirect { base, offset } => Ok(seg_pop(base, offset)),
            Location::Direct(symbol) => Ok(seg_pop_direct(&symbol)),
        }
    }

    fn compare(&mut self, jump: &str) -> Result<Vec<String>, CodegenError> {
        let sym = self.labels.next();
        let cmp_sym = format!("{}:CMP_{}", self.unit, sym);
        let end_sym = format!("{}:ENDCMP_{}", self.unit, sym);
        let cmp_def = self.define(cmp_sym.clone())?;
        let end_def = self.define(end_sym.clone())?;
        Ok(svec![
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg in D
            "A=A-1",  // Looking at second arg of stack, will overwrite
            "D=M-D",
            at_s(&cmp_sym),
            format!("D;J{}", jump),
            "D=0",
            at_s(&end_sym),
            "0;JMP",
            cmp_def,
            "D=-1",
            end_def,
            "@SP",
            "A=M-1",
            "M=D"
        ])
    }

    fn arithmetic(&mut self, op: ArithmeticOp) -> Result<Vec<String>, CodegenError> {
        Ok(match op {
            ArithmeticOp::Not => simple_un_op("!M"),
            ArithmeticOp::Neg => simple_un_op("-M"),
            ArithmeticOp::Add => simple_bin_op("D+M"),
            ArithmeticOp::Sub => simple_bin_op("M-D"),
            ArithmeticOp::And => simple_bin_op("D&M"),
            ArithmeticOp::Or => simple_bin_op("D|M"),
            ArithmeticOp::Eq => self.compare("EQ")?,
            ArithmeticOp::Gt => self.compare("GT")?,
            ArithmeticOp::Lt => self.compare("LT")?,
        })
    }

    /// Convert VM label to Hack ASM symbol, scoped to the enclosing function
    /// (or the unit, before the first function)
    fn label_to_sym(&self, label: &str) -> String {
        let scope = self.function.as_deref().unwrap_or(&self.unit);
        format!("{}${}", scope, label)
    }

    fn label(&mut self, label: &str) -> Result<Vec<String>, CodegenError> {
        let sym = self.label_to_sym(label);
        Ok(vec![self.define(sym)?])
    }

    fn goto(&self, label: &str) -> Vec<String> {
        svec![
            at_s(&self.label_to_sym(label)),
            "0;JMP" // Unconditional jump
        ]
    }

    fn if_goto(&self, label: &str) -> Vec<String> {
        svec![
            "@SP",
            "AM=M-1",
            "D=M", // Stack popped into D
            at_s(&self.label_to_sym(label)),
            "D;JNE" // False is 0
        ]
    }

    fn function(&mut self, name: &str, locals: u16) -> Result<Vec<String>, CodegenError> {
        let mut out = vec![self.define(name.to_string())?];
        self.function = Some(name.to_string());
        for _ in 0..locals {
            out.extend(svec!["@SP", "M=M+1", "A=M-1", "M=0"]);
        }
        Ok(out)
    }

    fn call(&mut self, name: &str, args: u16) -> Result<Vec<String>, CodegenError> {
        let max = MAX_CONSTANT - FRAME_SIZE;
        if args > max {
            return Err(CodegenError::TooManyArguments { args, max });
        }
        let ret_sym = self.next_gen_sym("RET");
        self.define(ret_sym.clone())?;
        Ok(call_sequence(name, args, &ret_sym))
    }

    fn ret(&self) -> Vec<String> {
        let mut out = svec![
            "@LCL",
            "D=M",
            "@R13",
            "M=D", // FRAME = LCL
            at_c(FRAME_SIZE),
            "A=D-A",
            "D=M",
            "@R14",
            "M=D", // RET = *(FRAME-5), before *ARG can clobber it
            "@SP",
            "AM=M-1",
            "D=M",
            "@ARG",
            "A=M",
            "M=D", // *ARG = pop()
            "@ARG",
            "D=M+1",
            "@SP",
            "M=D" // SP = ARG+1
        ];
        for pointer in ["THAT", "THIS", "ARG", "LCL"] {
            out.extend(restore_from_frame(pointer));
        }
        out.extend(svec!["@R14", "A=M", "0;JMP"]);
        out
    }

    /// Sets up the stack and calls `entry` with no arguments.
    pub fn bootstrap(&mut self, entry: &str) -> Vec<String> {
        let mut out = vec![];
        if self.annotate {
            out.push("// bootstrap".to_string());
        }
        out.extend(svec![at_c(STACK_BASE), "D=A", "@SP", "M=D"]);
        if self.annotate {
            out.push(format!("// call {} 0", entry));
        }
        let ret_sym = loop {
            let sym = format!("BOOTSTRAP:RET_{}", self.labels.next());
            if self.define(sym.clone()).is_ok() {
                break sym;
            }
        };
        out.extend(call_sequence(entry, 0, &ret_sym));
        out
    }

    pub fn translate_command(&mut self, command: &Command) -> Result<Vec<String>, CodegenError> {
        let translated = match command {
            Arithmetic(op) => self.arithmetic(*op)?,
            Push(seg, arg) => self.push(*seg, *arg)?,
            Pop(seg, arg) => self.pop(*seg, *arg)?,
            Label(sym) => self.label(sym)?,
            Goto(sym) => self.goto(sym),
            IfGoto(sym) => self.if_goto(sym),
            Function(name, locals) => self.function(name, *locals)?,
            Call(name, args) => self.call(name, *args)?,
            Return => self.ret(),
        };

        if !self.annotate {
            return Ok(translated);
        }
        let mut instructions = Vec::with_capacity(translated.len() + 1);
        instructions.push(format!("// {}", command));
        instructions.extend(translated);
        Ok(instructions)
    }

    pub fn translate(&mut self, commands: &[Command]) -> Result<Vec<String>, CodegenError> {
        let mut instructions: Vec<String> = vec![];

        for command in commands {
            instructions.extend(self.translate_command(command)?);
        }

        Ok(instructions)
    }
}
