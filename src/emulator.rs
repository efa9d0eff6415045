//! A minimal Hack CPU with a built-in symbolic assembler.
//!
//! Only used by tests: it runs generated code so results are checked by
//! behaviour rather than by comparing instruction text. Comp mnemonics are
//! restricted to the ones the standard Hack assembler accepts.

use std::collections::HashMap;

const RAM_SIZE: usize = 32768;
const FIRST_VARIABLE: u16 = 16;

const COMPS: [&str; 28] = [
    "0", "1", "-1", "D", "A", "!D", "!A", "-D", "-A", "D+1", "A+1", "D-1", "A-1", "D+A", "D-A",
    "A-D", "D&A", "D|A", "M", "!M", "-M", "M+1", "M-1", "D+M", "D-M", "M-D", "D&M", "D|M",
];

#[derive(Debug, Clone, Copy)]
enum Operand {
    D,
    A,
    M,
    One,
}

#[derive(Debug, Clone, Copy)]
enum Comp {
    Zero,
    Value(Operand),
    Not(Operand),
    Neg(Operand),
    Binary(Operand, char, Operand),
}

#[derive(Debug, Clone, Copy)]
enum Instruction {
    Address(u16),
    Compute {
        dest_a: bool,
        dest_d: bool,
        dest_m: bool,
        comp: Comp,
        jump: Option<&'static str>,
    },
}

fn operand(c: char) -> Operand {
    match c {
        'D' => Operand::D,
        'A' => Operand::A,
        'M' => Operand::M,
        '1' => Operand::One,
        _ => panic!("bad operand {}", c),
    }
}

fn parse_comp(comp: &str) -> Comp {
    assert!(COMPS.contains(&comp), "not a Hack comp: {}", comp);
    let chars: Vec<char> = comp.chars().collect();
    match chars.as_slice() {
        ['0'] => Comp::Zero,
        [x] => Comp::Value(operand(*x)),
        ['!', x] => Comp::Not(operand(*x)),
        ['-', x] => Comp::Neg(operand(*x)),
        [x, op, y] => Comp::Binary(operand(*x), *op, operand(*y)),
        _ => unreachable!(),
    }
}

fn parse_jump(jump: &str) -> &'static str {
    match jump {
        "JGT" => "JGT",
        "JEQ" => "JEQ",
        "JGE" => "JGE",
        "JLT" => "JLT",
        "JNE" => "JNE",
        "JLE" => "JLE",
        "JMP" => "JMP",
        _ => panic!("not a Hack jump: {}", jump),
    }
}

fn parse_compute(line: &str) -> Instruction {
    let (dest, rest) = line.split_once('=').unwrap_or(("", line));
    let (comp, jump) = match rest.split_once(';') {
        Some((comp, jump)) => (comp, Some(parse_jump(jump))),
        None => (rest, None),
    };
    assert!(
        dest.chars().all(|c| "ADM".contains(c)),
        "not a Hack dest: {}",
        dest
    );
    Instruction::Compute {
        dest_a: dest.contains('A'),
        dest_d: dest.contains('D'),
        dest_m: dest.contains('M'),
        comp: parse_comp(comp),
        jump,
    }
}

pub struct Emulator {
    pub ram: Vec<i16>,
    rom: Vec<Instruction>,
    symbols: HashMap<String, u16>,
    pc: usize,
    a: i16,
    d: i16,
}

impl Emulator {
    /// Assembles `lines` (comments, blank lines and label definitions allowed).
    pub fn load<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut symbols: HashMap<String, u16> = HashMap::new();
        for (name, address) in [("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4)] {
            symbols.insert(name.to_string(), address);
        }
        for r in 0..16 {
            symbols.insert(format!("R{}", r), r);
        }
        symbols.insert("SCREEN".to_string(), 16384);
        symbols.insert("KBD".to_string(), 24576);

        let code: Vec<String> = lines
            .iter()
            .map(|line| {
                let line = line.as_ref();
                let line = line.split_once("//").map(|(s, _)| s).unwrap_or(line);
                line.chars().filter(|c| !c.is_whitespace()).collect::<String>()
            })
            .filter(|line| !line.is_empty())
            .collect();

        let mut count = 0u16;
        for line in &code {
            if let Some(label) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                let previous = symbols.insert(label.to_string(), count);
                assert!(previous.is_none(), "label defined twice: {}", label);
            } else {
                count += 1;
            }
        }

        let mut next_variable = FIRST_VARIABLE;
        let mut rom = vec![];
        for line in &code {
            if line.starts_with('(') {
                continue;
            }
            let instruction = match line.strip_prefix('@') {
                Some(value) if value.chars().all(|c| c.is_ascii_digit()) => {
                    Instruction::Address(value.parse().expect("address fits"))
                }
                Some(symbol) => {
                    let address = *symbols.entry(symbol.to_string()).or_insert_with(|| {
                        next_variable += 1;
                        next_variable - 1
                    });
                    Instruction::Address(address)
                }
                None => parse_compute(line),
            };
            rom.push(instruction);
        }

        Emulator {
            ram: vec![0; RAM_SIZE],
            rom,
            symbols,
            pc: 0,
            a: 0,
            d: 0,
        }
    }

    pub fn address_of(&self, symbol: &str) -> u16 {
        *self
            .symbols
            .get(symbol)
            .unwrap_or_else(|| panic!("no symbol {}", symbol))
    }

    pub fn sp(&self) -> u16 {
        self.ram[0] as u16
    }

    pub fn top(&self) -> i16 {
        self.ram[self.sp() as usize - 1]
    }

    /// Everything above the bootstrap stack base, bottom first.
    pub fn stack(&self) -> Vec<i16> {
        self.ram[256..self.sp() as usize].to_vec()
    }

    fn value(&self, operand: Operand) -> i16 {
        match operand {
            Operand::D => self.d,
            Operand::A => self.a,
            Operand::M => self.ram[self.a as u16 as usize],
            Operand::One => 1,
        }
    }

    fn eval(&self, comp: Comp) -> i16 {
        match comp {
            Comp::Zero => 0,
            Comp::Value(x) => self.value(x),
            Comp::Not(x) => !self.value(x),
            Comp::Neg(x) => self.value(x).wrapping_neg(),
            Comp::Binary(x, op, y) => {
                let (x, y) = (self.value(x), self.value(y));
                match op {
                    '+' => x.wrapping_add(y),
                    '-' => x.wrapping_sub(y),
                    '&' => x & y,
                    '|' => x | y,
                    _ => unreachable!(),
                }
            }
        }
    }

    fn step(&mut self) {
        let instruction = self.rom[self.pc];
        match instruction {
            Instruction::Address(value) => {
                self.a = value as i16;
                self.pc += 1;
            }
            Instruction::Compute {
                dest_a,
                dest_d,
                dest_m,
                comp,
                jump,
            } => {
                let address = self.a as u16 as usize;
                let out = self.eval(comp);
                let taken = match jump {
                    None => false,
                    Some("JGT") => out > 0,
                    Some("JEQ") => out == 0,
                    Some("JGE") => out >= 0,
                    Some("JLT") => out < 0,
                    Some("JNE") => out != 0,
                    Some("JLE") => out <= 0,
                    Some(_) => true,
                };
                if dest_m {
                    self.ram[address] = out;
                }
                if dest_a {
                    self.a = out;
                }
                if dest_d {
                    self.d = out;
                }
                self.pc = if taken { address } else { self.pc + 1 };
            }
        }
    }

    /// Runs until the program counter falls off the end of the code.
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() {
                return;
            }
            self.step();
        }
        panic!("still running after {} steps", max_steps);
    }

    /// Runs until control reaches `label`.
    pub fn run_until(&mut self, label: &str, max_steps: usize) {
        let stop = self.address_of(label) as usize;
        for _ in 0..max_steps {
            if self.pc == stop {
                return;
            }
            assert!(self.pc < self.rom.len(), "fell off the end before {}", label);
            self.step();
        }
        panic!("{} not reached after {} steps", label, max_steps);
    }
}

#[test]
fn test_emulator_runs_hack_code() {
    let mut emulator = Emulator::load(&[
        "@5", "D=A", "@counter", "M=D", "(LOOP)", "@counter", "MD=M-1", "@LOOP", "D;JGT", "@7",
        "D=A", "@R1", "M=D+1",
    ]);
    emulator.run(100);
    assert_eq!(emulator.ram[16], 0);
    assert_eq!(emulator.ram[1], 8);
    assert_eq!(emulator.address_of("counter"), 16);
}
