use std::collections::BTreeMap;

use crate::{ast::Segment, error::CodegenError};

/// First RAM cell of the `temp` segment (`R5`).
pub const TEMP_BASE: u16 = 5;
pub const TEMP_SIZE: u16 = 8;
/// Largest value an A-instruction can load.
pub const MAX_CONSTANT: u16 = 32767;

fn out_of_range(segment: Segment, index: u16, max: u16) -> CodegenError {
    CodegenError::IndexOutOfRange {
        segment,
        index,
        max,
    }
}

/// How to reach `segment[index]` on the Hack machine.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Location {
    /// The literal itself; only meaningful as a push source.
    Immediate(u16),
    /// `RAM[RAM[base] + offset]`.
    Indirect { base: &'static str, offset: u16 },
    /// A fixed cell named by an assembler symbol.
    Direct(String),
}

fn pointer_arg(index: u16) -> Result<&'static str, CodegenError> {
    match index {
        0 => Ok("THIS"),
        1 => Ok("THAT"),
        _ => Err(out_of_range(Segment::Pointer, index, 1)),
    }
}

/// Maps segment accesses to locations and remembers which static slots
/// every unit has touched.
#[derive(Debug, Default, Clone)]
pub struct SegmentResolver {
    statics: BTreeMap<(String, u16), String>,
}

impl SegmentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The private symbol backing `static index` of `unit`.
    ///
    /// Entries survive across units, so coming back to a unit reuses its slots.
    pub fn static_symbol(&mut self, unit: &str, index: u16) -> &str {
        self.statics
            .entry((unit.to_string(), index))
            .or_insert_with(|| format!("{}.{}", unit, index))
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    /// Whether some unit's static slot is backed by `symbol`.
    pub fn is_static(&self, symbol: &str) -> bool {
        self.statics.values().any(|name| name == symbol)
    }

    pub fn resolve(
        &mut self,
        unit: &str,
        segment: Segment,
        index: u16,
    ) -> Result<Location, CodegenError> {
        let location = match segment {
            Segment::Constant if index > MAX_CONSTANT => {
                return Err(out_of_range(segment, index, MAX_CONSTANT))
            }
            Segment::Constant => Location::Immediate(index),
            Segment::Local => Location::Indirect { base: "LCL", offset: index },
            Segment::Argument => Location::Indirect { base: "ARG", offset: index },
            Segment::This => Location::Indirect { base: "THIS", offset: index },
            Segment::That => Location::Indirect { base: "THAT", offset: index },
            Segment::Pointer => Location::Direct(pointer_arg(index)?.to_string()),
            Segment::Temp if index >= TEMP_SIZE => {
                return Err(out_of_range(segment, index, TEMP_SIZE - 1))
            }
            Segment::Temp => Location::Direct(format!("R{}", TEMP_BASE + index)),
            Segment::Static => Location::Direct(self.static_symbol(unit, index).to_string()),
        };
        // The offset is loaded with an A-instruction too.
        if let Location::Indirect { offset, .. } = &location {
            if *offset > MAX_CONSTANT {
                return Err(out_of_range(segment, *offset, MAX_CONSTANT));
            }
        }
        Ok(location)
    }
}

#[test]
fn test_pointer_segments_are_offsets() {
    let mut segments = SegmentResolver::new();
    assert_eq!(
        segments.resolve("Main", Segment::Argument, 2),
        Ok(Location::Indirect { base: "ARG", offset: 2 })
    );
    assert_eq!(
        segments.resolve("Main", Segment::That, 0),
        Ok(Location::Indirect { base: "THAT", offset: 0 })
    );
}

#[test]
fn test_fixed_segments() {
    let mut segments = SegmentResolver::new();
    assert_eq!(
        segments.resolve("Main", Segment::Pointer, 1),
        Ok(Location::Direct("THAT".to_string()))
    );
    assert_eq!(
        segments.resolve("Main", Segment::Temp, 7),
        Ok(Location::Direct("R12".to_string()))
    );
    assert_eq!(
        segments.resolve("Main", Segment::Constant, 32767),
        Ok(Location::Immediate(32767))
    );
}

#[test]
fn test_out_of_range_indices() {
    let mut segments = SegmentResolver::new();
    assert_eq!(
        segments.resolve("Main", Segment::Pointer, 2),
        Err(CodegenError::IndexOutOfRange {
            segment: Segment::Pointer,
            index: 2,
            max: 1
        })
    );
    assert!(segments.resolve("Main", Segment::Temp, 8).is_err());
    assert!(segments.resolve("Main", Segment::Constant, 32768).is_err());
}

#[test]
fn test_offsets_must_fit_an_a_instruction() {
    let mut segments = SegmentResolver::new();
    assert_eq!(
        segments.resolve("Main", Segment::Local, 32767),
        Ok(Location::Indirect { base: "LCL", offset: 32767 })
    );
    for segment in [Segment::Local, Segment::Argument, Segment::This, Segment::That] {
        assert_eq!(
            segments.resolve("Main", segment, 40000),
            Err(CodegenError::IndexOutOfRange {
                segment,
                index: 40000,
                max: MAX_CONSTANT,
            })
        );
    }
}

#[test]
fn test_statics_are_private_per_unit() {
    let mut segments = SegmentResolver::new();
    let a = segments.resolve("A", Segment::Static, 0);
    let b = segments.resolve("B", Segment::Static, 0);
    assert_eq!(a, Ok(Location::Direct("A.0".to_string())));
    assert_eq!(b, Ok(Location::Direct("B.0".to_string())));

    // Returning to a unit finds the same slot, and nothing was cleared.
    assert_eq!(segments.resolve("A", Segment::Static, 0), a);
    assert_eq!(segments.static_count(), 2);
    assert!(segments.is_static("B.0"));
    assert!(!segments.is_static("B.1"));
}
