/// Hands out the numbers that make generated labels unique.
///
/// One allocator lives for a whole translation run, so numbers never repeat
/// across units and the output only depends on the input.
#[derive(Debug, Default, Clone)]
pub struct LabelAllocator {
    next: usize,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seed: usize) -> Self {
        LabelAllocator { next: seed }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> usize {
        let tmp = self.next;
        self.next += 1;
        tmp
    }
}

#[test]
fn test_strictly_increasing() {
    let mut labels = LabelAllocator::new();
    assert_eq!(labels.next(), 0);
    assert_eq!(labels.next(), 1);
    assert_eq!(labels.next(), 2);

    let mut seeded = LabelAllocator::starting_at(40);
    assert_eq!(seeded.next(), 40);
    assert_eq!(seeded.next(), 41);
}
