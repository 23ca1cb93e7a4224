use serde::Serialize;

use crate::record::{PortionKind, Record};

/// A portion count split into whole bundles ("ikat") and the loose
/// remainder ("ompreng").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PortionBreakdown {
    pub count: u64,
    pub bundles: u64,
    pub remainder: u64,
}

impl PortionBreakdown {
    /// `bundle_size` must be non-zero; a zero size is treated as one.
    pub fn new(count: u64, bundle_size: u32) -> Self {
        let size = u64::from(bundle_size.max(1));
        Self {
            count,
            bundles: count / size,
            remainder: count % size,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordBreakdown {
    pub large: PortionBreakdown,
    pub small: PortionBreakdown,
}

impl RecordBreakdown {
    pub fn of(record: &Record, bundle_size: u32) -> Self {
        Self {
            large: PortionBreakdown::new(u64::from(record.count(PortionKind::Large)), bundle_size),
            small: PortionBreakdown::new(u64::from(record.count(PortionKind::Small)), bundle_size),
        }
    }

    pub fn get(&self, kind: PortionKind) -> PortionBreakdown {
        match kind {
            PortionKind::Large => self.large,
            PortionKind::Small => self.small,
        }
    }
}

/// Aggregate over every record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub records: usize,
    pub bundle_size: u32,
    pub large: PortionBreakdown,
    pub small: PortionBreakdown,
}

impl Totals {
    pub fn compute(records: &[Record], bundle_size: u32) -> Self {
        let (large, small) = records.iter().fold((0_u64, 0_u64), |(large, small), record| {
            (large + u64::from(record.large), small + u64::from(record.small))
        });
        Self {
            records: records.len(),
            bundle_size,
            large: PortionBreakdown::new(large, bundle_size),
            small: PortionBreakdown::new(small, bundle_size),
        }
    }

    pub fn get(&self, kind: PortionKind) -> PortionBreakdown {
        match kind {
            PortionKind::Large => self.large,
            PortionKind::Small => self.small,
        }
    }
}
