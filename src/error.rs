// src/error.rs
//
// Failures that stop one clip. Anomalies are not errors; they are
// recorded next to the output and never abort a stage.

#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    #[error("schema error{}: field `{field}` {detail}", row_suffix(.row))]
    Schema {
        row: Option<usize>,
        field: &'static str,
        detail: String,
    },

    #[error("clip `{clip}` has no valid frames")]
    EmptySequence { clip: String },

    #[error("duplicate frame_index {frame_index}")]
    DuplicateFrame { frame_index: u64 },

    #[error("raw sequence has {raw} frames but smoothed sequence has {smoothed}")]
    LengthMismatch { raw: usize, smoothed: usize },

    #[error("position {position}: raw frame {raw} does not line up with smoothed frame {smoothed}")]
    FrameMisaligned {
        position: usize,
        raw: u64,
        smoothed: u64,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl RefineError {
    pub fn schema(field: &'static str, detail: impl Into<String>) -> Self {
        Self::Schema {
            row: None,
            field,
            detail: detail.into(),
        }
    }

    /// Attach the input row a schema error came from.
    pub fn at_row(self, row: usize) -> Self {
        match self {
            Self::Schema { field, detail, .. } => Self::Schema {
                row: Some(row),
                field,
                detail,
            },
            other => other,
        }
    }
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(r) => format!(" at row {}", r),
        None => String::new(),
    }
}
